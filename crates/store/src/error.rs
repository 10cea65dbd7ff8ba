//! Error types for the story store

use storyhub_core::ValidationError;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the durable store and the service facade
///
/// Tokenizer failures are not represented here; they are reported as
/// [`crate::TokenError`] lists next to partial results.
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database corruption, schema mismatch or a failed open
    #[error("Database error: {0}")]
    Database(String),

    /// A requested identifier is not a UUID; raised before any query runs
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),

    /// A batch fetch matched no rows
    #[error("no records found")]
    NoRecordsFound,

    /// A single-story fetch matched no rows
    #[error("no story found for id {0}")]
    StoryNotFound(String),

    /// Story failed builder validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    ConnectionError(#[from] tokio_rusqlite::Error),
}

impl Error {
    /// Create a database error with a message
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid uuid error
    pub fn invalid_uuid(raw: impl Into<String>) -> Self {
        Self::InvalidUuid(raw.into())
    }

    /// Create a story-not-found error
    pub fn story_not_found(id: impl Into<String>) -> Self {
        Self::StoryNotFound(id.into())
    }

    /// Whether this error means "nothing matched" rather than an operational failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoRecordsFound | Self::StoryNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::story_not_found("1b4e28ba-2fa1-41d2-883f-0016d3cca427");
        assert_eq!(
            err.to_string(),
            "no story found for id 1b4e28ba-2fa1-41d2-883f-0016d3cca427"
        );

        let err = Error::invalid_uuid("abc");
        assert_eq!(err.to_string(), "invalid uuid: abc");
        assert_eq!(Error::NoRecordsFound.to_string(), "no records found");
    }

    #[test]
    fn test_error_from_sqlite() {
        let sqlite_err = rusqlite::Error::InvalidPath("test path".into());
        let err: Error = sqlite_err.into();
        assert!(matches!(err, Error::Sqlite(_)));
    }

    #[test]
    fn test_error_from_validation() {
        let err: Error = ValidationError::EmptyTitle.into();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyTitle)));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NoRecordsFound.is_not_found());
        assert!(Error::story_not_found("x").is_not_found());
        assert!(!Error::database("boom").is_not_found());
    }
}
