use thiserror::Error;

/// Result type alias for storyhub-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the story service
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Story construction or update rejected by validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Reasons a story fails builder validation
///
/// These are expected, recoverable conditions; the API layer maps them to
/// client errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("body must not be empty")]
    EmptyBody,

    #[error("title is {len} characters, maximum is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("body is {len} characters, maximum is {max}")]
    BodyTooLong { len: usize, max: usize },

    /// The identifier is present but not a UUID
    #[error("invalid uuid: {0}")]
    InvalidId(String),

    /// An update was built without an identifier
    #[error("story id is required")]
    MissingId,

    /// Identifiers are assigned by the durable store on insert
    #[error("story id must not be supplied on create: {0}")]
    UnexpectedId(String),
}

impl Error {
    /// Create a configuration error with a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::TitleTooLong { len: 130, max: 120 };
        assert_eq!(err.to_string(), "title is 130 characters, maximum is 120");

        let err = ValidationError::InvalidId("not-a-uuid".to_string());
        assert_eq!(err.to_string(), "invalid uuid: not-a-uuid");
    }

    #[test]
    fn test_error_from_validation() {
        let err: Error = ValidationError::EmptyBody.into();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyBody)));
        assert_eq!(err.to_string(), "validation error: body must not be empty");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_config_helper() {
        let err = Error::config("bad value");
        assert_eq!(err.to_string(), "configuration error: bad value");
    }
}
