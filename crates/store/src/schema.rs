//! SQLite schema for the story store
//!
//! Title and body carry non-empty CHECK constraints mirroring builder
//! validation; counters may never go negative.

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Bookkeeping table recording which migrations have run
pub const VERSION_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// `stories` table plus the indexes behind most-viewed / top-rated listings
pub const STORIES_SQL: &str = include_str!("schema.sql");

/// Column list shared by every query that materializes a [`storyhub_core::Story`]
///
/// Order must match `durable::story_from_row`.
pub const STORY_COLUMNS: &str = "id, title, body, viewcount, upvotes, downvotes, createdat, updatedat";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declares_stories_table() {
        assert!(STORIES_SQL.contains("CREATE TABLE IF NOT EXISTS stories"));
        for column in STORY_COLUMNS.split(", ") {
            assert!(STORIES_SQL.contains(column), "schema is missing column {column}");
        }
    }
}
