//! Versioned schema migrations for the story store
//!
//! Each step runs in its own transaction together with the row that records
//! it, so a crash mid-step leaves the previous version intact.

use crate::error::{Error, Result};
use crate::schema::{SCHEMA_VERSION, STORIES_SQL, VERSION_TABLE_SQL};
use rusqlite::{Connection, params};
use tracing::{debug, info, trace};

/// One schema step
struct Migration {
    version: i32,
    name: &'static str,
    sql: &'static str,
}

/// Every step in version order; the last entry is `SCHEMA_VERSION`
const MIGRATIONS: &[Migration] = &[Migration { version: 1, name: "create_stories", sql: STORIES_SQL }];

pub struct MigrationManager;

impl MigrationManager {
    /// Highest applied version, 0 for a fresh database
    pub fn get_current_version(conn: &Connection) -> Result<i32> {
        conn.execute_batch(VERSION_TABLE_SQL)
            .map_err(|e| Error::database(format!("Failed to create schema_version table: {e}")))?;

        let version: Option<i32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .map_err(|e| Error::database(format!("Failed to read schema version: {e}")))?;

        Ok(version.unwrap_or(0))
    }

    /// Bring the database up to `SCHEMA_VERSION`
    ///
    /// Refuses databases written by a newer build. Safe to call on every open.
    pub fn migrate(conn: &Connection) -> Result<()> {
        let current = Self::get_current_version(conn)?;

        if current > SCHEMA_VERSION {
            return Err(Error::database(format!(
                "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
            )));
        }

        let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
        if pending.is_empty() {
            trace!("Schema at version {current}, nothing to apply");
            return Ok(());
        }

        info!("Migrating schema from version {} to {}", current, SCHEMA_VERSION);
        for migration in pending {
            Self::apply(conn, migration)?;
        }

        Ok(())
    }

    fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
        debug!("Applying migration {} ({})", migration.version, migration.name);

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql).map_err(|e| {
            Error::database(format!("Migration {} ({}) failed: {e}", migration.version, migration.name))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_database_is_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(MigrationManager::get_current_version(&conn).unwrap(), 0);
        assert!(!table_exists(&conn, "stories"));
    }

    #[test]
    fn test_migrate_creates_stories() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();

        assert_eq!(MigrationManager::get_current_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(table_exists(&conn, "stories"));

        let name: String = conn
            .query_row("SELECT name FROM schema_version WHERE version = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "create_stories");
    }

    #[test]
    fn test_migrate_twice_records_each_step_once() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();
        MigrationManager::migrate(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_migrate_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO schema_version (version, name) VALUES (?1, 'future')",
            [SCHEMA_VERSION + 1],
        )
        .unwrap();

        let err = MigrationManager::migrate(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_last_migration_matches_schema_version() {
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_check_constraints() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();

        let blank_title = conn.execute(
            "INSERT INTO stories (id, title, body, createdat, updatedat) VALUES ('a', '  ', 'body', 'now', 'now')",
            [],
        );
        assert!(blank_title.is_err());

        let negative_views = conn.execute(
            "INSERT INTO stories (id, title, body, viewcount, createdat, updatedat) VALUES ('b', 't', 'b', -1, 'now', 'now')",
            [],
        );
        assert!(negative_views.is_err());
    }
}
