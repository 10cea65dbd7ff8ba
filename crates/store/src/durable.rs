//! Durable story store backed by SQLite
//!
//! The `stories` table is the source of truth for everything the service
//! serves; the search cache is rebuilt from it.
use crate::error::{Error, Result};
use crate::migration::MigrationManager;
use crate::schema::STORY_COLUMNS;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Row, params, params_from_iter};
use std::{collections::HashMap, path::Path, sync::Arc};
use storyhub_core::{NewStory, Story, StoryUpdate};
use tokio_rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

/// Ids bound per `IN (...)` query; SQLite caps bind parameters per statement
const FETCH_CHUNK_SIZE: usize = 500;

/// Ranking used by paginated listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// `viewcount` descending
    MostViewed,
    /// `upvotes` descending
    TopRated,
}

impl Ranking {
    /// ORDER BY clause; `id` breaks ties so pages never overlap
    fn order_by(&self) -> &'static str {
        match self {
            Ranking::MostViewed => "viewcount DESC, id ASC",
            Ranking::TopRated => "upvotes DESC, id ASC",
        }
    }
}

/// Counter columns that can only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    Views,
    Upvotes,
    Downvotes,
}

impl Counter {
    fn column(&self) -> &'static str {
        match self {
            Counter::Views => "viewcount",
            Counter::Upvotes => "upvotes",
            Counter::Downvotes => "downvotes",
        }
    }
}

/// Map a `stories` row selected with [`STORY_COLUMNS`]
fn story_from_row(row: &Row<'_>) -> rusqlite::Result<Story> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    Ok(Story {
        id,
        title: row.get(1)?,
        body: row.get(2)?,
        view_count: counter_from_row(row, 3)?,
        upvotes: counter_from_row(row, 4)?,
        downvotes: counter_from_row(row, 5)?,
        created_at: timestamp_from_row(row, 6)?,
        updated_at: timestamp_from_row(row, 7)?,
    })
}

fn counter_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn timestamp_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// A handle to the durable story store
///
/// All calls run on the connection's background thread. There is no retry:
/// every database failure is returned to the caller.
#[derive(Clone)]
pub struct DurableStore {
    conn: Arc<Connection>,
}

impl DurableStore {
    /// Open or create a store at the given path
    #[instrument(skip_all, fields(db_path = %db_path.display()))]
    pub async fn open(db_path: &Path) -> Result<Self> {
        tracing::info!("Opening story store at {}", db_path.display());

        let conn = Connection::open(db_path)
            .await
            .map_err(|e| Error::database(format!("Failed to open database: {e}")))?;

        Self::from_connection(conn).await
    }

    /// Open a private in-memory store
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::database(format!("Failed to open in-memory database: {e}")))?;

        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            tracing::debug!("Running migrations");
            MigrationManager::migrate(conn).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tracing::trace!("Migrations complete");
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .map_err(|e| Error::database(format!("Migration failed: {e}")))?;

        tracing::info!("Story store opened successfully");
        Ok(Self { conn: Arc::new(conn) })
    }

    /// Persist a new story and return its generated id
    pub async fn add_story(&self, story: &NewStory) -> Result<Uuid> {
        self.insert_story(story).await.map(|stored| stored.id)
    }

    /// Persist a new story and return the record as written
    #[instrument(skip(self, story))]
    pub async fn insert_story(&self, story: &NewStory) -> Result<Story> {
        let now = Utc::now();
        let stored = Story {
            id: Uuid::new_v4(),
            title: story.title().to_owned(),
            body: story.body().to_owned(),
            view_count: 0,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!("Inserting story {}", stored.id);

        let id = stored.id.to_string();
        let title = stored.title.clone();
        let body = stored.body.clone();
        let timestamp = now.to_rfc3339();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    r#"
                    INSERT INTO stories (id, title, body, viewcount, upvotes, downvotes, createdat, updatedat)
                    VALUES (?1, ?2, ?3, 0, 0, 0, ?4, ?4)
                    "#,
                )?;

                stmt.execute(params![&id, &title, &body, &timestamp])?;
                Ok::<_, rusqlite::Error>(())
            })
            .await?;

        Ok(stored)
    }

    /// Fetch stories by client-supplied ids
    ///
    /// Every id is checked before any query runs. An empty result is
    /// [`Error::NoRecordsFound`].
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn get_stories<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Story>> {
        let parsed = ids
            .iter()
            .map(|raw| Uuid::parse_str(raw.as_ref().trim()).map_err(|_| Error::invalid_uuid(raw.as_ref())))
            .collect::<Result<Vec<_>>>()?;

        self.fetch_stories(&parsed).await
    }

    /// Fetch stories by id, in the order the ids are given
    ///
    /// Duplicate and unknown ids are skipped. An empty result is
    /// [`Error::NoRecordsFound`].
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn fetch_stories(&self, ids: &[Uuid]) -> Result<Vec<Story>> {
        if ids.is_empty() {
            return Err(Error::NoRecordsFound);
        }

        let keys: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let found = self
            .conn
            .call(move |conn| {
                let mut stories = Vec::new();
                for chunk in keys.chunks(FETCH_CHUNK_SIZE) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id IN ({placeholders})");
                    let mut stmt = conn.prepare_cached(&sql)?;
                    for story in stmt.query_map(params_from_iter(chunk.iter()), story_from_row)? {
                        stories.push(story?);
                    }
                }
                Ok::<_, rusqlite::Error>(stories)
            })
            .await?;

        if found.is_empty() {
            return Err(Error::NoRecordsFound);
        }

        let mut by_id: HashMap<Uuid, Story> = found.into_iter().map(|story| (story.id, story)).collect();
        let ordered: Vec<Story> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        tracing::debug!("Fetched {} stories", ordered.len());
        Ok(ordered)
    }

    /// Replace a story's title and body
    ///
    /// Returns the number of affected rows (0 when the id is unknown).
    #[instrument(skip(self, update), fields(id = %update.id()))]
    pub async fn update_story(&self, update: &StoryUpdate) -> Result<u64> {
        let id = update.id().to_string();
        let title = update.title().to_owned();
        let body = update.body().to_owned();
        let now = Utc::now().to_rfc3339();

        let affected = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare_cached("UPDATE stories SET title = ?2, body = ?3, updatedat = ?4 WHERE id = ?1")?;
                let rows = stmt.execute(params![&id, &title, &body, &now])?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await?;

        tracing::debug!("Updated {} rows", affected);
        Ok(affected as u64)
    }

    /// Delete a story; returns the number of affected rows
    #[instrument(skip(self))]
    pub async fn delete_story(&self, id: Uuid) -> Result<u64> {
        let key = id.to_string();

        let affected = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached("DELETE FROM stories WHERE id = ?1")?;
                let rows = stmt.execute(params![&key])?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await?;

        tracing::debug!("Deleted {} rows", affected);
        Ok(affected as u64)
    }

    /// Record one view
    pub async fn increment_views(&self, id: Uuid) -> Result<u64> {
        self.increment(id, Counter::Views).await
    }

    /// Record one up-vote
    pub async fn upvote(&self, id: Uuid) -> Result<u64> {
        self.increment(id, Counter::Upvotes).await
    }

    /// Record one down-vote
    pub async fn downvote(&self, id: Uuid) -> Result<u64> {
        self.increment(id, Counter::Downvotes).await
    }

    #[instrument(skip(self))]
    async fn increment(&self, id: Uuid, counter: Counter) -> Result<u64> {
        let key = id.to_string();
        let sql = format!(
            "UPDATE stories SET {column} = {column} + 1 WHERE id = ?1",
            column = counter.column()
        );

        let affected = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt.execute(params![&key])?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await?;

        Ok(affected as u64)
    }

    /// Stories ordered by view count, highest first
    pub async fn get_most_viewed_stories(&self, offset: u32, limit: u32) -> Result<Vec<Story>> {
        self.ranked(Ranking::MostViewed, offset, limit).await
    }

    /// Stories ordered by up-vote count, highest first
    pub async fn get_top_rated_stories(&self, offset: u32, limit: u32) -> Result<Vec<Story>> {
        self.ranked(Ranking::TopRated, offset, limit).await
    }

    /// One page of a ranked listing
    ///
    /// A page past the end is an empty `Ok`, not an error.
    #[instrument(skip(self))]
    pub async fn ranked(&self, ranking: Ranking, offset: u32, limit: u32) -> Result<Vec<Story>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories ORDER BY {} LIMIT ?1 OFFSET ?2",
            ranking.order_by()
        );

        let page = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(&sql)?;
                let stories = stmt
                    .query_map(params![limit as i64, offset as i64], story_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(stories)
            })
            .await?;

        tracing::debug!("Ranked page returned {} stories", page.len());
        Ok(page)
    }

    /// Every stored story, oldest first
    ///
    /// Feeds cache reconciliation at startup.
    #[instrument(skip(self))]
    pub async fn all_stories(&self) -> Result<Vec<Story>> {
        let stories = self
            .conn
            .call(|conn| {
                let sql = format!("SELECT {STORY_COLUMNS} FROM stories ORDER BY createdat, id");
                let mut stmt = conn.prepare(&sql)?;
                let stories = stmt
                    .query_map([], story_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(stories)
            })
            .await?;

        Ok(stories)
    }

    /// Number of stored stories
    pub async fn count(&self) -> Result<u64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
                Ok::<_, rusqlite::Error>(count)
            })
            .await?;

        Ok(count as u64)
    }
}
