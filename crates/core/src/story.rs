//! Story records and their construction rules
//!
//! A story is only ever created or replaced through [`StoryBuilder`], which
//! enforces non-empty, length-bounded title and body and a well-formed
//! identifier when one is present. Full [`Story`] values come back from the
//! durable store, which owns identifier assignment and the counters.

use crate::error::ValidationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default maximum title length, in characters
pub const DEFAULT_MAX_TITLE_LEN: usize = 120;

/// Default maximum body length, in characters
pub const DEFAULT_MAX_BODY_LEN: usize = 5000;

/// A persisted story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Server-assigned v4 identifier
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub view_count: u64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Story {
    /// Net rating (up-votes minus down-votes)
    pub fn score(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}

/// Length bounds applied by the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoryLimits {
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
    #[serde(default = "default_max_body_len")]
    pub max_body_len: usize,
}

fn default_max_title_len() -> usize {
    DEFAULT_MAX_TITLE_LEN
}

fn default_max_body_len() -> usize {
    DEFAULT_MAX_BODY_LEN
}

impl Default for StoryLimits {
    fn default() -> Self {
        Self { max_title_len: DEFAULT_MAX_TITLE_LEN, max_body_len: DEFAULT_MAX_BODY_LEN }
    }
}

/// Validated content for a story that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    title: String,
    body: String,
}

impl NewStory {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Validated field replacement for an existing story
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryUpdate {
    id: Uuid,
    title: String,
    body: String,
}

impl StoryUpdate {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Builder for story writes
///
/// ```
/// use storyhub_core::{StoryBuilder, StoryLimits};
///
/// let draft = StoryBuilder::new()
///     .with_title("A quiet harbour")
///     .with_body("The boats came in late.")
///     .build_new(&StoryLimits::default())
///     .unwrap();
/// assert_eq!(draft.title(), "A quiet harbour");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoryBuilder {
    id: Option<String>,
    title: String,
    body: String,
}

impl StoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier (updates only)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Build content for a new story
    ///
    /// Fails with [`ValidationError::UnexpectedId`] if an identifier was set.
    pub fn build_new(self, limits: &StoryLimits) -> Result<NewStory, ValidationError> {
        if let Some(id) = self.id {
            return Err(ValidationError::UnexpectedId(id));
        }
        validate_content(&self.title, &self.body, limits)?;
        Ok(NewStory { title: self.title, body: self.body })
    }

    /// Build a field replacement for an existing story
    pub fn build_update(self, limits: &StoryLimits) -> Result<StoryUpdate, ValidationError> {
        let id = match self.id.as_deref() {
            Some(raw) => parse_story_id(raw)?,
            None => return Err(ValidationError::MissingId),
        };
        validate_content(&self.title, &self.body, limits)?;
        Ok(StoryUpdate { id, title: self.title, body: self.body })
    }
}

/// Parse a client-supplied story identifier
pub fn parse_story_id(raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

fn validate_content(title: &str, body: &str, limits: &StoryLimits) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }

    let title_len = title.chars().count();
    if title_len > limits.max_title_len {
        return Err(ValidationError::TitleTooLong { len: title_len, max: limits.max_title_len });
    }

    let body_len = body.chars().count();
    if body_len > limits.max_body_len {
        return Err(ValidationError::BodyTooLong { len: body_len, max: limits.max_body_len });
    }

    Ok(())
}
