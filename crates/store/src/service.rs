//! Story service: the consistency contract between the durable store and the search cache
//!
//! Writes go to the durable store first, and its result is the operation's
//! result. The cache is updated afterwards on a best-effort basis: words that
//! fail to tokenize are logged and dropped, never turned into a failed write.
//! Deletes and updates detach or refresh the story's cache entries, so search
//! does not return stale matches. Mutations hold a write gate from the durable
//! write until the cache change lands, so the cache applies them in the same
//! order as the database.

use crate::durable::DurableStore;
use crate::error::{Error, Result};
use crate::indexer::SearchIndexer;
use crate::search_cache::{CacheStats, SearchCache};
use crate::trie::TokenError;

use serde::Serialize;
use std::sync::Arc;
use storyhub_core::logging::truncate_for_log;
use storyhub_core::{Config, ListingConfig, Story, StoryBuilder, StoryLimits, ValidationError};
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

/// Outcome of a free-text search
///
/// `errors` lists query words that were invalid or unmatched; they never
/// fail the search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub stories: Vec<Story>,
    pub errors: Vec<TokenError>,
}

/// The narrow service contract consumed by transport layers
#[derive(Clone)]
pub struct StoryService {
    store: DurableStore,
    cache: SearchCache,
    limits: StoryLimits,
    listing: ListingConfig,
    /// Serializes add/update/delete across durable write and cache change
    write_gate: Arc<Mutex<()>>,
}

impl StoryService {
    /// Open the configured durable store and rebuild the search cache from it
    pub async fn open(config: &Config) -> Result<Self> {
        let store = if config.database.is_in_memory() {
            DurableStore::open_in_memory().await?
        } else {
            DurableStore::open(&config.database.path).await?
        };

        Self::start(store, config.limits, config.listing).await
    }

    /// Service over a private in-memory database
    pub async fn open_in_memory(limits: StoryLimits, listing: ListingConfig) -> Result<Self> {
        Self::start(DurableStore::open_in_memory().await?, limits, listing).await
    }

    /// Build a service over an already-open store
    ///
    /// Returns only after every stored story has been replayed into the cache.
    #[instrument(skip_all)]
    pub async fn start(store: DurableStore, limits: StoryLimits, listing: ListingConfig) -> Result<Self> {
        let cache = SearchCache::new();
        let result = SearchIndexer::new(store.clone(), cache.clone()).reindex_all().await?;

        if result.error_count() > 0 {
            tracing::warn!(
                "{} stories carry words that could not be indexed ({} words)",
                result.token_errors.len(),
                result.error_count()
            );
        }

        Ok(Self { store, cache, limits, listing, write_gate: Arc::new(Mutex::new(())) })
    }

    /// Create a story and return its id
    #[instrument(skip(self, title, body))]
    pub async fn add_story(&self, title: &str, body: &str) -> Result<Uuid> {
        let draft = StoryBuilder::new()
            .with_title(title)
            .with_body(body)
            .build_new(&self.limits)?;

        let _gate = self.write_gate.lock().await;
        let story = self.store.insert_story(&draft).await?;

        let errors = self.cache.add_story(&story).await;
        log_token_errors(story.id, &errors);

        tracing::debug!("Created story {}", story.id);
        Ok(story.id)
    }

    /// Fetch one story
    #[instrument(skip(self))]
    pub async fn get_story(&self, id: &str) -> Result<Story> {
        match self.store.get_stories(&[id]).await {
            Ok(mut stories) if !stories.is_empty() => Ok(stories.swap_remove(0)),
            Ok(_) => Err(Error::story_not_found(id)),
            Err(e) if e.is_not_found() => Err(Error::story_not_found(id)),
            Err(e) => Err(e),
        }
    }

    /// Replace a story's title and body
    ///
    /// Returns the number of affected rows; the cache is refreshed when a
    /// row changed. A malformed id is [`Error::InvalidUuid`], as on every
    /// other id-taking operation.
    #[instrument(skip(self, title, body))]
    pub async fn update_story(&self, id: &str, title: &str, body: &str) -> Result<u64> {
        let update = StoryBuilder::new()
            .with_id(id)
            .with_title(title)
            .with_body(body)
            .build_update(&self.limits)
            .map_err(|e| match e {
                ValidationError::InvalidId(raw) => Error::invalid_uuid(raw),
                other => Error::Validation(other),
            })?;

        let _gate = self.write_gate.lock().await;
        let affected = self.store.update_story(&update).await?;
        if affected == 0 {
            return Ok(0);
        }

        match self.store.fetch_stories(&[update.id()]).await {
            Ok(stories) => {
                for story in &stories {
                    let errors = self.cache.reindex_story(story).await;
                    log_token_errors(story.id, &errors);
                }
            }
            Err(e) if e.is_not_found() => {
                self.cache.remove_story(update.id()).await;
            }
            Err(e) => {
                tracing::warn!("Story {} updated but its search entries were not refreshed: {}", update.id(), e);
            }
        }

        Ok(affected)
    }

    /// Delete a story and detach it from the search cache
    #[instrument(skip(self))]
    pub async fn delete_story(&self, id: &str) -> Result<u64> {
        let id = parse_id(id)?;

        let _gate = self.write_gate.lock().await;
        let affected = self.store.delete_story(id).await?;

        let detached = self.cache.remove_story(id).await;
        tracing::trace!("Detached story {} from {} words", id, detached);

        Ok(affected)
    }

    /// Free-text search over titles and bodies
    ///
    /// Matches any query word. When nothing resolves the result is empty and
    /// the durable store is not queried.
    #[instrument(skip(self, query), fields(query = %truncate_for_log(query, 64)))]
    pub async fn search_stories(&self, query: &str) -> Result<SearchResults> {
        let lookup = self.cache.get_story_ids(query).await;

        if lookup.ids.is_empty() {
            tracing::debug!("No ids resolved ({} misses)", lookup.errors.len());
            return Ok(SearchResults { stories: Vec::new(), errors: lookup.errors });
        }

        let stories = match self.store.fetch_stories(&lookup.ids).await {
            Ok(stories) => stories,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        tracing::debug!("Search returned {} stories", stories.len());
        Ok(SearchResults { stories, errors: lookup.errors })
    }

    /// Most-viewed page; `limit` is clamped to the configured page size
    pub async fn get_most_viewed_stories(&self, offset: u32, limit: u32) -> Result<Vec<Story>> {
        self.store
            .get_most_viewed_stories(offset, self.page_limit(limit))
            .await
    }

    /// Top-rated page; `limit` is clamped to the configured page size
    pub async fn get_top_rated_stories(&self, offset: u32, limit: u32) -> Result<Vec<Story>> {
        self.store.get_top_rated_stories(offset, self.page_limit(limit)).await
    }

    pub async fn view_story(&self, id: &str) -> Result<u64> {
        self.store.increment_views(parse_id(id)?).await
    }

    pub async fn upvote_story(&self, id: &str) -> Result<u64> {
        self.store.upvote(parse_id(id)?).await
    }

    pub async fn downvote_story(&self, id: &str) -> Result<u64> {
        self.store.downvote(parse_id(id)?).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Number of stories in the durable store
    pub async fn story_count(&self) -> Result<u64> {
        self.store.count().await
    }

    fn page_limit(&self, limit: u32) -> u32 {
        if limit > self.listing.max_page_size {
            tracing::debug!("Clamping page limit {} to {}", limit, self.listing.max_page_size);
        }
        limit.min(self.listing.max_page_size)
    }
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::invalid_uuid(raw))
}

fn log_token_errors(id: Uuid, errors: &[TokenError]) {
    if errors.is_empty() {
        return;
    }
    let words: Vec<&str> = errors.iter().map(TokenError::word).collect();
    tracing::warn!(%id, "{} words were not indexed: {:?}", errors.len(), words);
}
