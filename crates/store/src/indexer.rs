//! Durable-store-to-cache reconciliation
//!
//! The search cache holds nothing that cannot be derived from the `stories`
//! table, and it does not survive a restart. `SearchIndexer` replays every
//! stored story through [`SearchCache::add_story`] so search results match
//! the durable store before any query is served.

use crate::{DurableStore, Result, SearchCache, TokenError};

use uuid::Uuid;

/// Result of an indexing operation
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    /// Number of stories replayed into the cache
    pub docs_added: usize,
    /// Words that could not be indexed, grouped by story
    pub token_errors: Vec<(Uuid, Vec<TokenError>)>,
    /// Duration of the indexing operation
    pub duration_ms: u64,
}

impl IndexResult {
    /// Total number of words that failed to index
    pub fn error_count(&self) -> usize {
        self.token_errors.iter().map(|(_, errors)| errors.len()).sum()
    }
}

/// Rebuilds a [`SearchCache`] from a [`DurableStore`]
pub struct SearchIndexer {
    store: DurableStore,
    cache: SearchCache,
}

impl SearchIndexer {
    pub fn new(store: DurableStore, cache: SearchCache) -> Self {
        Self { store, cache }
    }

    /// Replay every stored story into the cache
    ///
    /// Tokenization failures are collected, not fatal; a database failure
    /// aborts the replay.
    #[tracing::instrument(skip(self))]
    pub async fn reindex_all(&self) -> Result<IndexResult> {
        let start = std::time::Instant::now();
        tracing::info!("Starting full search reindex");

        let mut result = IndexResult::default();

        for story in self.store.all_stories().await? {
            let errors = self.cache.add_story(&story).await;
            if !errors.is_empty() {
                tracing::debug!("Story {} indexed with {} token errors", story.id, errors.len());
                result.token_errors.push((story.id, errors));
            }
            result.docs_added += 1;
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Reindex complete: {} stories, {} token errors in {}ms",
            result.docs_added,
            result.error_count(),
            result.duration_ms
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_core::{StoryBuilder, StoryLimits};
    use tempfile::TempDir;

    async fn add(store: &DurableStore, title: &str, body: &str) -> Uuid {
        let story = StoryBuilder::new()
            .with_title(title)
            .with_body(body)
            .build_new(&StoryLimits::default())
            .unwrap();
        store.add_story(&story).await.unwrap()
    }

    #[tokio::test]
    async fn test_reindex_empty_store() {
        let store = DurableStore::open_in_memory().await.unwrap();
        let cache = SearchCache::new();

        let result = SearchIndexer::new(store, cache.clone()).reindex_all().await.unwrap();
        assert_eq!(result.docs_added, 0);
        assert_eq!(result.error_count(), 0);
        assert_eq!(cache.stats().await.stories, 0);
    }

    #[tokio::test]
    async fn test_reindex_rebuilds_cache_after_restart() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("stories.db");

        let (lighthouse, cellar) = {
            let store = DurableStore::open(&db_path).await.unwrap();
            (
                add(&store, "Lighthouse", "A keeper counts ships").await,
                add(&store, "Cellar", "Room 101 holds apples").await,
            )
        };

        let store = DurableStore::open(&db_path).await.unwrap();
        let cache = SearchCache::new();
        let result = SearchIndexer::new(store, cache.clone()).reindex_all().await.unwrap();

        assert_eq!(result.docs_added, 2);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.token_errors[0].0, cellar);

        assert_eq!(cache.get_story_ids("ships").await.ids, vec![lighthouse]);
        assert_eq!(cache.get_story_ids("apples").await.ids, vec![cellar]);
    }
}
