//! In-process search cache over story titles and bodies
//!
//! Wraps a [`Trie`] together with a reverse index (story id -> tokens it
//! contributed) so deleted or updated stories can be detached instead of
//! lingering as stale matches. All state sits behind one `RwLock`: writers
//! are exclusive, lookups run concurrently.

use crate::trie::{Lookup, TokenError, Trie};

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use storyhub_core::Story;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Stories currently indexed
    pub stories: usize,
    /// Distinct words currently indexed
    pub words: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    trie: Trie,
    tokens_by_story: HashMap<Uuid, HashSet<String>>,
}

impl CacheState {
    fn index(&mut self, story: &Story) -> Vec<TokenError> {
        let title = self.trie.insert_sentence(&story.title, story.id);
        let body = self.trie.insert_sentence(&story.body, story.id);

        let tokens = self.tokens_by_story.entry(story.id).or_default();
        tokens.extend(title.tokens);
        tokens.extend(body.tokens);

        let mut errors = title.errors;
        errors.extend(body.errors);
        errors
    }

    fn unindex(&mut self, id: Uuid) -> usize {
        let Some(tokens) = self.tokens_by_story.remove(&id) else {
            return 0;
        };

        let mut detached = 0;
        for token in &tokens {
            if self.trie.remove(token, id) {
                detached += 1;
            }
        }
        detached
    }
}

/// Shared handle to the search cache
///
/// Cloning is cheap and every clone sees the same index.
#[derive(Debug, Clone, Default)]
pub struct SearchCache {
    inner: Arc<RwLock<CacheState>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a story's title and body under its id
    ///
    /// Returns title errors followed by body errors. Words that fail are
    /// simply not searchable; the rest are indexed.
    #[instrument(skip(self, story), fields(id = %story.id))]
    pub async fn add_story(&self, story: &Story) -> Vec<TokenError> {
        let errors = self.inner.write().await.index(story);
        tracing::trace!("Indexed story with {} token errors", errors.len());
        errors
    }

    /// Resolve a free-text query to story ids
    #[instrument(skip(self))]
    pub async fn get_story_ids(&self, query: &str) -> Lookup {
        let lookup = self.inner.read().await.trie.get_ids(query);
        tracing::trace!("Resolved {} ids, {} misses", lookup.ids.len(), lookup.errors.len());
        lookup
    }

    /// Detach a story from every word it contributed
    ///
    /// Returns the number of words the id was removed from.
    #[instrument(skip(self))]
    pub async fn remove_story(&self, id: Uuid) -> usize {
        self.inner.write().await.unindex(id)
    }

    /// Replace a story's index entries with ones built from its current fields
    #[instrument(skip(self, story), fields(id = %story.id))]
    pub async fn reindex_story(&self, story: &Story) -> Vec<TokenError> {
        let mut state = self.inner.write().await;
        state.unindex(story.id);
        state.index(story)
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.read().await;
        CacheStats { stories: state.tokens_by_story.len(), words: state.trie.word_count() }
    }
}
