//! Story storage and search
//!
//! Durable SQLite storage for stories, an in-process trie search cache over
//! their titles and bodies, and the [`StoryService`] that keeps the two
//! consistent.
//!
//! # Example
//!
//! ```ignore
//! use storyhub_core::Config;
//! use storyhub_store::StoryService;
//!
//! let service = StoryService::open(&Config::default()).await?;
//!
//! let id = service.add_story("The Lighthouse", "A keeper counts ships.").await?;
//! let story = service.get_story(&id.to_string()).await?;
//!
//! let results = service.search_stories("keeper ships").await?;
//! for story in results.stories {
//!     println!("{}: {}", story.id, story.title);
//! }
//!
//! let top = service.get_most_viewed_stories(0, 10).await?;
//! ```

mod durable;
mod error;
mod indexer;
mod migration;
mod schema;
mod search_cache;
mod service;
mod trie;

pub use durable::{DurableStore, Ranking};
pub use error::{Error, Result};
pub use indexer::{IndexResult, SearchIndexer};
pub use search_cache::{CacheStats, SearchCache};
pub use service::{SearchResults, StoryService};
pub use trie::{IdSet, IndexReport, Lookup, PUNCTUATION, TokenError, Trie, normalize, split_words};
