pub mod config;
pub mod error;
pub mod logging;
pub mod story;

pub use config::{Config, ConfigError, DatabaseConfig, FileLoggingConfig, ListingConfig, LoggingSection};
pub use error::{Error, Result, ValidationError};
pub use story::{NewStory, Story, StoryBuilder, StoryLimits, StoryUpdate, parse_story_id};
