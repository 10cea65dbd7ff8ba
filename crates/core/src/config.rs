use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::story::StoryLimits;

/// Default maximum page size for ranked listings
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Durable store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file (`":memory:"` for an ephemeral store)
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("storyhub.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_database_path() }
    }
}

impl DatabaseConfig {
    /// Whether the configured path names an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

/// Ranked listing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingConfig {
    /// Upper bound applied to the `limit` of most-viewed / top-rated pages
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { max_page_size: DEFAULT_MAX_PAGE_SIZE }
    }
}

/// File logging section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLoggingConfig {
    /// Write a daily-rolling JSON log file
    #[serde(default)]
    pub enabled: bool,
}

/// `[logging]` section as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: FileLoggingConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format(), file: FileLoggingConfig::default() }
    }
}

/// Root configuration structure for storyhub.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub limits: StoryLimits,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(|e| Error::Config(ConfigError::from(e).to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.limits.max_title_len == 0 {
            return Err(Error::Config(ConfigError::ZeroLimit("limits.max_title_len").to_string()));
        }
        if self.limits.max_body_len == 0 {
            return Err(Error::Config(ConfigError::ZeroLimit("limits.max_body_len").to_string()));
        }
        if self.listing.max_page_size == 0 {
            return Err(Error::Config(ConfigError::ZeroLimit("listing.max_page_size").to_string()));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::EmptyDatabasePath.to_string()));
        }
        Ok(())
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# Storyhub Configuration Example

[database]
# SQLite database file; ":memory:" keeps everything in process memory
path = "storyhub.db"

[limits]
# Maximum title/body lengths, in characters
max_title_len = 120
max_body_len = 5000

[listing]
# Largest page returned by most-viewed / top-rated listings
max_page_size = 100

[logging]
# Default filter; STORYHUB_LOG or RUST_LOG take precedence
level = "warn"
# "pretty", "json", or "compact"
format = "pretty"

[logging.file]
# Daily-rolling JSON log under ~/.storyhub/logs (or STORYHUB_LOG_DIR)
enabled = false
"#
    }
}

/// Configuration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A limit that must be positive was zero
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("database.path must not be empty")]
    EmptyDatabasePath,

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.path, PathBuf::from("storyhub.db"));
        assert_eq!(config.limits, StoryLimits::default());
        assert_eq!(config.listing.max_page_size, DEFAULT_MAX_PAGE_SIZE);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.file.enabled);
    }

    #[test]
    fn test_config_from_empty_toml() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.limits.max_title_len, 120);
        assert_eq!(config.limits.max_body_len, 5000);
    }

    #[test]
    fn test_config_from_toml_str() {
        let toml = r#"
[database]
path = ":memory:"

[limits]
max_title_len = 64
max_body_len = 1024

[listing]
max_page_size = 25

[logging]
level = "debug"
format = "json"
"#;

        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.database.is_in_memory());
        assert_eq!(config.limits.max_title_len, 64);
        assert_eq!(config.limits.max_body_len, 1024);
        assert_eq!(config.listing.max_page_size, 25);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_example_parses() {
        let config = Config::from_toml_str(Config::example()).unwrap();
        assert_eq!(config.database.path, PathBuf::from("storyhub.db"));
        assert!(!config.database.is_in_memory());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = Config::from_toml_str("[limits]\nmax_title_len = 0\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("limits.max_title_len must be greater than zero"));

        let result = Config::from_toml_str("[listing]\nmax_page_size = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Config::from_toml_str("[database]\npool_size = 4\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("storyhub.toml");
        std::fs::write(&path, "[database]\npath = \"stories.db\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.database.path, PathBuf::from("stories.db"));
    }

    #[test]
    fn test_from_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::from_file(&temp.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
