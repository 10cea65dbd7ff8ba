//! Logging bootstrap built on the tracing ecosystem.
//!
//! # Environment Variables
//!
//! - `STORYHUB_LOG`: Filter directive (like `RUST_LOG`), e.g., `storyhub_store=debug`
//! - `STORYHUB_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `STORYHUB_LOG_DIR`: Directory for the rolling log file (default `~/.storyhub/logs`)
//!
//! # Example
//!
//! ```no_run
//! use storyhub_core::logging::{self, LoggingConfig};
//!
//! let _guard = logging::init_logging(Some(LoggingConfig::default().with_level("info")))?;
//! # Ok::<(), storyhub_core::Error>(())
//! ```

use crate::Error;
use crate::config::LoggingSection;
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level for stderr output.
    pub level: String,
    /// Output format for stderr; `None` picks one from the terminal.
    pub format: Option<LogFormat>,
    /// Write a daily-rolling JSON file alongside stderr.
    pub file: bool,
    /// Directory for the log file; falls back to `STORYHUB_LOG_DIR`, then `~/.storyhub/logs`.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: None, file: false, dir: None }
    }
}

impl From<LoggingSection> for LoggingConfig {
    fn from(section: LoggingSection) -> Self {
        Self {
            level: section.level,
            format: LogFormat::parse_str(&section.format),
            file: section.file.enabled,
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_file_logging(mut self, enabled: bool) -> Self {
        self.file = enabled;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Build an EnvFilter from this config and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("STORYHUB_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"))
    }

    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Determine the format for stderr output.
    ///
    /// `STORYHUB_LOG_FORMAT` wins over the config; otherwise TTYs get pretty output.
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("STORYHUB_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        if let Some(fmt) = self.format {
            return fmt;
        }

        if Self::is_tty() { LogFormat::Pretty } else { LogFormat::Compact }
    }

    fn log_dir(&self) -> Result<PathBuf, Error> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        if let Ok(custom_dir) = env::var("STORYHUB_LOG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;

        Ok(PathBuf::from(home).join(".storyhub").join("logs"))
    }
}

/// Initialize the global tracing subscriber.
///
/// Sets up an environment-based filter, formatted stderr output and, when
/// enabled, a JSON file layer. The returned guard flushes the file writer
/// on drop, so callers keep it alive for the life of the process.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>, Error> {
    let config = config.unwrap_or_default();
    let env_filter = config.build_env_filter();
    let format = config.detect_format();

    let registry = Registry::default().with(env_filter);

    if config.file {
        let log_dir = config.log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| Error::Config(format!("Failed to create log directory: {}", e)))?;

        let file_appender = tracing_appender::rolling::daily(&log_dir, "storyhub.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let installed = match format {
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true))
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init(),
        };
        installed.map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;
        tracing::debug!("File logging to {}", log_dir.display());

        return Ok(Some(guard));
    }

    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true))
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(io::stderr)).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact().with_writer(io::stderr)).try_init(),
    };
    installed.map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;

    Ok(None)
}

/// Shorten free text (story titles, queries) for log fields.
pub fn truncate_for_log(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }

    let mut truncated = content.chars().take(max_chars).collect::<String>();
    truncated.push_str(&format!("... ({} total chars)", total));
    truncated
}
