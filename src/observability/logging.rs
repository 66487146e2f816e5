//! Logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Environment variable with the highest-priority filter directive.
pub const LOG_ENV: &str = "PROMPTREE_LOG";

/// Filter used when nothing else is configured.
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, defaulting to `Pretty` for anything unrecognised.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    pub directive: String,
    /// Output format.
    pub format: LogFormat,
    /// Log file; `None` logs to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directive: DEFAULT_DIRECTIVE.to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds the configuration from config file settings and the environment.
    ///
    /// The filter comes from `PROMPTREE_LOG`, then `RUST_LOG`, then `debug`
    /// when `verbose` is set, then the configured level, then `warn`.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let directive = resolve_directive(
            [std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok()],
            settings.level.as_deref(),
            verbose,
        );
        Self {
            directive,
            format: settings
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or_default(),
            file: settings.file.clone(),
        }
    }
}

fn resolve_directive(env: [Option<String>; 2], level: Option<&str>, verbose: bool) -> String {
    env.into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| verbose.then(|| "debug".to_string()))
        .or_else(|| level.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}
