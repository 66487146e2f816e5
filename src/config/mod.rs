//! Configuration management.

use crate::scanner::SourceLanguage;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "PROMPTREE_CONFIG_PATH";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "promptree.toml";

/// Default document file name inside the repository.
pub const DEFAULT_STORE_FILE: &str = "prompts.json";

/// Main configuration for promptree.
#[derive(Debug, Clone)]
pub struct PromptreeConfig {
    /// Working copy holding the document.
    pub repo_path: PathBuf,
    /// Document path relative to `repo_path`.
    pub store_file: String,
    /// Scanner settings.
    pub scan: ScanSettings,
    /// History settings.
    pub history: HistorySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// File the configuration was loaded from, if any.
    pub source: Option<PathBuf>,
}

/// Scanner settings.
#[derive(Debug, Clone, Default)]
pub struct ScanSettings {
    /// Language of the scanned source tree.
    pub language: SourceLanguage,
    /// Directory names to skip in addition to the built-in list.
    pub skip_dirs: Vec<String>,
}

/// History settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistorySettings {
    /// Default listing limit; `None` lists everything.
    pub max_results: Option<usize>,
}

/// Logging section, interpreted by [`crate::observability`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `promptree=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Repository path.
    pub repo_path: Option<String>,
    /// Document file name.
    pub store_file: Option<String>,
    /// Scan section.
    pub scan: Option<ConfigFileScan>,
    /// History section.
    pub history: Option<ConfigFileHistory>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Scan section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileScan {
    /// Source language name.
    pub language: Option<String>,
    /// Extra directory names to skip.
    pub skip_dirs: Option<Vec<String>>,
}

/// History section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileHistory {
    /// Default listing limit; `0` lists everything.
    pub max_results: Option<usize>,
}

impl Default for PromptreeConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            store_file: DEFAULT_STORE_FILE.to_string(),
            scan: ScanSettings::default(),
            history: HistorySettings::default(),
            logging: LoggingSettings::default(),
            source: None,
        }
    }
}

impl PromptreeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration using the standard lookup order.
    ///
    /// 1. `explicit`, usually the `--config` flag
    /// 2. The file named by `PROMPTREE_CONFIG_PATH`
    /// 3. `./promptree.toml`
    /// 4. `config.toml` in the platform config directory
    ///
    /// Returns defaults if none of these exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed. An
    /// explicitly named file that does not exist is also an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Self::load_from_file(Path::new(&path));
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::load_from_file(&local);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "promptree") {
            let platform = dirs.config_dir().join("config.toml");
            if platform.is_file() {
                return Self::load_from_file(&platform);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::storage("read_config_file", format!("{}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed TOML, unknown keys, or an unsupported
    /// scan language.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::storage("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Converts a `ConfigFile` to `PromptreeConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(repo_path) = file.repo_path {
            config.repo_path = PathBuf::from(repo_path);
        }
        if let Some(store_file) = file.store_file {
            config.store_file = store_file;
        }
        if let Some(scan) = file.scan {
            if let Some(language) = scan.language {
                config.scan.language = SourceLanguage::parse(&language).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "unsupported scan language '{language}' (expected python or rust)"
                    ))
                })?;
            }
            if let Some(skip_dirs) = scan.skip_dirs {
                config.scan.skip_dirs = skip_dirs;
            }
        }
        if let Some(history) = file.history {
            config.history.max_results = history.max_results.filter(|&n| n > 0);
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        Ok(config)
    }

    /// Sets the repository path.
    #[must_use]
    pub fn with_repo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_path = path.into();
        self
    }

    /// Sets the document file name.
    #[must_use]
    pub fn with_store_file(mut self, file: impl Into<String>) -> Self {
        self.store_file = file.into();
        self
    }

    /// Sets the scan language.
    #[must_use]
    pub const fn with_language(mut self, language: SourceLanguage) -> Self {
        self.scan.language = language;
        self
    }
}
