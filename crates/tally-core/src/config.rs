//! Configuration loading and typed config structures for tally.
//!
//! The configuration lives in `tally.yaml`. Every section is optional and
//! falls back to defaults, so an empty file (or no file) yields a working
//! setup: a file store under `.tally/`, the storefront experiments, no
//! network sinks, and `info` logging.
//!
//! Environment variables override the file:
//! - `TALLY_STORE_PATH` overrides `storage.path`
//! - `TALLY_BEACON_URL` overrides `sinks.beacon_url`
//! - `TALLY_LOG_LEVEL` overrides `logging.level`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::ExperimentCatalog;
use crate::event_log::DEFAULT_MAX_EVENTS;

/// Environment variable naming the config file.
pub const ENV_CONFIG: &str = "TALLY_CONFIG";
/// Environment variable overriding `storage.path`.
pub const ENV_STORE_PATH: &str = "TALLY_STORE_PATH";
/// Environment variable overriding `sinks.beacon_url`.
pub const ENV_BEACON_URL: &str = "TALLY_BEACON_URL";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "TALLY_LOG_LEVEL";
/// Config file used when neither `--config` nor `TALLY_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "tally.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content, including invalid experiment catalogs.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TallyConfig {
    /// Local store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Event log settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// Experiment name to variant list.
    #[serde(default = "ExperimentCatalog::conversion_defaults")]
    pub experiments: ExperimentCatalog,

    /// External sinks.
    #[serde(default)]
    pub sinks: SinksConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            events: EventsConfig::default(),
            experiments: ExperimentCatalog::conversion_defaults(),
            sinks: SinksConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TallyConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid, or [`ConfigError::Invalid`]
    /// if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with(yaml, |name| std::env::var(name).ok())
    }

    /// [`parse`](Self::parse) with overrides read through `lookup` instead
    /// of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse).
    pub fn parse_with(
        yaml: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Override values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override values with whatever `lookup` returns for the
    /// `TALLY_*` variable names.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(ENV_STORE_PATH) {
            self.storage.path = PathBuf::from(val);
        }
        if let Some(val) = lookup(ENV_BEACON_URL) {
            self.sinks.beacon_url = Some(val);
        }
        if let Some(val) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = val;
        }
    }

    /// Pick the config file to load.
    ///
    /// An explicit path wins, then the path named by `TALLY_CONFIG`
    /// (`env_path`), then `default_path` if it exists. `None` means run
    /// on defaults.
    pub fn resolve_path(
        explicit: Option<PathBuf>,
        env_path: Option<String>,
        default_path: &Path,
    ) -> Option<PathBuf> {
        explicit
            .or_else(|| env_path.filter(|p| !p.is_empty()).map(PathBuf::from))
            .or_else(|| default_path.exists().then(|| default_path.to_path_buf()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sinks.beacon_timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "sinks.beacon_timeout_ms must be greater than zero",
            )));
        }
        if self.sinks.beacon_url.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid(String::from(
                "sinks.beacon_url must not be empty",
            )));
        }
        Ok(())
    }
}

/// Where the local store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// A JSON file at `storage.path`.
    #[default]
    File,
    /// In-process only; nothing survives the run.
    Memory,
}

/// Local store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path of the store file (file backend).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Byte quota (memory backend). Unlimited when absent.
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_store_path(),
            quota_bytes: None,
        }
    }
}

/// Event log settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventsConfig {
    /// Retention cap on persisted events (0 = unlimited).
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
        }
    }
}

/// External sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SinksConfig {
    /// Backend endpoint for beacon delivery. No beacon sink when absent.
    #[serde(default)]
    pub beacon_url: Option<String>,

    /// Beacon request timeout in milliseconds.
    #[serde(default = "default_beacon_timeout_ms")]
    pub beacon_timeout_ms: u64,

    /// Whether to queue events for a tag manager.
    #[serde(default)]
    pub data_layer: bool,
}

impl SinksConfig {
    /// The beacon timeout as a [`Duration`].
    pub const fn beacon_timeout(&self) -> Duration {
        Duration::from_millis(self.beacon_timeout_ms)
    }
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            beacon_url: None,
            beacon_timeout_ms: default_beacon_timeout_ms(),
            data_layer: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or an `EnvFilter`
    /// directive string.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".tally/store.json")
}

const fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

const fn default_beacon_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    String::from("info")
}
