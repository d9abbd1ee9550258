//! Error types for the `tally` binary.
//!
//! [`CliError`] wraps every failure that can stop a command so `main` can
//! propagate with `?`. Tracking failures themselves never show up here;
//! the core swallows them by contract.

use tally_core::{ConfigError, CoreError, SinkError};

/// Top-level error for the `tally` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A core operation failed.
    #[error("core error: {source}")]
    Core {
        /// The underlying core error.
        #[from]
        source: CoreError,
    },

    /// A sink could not be constructed.
    #[error("sink error: {source}")]
    Sink {
        /// The underlying sink error.
        #[from]
        source: SinkError,
    },

    /// Command output failed to serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
