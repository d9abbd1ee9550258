//! Command-line front end for tally.
//!
//! Loads configuration, opens the local store, wires the configured sinks,
//! and runs a single command: print the visitor's segment, emit an event,
//! or inspect the event log.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load configuration (`--config`, `TALLY_CONFIG`, or `tally.yaml`)
//! 3. Initialize structured logging (tracing, to stderr)
//! 4. Build the store, sinks, and tracker
//! 5. Run the command and wait for beacon deliveries

mod app;
mod cli;
mod error;

use std::path::{Path, PathBuf};

use clap::Parser;
use tally_core::TallyConfig;
use tally_core::config::{DEFAULT_CONFIG_PATH, ENV_CONFIG, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::Cli;
use crate::error::CliError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if arguments, configuration, or the command fail.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    init_logging(&config.logging);
    info!(
        store = %config.storage.path.display(),
        experiments = config.experiments.len(),
        beacon = config.sinks.beacon_url.as_deref().unwrap_or("disabled"),
        "tally starting"
    );

    let app = App::build(&config)?;
    app.run(cli.command).await?;
    Ok(())
}

/// Resolve and load the configuration file.
///
/// An explicit path must exist. Without one, `TALLY_CONFIG` is tried, then
/// `tally.yaml`; if neither exists, defaults are used.
fn load_config(explicit: Option<PathBuf>) -> Result<TallyConfig, CliError> {
    let env_path = std::env::var(ENV_CONFIG).ok();
    match TallyConfig::resolve_path(explicit, env_path, Path::new(DEFAULT_CONFIG_PATH)) {
        Some(path) => Ok(TallyConfig::from_file(&path)?),
        None => Ok(TallyConfig::parse("")?),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
