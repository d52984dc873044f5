//! Structured logging setup for the command-line tool

use crate::io::error::{Result, invalid_parameter};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Parse a log level name such as `warn` or `debug`
///
/// # Errors
///
/// Returns an error if `level` is not a recognised level
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level)
        .map_err(|err| invalid_parameter("log_level", &level, &err.to_string()))
}

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` takes precedence over `level` when set. Installing twice is
/// harmless; the first subscriber stays active.
///
/// # Errors
///
/// Returns an error if `level` is not a recognised level
pub fn init_logging(level: &str) -> Result<()> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("greedylayers={level}")));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("logging already initialised");
    }
    Ok(())
}
