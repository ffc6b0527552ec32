//! Tracing subscriber setup
//!
//! Filter precedence: `--log-level`/`--verbose`, then `RUST_LOG`, then the
//! config file's `logging.level`. Logs go to stderr so `--stdout` output
//! stays clean.

use anyhow::{anyhow, Context, Result};
use smelt_config::{LogFormat, LoggingConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Build the filter for the given settings
pub fn build_filter(config: &LoggingConfig, level_override: Option<LevelFilter>) -> Result<EnvFilter> {
    if let Some(level) = level_override {
        return Ok(EnvFilter::new(level.to_string()));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid logging.level '{}'", config.level))
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig, level_override: Option<LevelFilter>) -> Result<()> {
    let filter = build_filter(config, level_override)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}
