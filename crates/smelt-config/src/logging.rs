//! Logging configuration
//!
//! Read by the CLI when it installs the tracing subscriber. Library crates only
//! emit through `tracing` and never look at this.

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `smelt_pipeline=debug,info`
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Whether to use ANSI colors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            ansi: true,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human readable output
    #[serde(rename = "text")]
    #[default]
    Text,
    /// Multi-line human readable output
    #[serde(rename = "pretty")]
    Pretty,
    /// Newline-delimited JSON
    #[serde(rename = "json")]
    Json,
}
