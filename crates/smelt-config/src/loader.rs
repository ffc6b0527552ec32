//! Configuration loading
//!
//! A config file has three top-level sections, all optional:
//!
//! ```toml
//! [pipeline]
//! output_extension = "jsx"
//! strip_types = true
//! stages = "vite:react-babel"
//!
//! [logging]
//! level = "debug"
//!
//! [tools.compiler]
//! program = "civet"
//! ```
//!
//! Files ending in `.json` are parsed as JSON, everything else as TOML.

use crate::{ConfigError, ConfigResult, LoggingConfig, PipelineConfig, ToolsConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Root of a smelt config file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmeltConfig {
    /// Transform pipeline settings
    pub pipeline: PipelineConfig,
    /// Logging settings for the CLI
    pub logging: LoggingConfig,
    /// External commands spawned by the CLI
    pub tools: ToolsConfig,
}

impl SmeltConfig {
    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.pipeline.validate()?;
        self.tools.validate()
    }
}

/// Loads and validates [`SmeltConfig`] values
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a config file, picking the format from its extension
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, a parse error if
    /// it is malformed, and a validation error if the values are unusable.
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<SmeltConfig> {
        let path = path.as_ref();
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        debug!(
            path = %path.display(),
            format = if is_json { "json" } else { "toml" },
            "Loading config file"
        );

        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(contents: &str) -> ConfigResult<SmeltConfig> {
        let config: SmeltConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON text
    pub fn from_json_str(contents: &str) -> ConfigResult<SmeltConfig> {
        let config: SmeltConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}
