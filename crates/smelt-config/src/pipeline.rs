//! Pipeline configuration
//!
//! Everything a session needs that can be written down in a config file. Stage
//! callables and the custom post-compile transform are code, so they are supplied
//! through the pipeline builder instead.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default exclude pattern: installed dependencies
pub const DEFAULT_EXCLUDE: &str = "**/node_modules/**";

/// Default extension of files written in the alternate syntax
pub const DEFAULT_INPUT_EXTENSION: &str = ".civet";

/// Default marker appended to rerouted identifiers
pub const DEFAULT_MARKER_SUFFIX: &str = "?transform";

/// Default suffix of emitted declaration artifacts
pub const DEFAULT_DECLARATION_SUFFIX: &str = ".d.ts";

/// Session mode reported by the host build system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Production build
    Build,
    /// Interactive dev server
    #[default]
    Serve,
}

impl Mode {
    /// Both modes, build first
    pub const ALL: [Mode; 2] = [Mode::Build, Mode::Serve];

    /// Lowercase name as used in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Build => "build",
            Mode::Serve => "serve",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one transform pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Glob patterns of identifiers the pipeline owns
    ///
    /// Defaults to every file with the input extension.
    pub include: Option<Vec<String>>,

    /// Glob patterns removed from `include`
    pub exclude: Vec<String>,

    /// Extension of source files in the alternate syntax
    pub input_extension: String,

    /// Extension the compiled artifact pretends to have.
    ///
    /// Defaults to `.js` when types are stripped and `.ts` otherwise.
    pub output_extension: Option<String>,

    /// Whether the compiler should strip type annotations.
    ///
    /// Defaults to stripping when no downstream stage is configured, since
    /// nothing after the compiler could remove them. Keeping types is opt-in:
    /// an empty chain yields `.js`, never `.ts`.
    pub strip_types: Option<bool>,

    /// Token appended after the output extension on rerouted identifiers
    pub marker_suffix: String,

    /// Downstream stages per mode
    pub stages: ModeStages,

    /// Declaration artifact emission
    pub declarations: DeclarationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            include: None,
            exclude: vec![DEFAULT_EXCLUDE.to_string()],
            input_extension: DEFAULT_INPUT_EXTENSION.to_string(),
            output_extension: None,
            strip_types: None,
            marker_suffix: DEFAULT_MARKER_SUFFIX.to_string(),
            stages: ModeStages::default(),
            declarations: DeclarationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Effective type-stripping flag
    pub fn strip_types(&self) -> bool {
        self.strip_types.unwrap_or_else(|| self.stages.is_empty())
    }

    /// Effective output extension, always with a leading dot
    pub fn output_extension(&self) -> String {
        match &self.output_extension {
            Some(ext) => normalize_extension(ext),
            None if self.strip_types() => ".js".to_string(),
            None => ".ts".to_string(),
        }
    }

    /// Input extension with a leading dot
    pub fn input_extension(&self) -> String {
        normalize_extension(&self.input_extension)
    }

    /// Effective include patterns
    pub fn include(&self) -> Vec<String> {
        match &self.include {
            Some(patterns) => patterns.clone(),
            None => vec![format!("**/*{}", self.input_extension())],
        }
    }

    /// Check that the configuration can start a session
    ///
    /// Compiles every glob, and rejects empty extensions or markers. A marker
    /// that could appear inside a plain path (no `?` or `\0` prefix) is allowed
    /// but logged, since it makes ownership checks ambiguous.
    pub fn validate(&self) -> ConfigResult<()> {
        let include = self.include();
        for pattern in include.iter().chain(self.exclude.iter()) {
            globset::Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.kind().to_string(),
            })?;
        }

        if include.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline.include",
                "at least one include pattern is required",
            ));
        }

        if self.input_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline.input_extension",
                "extension must not be empty",
            ));
        }

        if let Some(ext) = &self.output_extension {
            if ext.trim_start_matches('.').is_empty() {
                return Err(ConfigError::invalid_value(
                    "pipeline.output_extension",
                    "extension must not be empty",
                ));
            }
        }

        if self.output_extension() == self.input_extension() {
            return Err(ConfigError::invalid_value(
                "pipeline.output_extension",
                format!(
                    "'{}' is the input extension; rerouted identifiers would be ambiguous",
                    self.output_extension()
                ),
            ));
        }

        if self.marker_suffix.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline.marker_suffix",
                "marker must not be empty",
            ));
        }

        let marker_is_query = self
            .marker_suffix
            .starts_with(|c: char| c == '?' || c == '\0');
        if !marker_is_query {
            tracing::warn!(
                marker = %self.marker_suffix,
                "marker suffix does not start with '?'; it may collide with real file names"
            );
        }

        if self.declarations.suffix.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline.declarations.suffix",
                "suffix must not be empty",
            ));
        }

        Ok(())
    }
}

/// Ensure an extension starts with a dot (`jsx` and `.jsx` are equivalent)
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    }
}

/// Ordered stage identifiers for each mode
///
/// In a config file this is either a table with `build` and `serve` keys, or a
/// single name / list of names shared by both modes:
///
/// ```toml
/// [pipeline.stages]
/// build = ["vite:react-babel"]
/// serve = "vite:react-babel"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "ModeStagesRepr")]
pub struct ModeStages {
    /// Stages applied in production builds
    pub build: Vec<String>,
    /// Stages applied by the dev server
    pub serve: Vec<String>,
}

impl ModeStages {
    /// Same chain for both modes
    pub fn shared(names: Vec<String>) -> Self {
        Self {
            build: names.clone(),
            serve: names,
        }
    }

    /// Stage identifiers configured for `mode`
    pub fn for_mode(&self, mode: Mode) -> &[String] {
        match mode {
            Mode::Build => &self.build,
            Mode::Serve => &self.serve,
        }
    }

    /// True when neither mode has a stage
    pub fn is_empty(&self) -> bool {
        self.build.is_empty() && self.serve.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(name) => vec![name],
            OneOrMany::Many(names) => names,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PerModeRepr {
    #[serde(default)]
    build: Option<OneOrMany>,
    #[serde(default)]
    serve: Option<OneOrMany>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeStagesRepr {
    Shared(OneOrMany),
    PerMode(PerModeRepr),
}

impl From<ModeStagesRepr> for ModeStages {
    fn from(repr: ModeStagesRepr) -> Self {
        match repr {
            ModeStagesRepr::Shared(names) => ModeStages::shared(names.into()),
            ModeStagesRepr::PerMode(PerModeRepr { build, serve }) => ModeStages {
                build: build.map(Into::into).unwrap_or_default(),
                serve: serve.map(Into::into).unwrap_or_default(),
            },
        }
    }
}

/// Declaration artifact emission settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeclarationConfig {
    /// Attach the declaration emitter to the chain
    pub enabled: bool,

    /// Modes whose chain gets the emitter slot
    pub modes: Vec<Mode>,

    /// Appended to the source path to name the artifact
    pub suffix: String,

    /// Transformer overrides handed to the declaration generator
    pub transformers: TransformerOverrides,
}

impl Default for DeclarationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            modes: vec![Mode::Serve],
            suffix: DEFAULT_DECLARATION_SUFFIX.to_string(),
            transformers: TransformerOverrides::default(),
        }
    }
}

impl DeclarationConfig {
    /// Whether the emitter rides in the chain for `mode`
    pub fn active_for(&self, mode: Mode) -> bool {
        self.enabled && self.modes.contains(&mode)
    }
}

/// Per-mode transformer overrides for declaration generation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransformerOverrides {
    /// Used in production builds
    pub build: Option<TransformerSet>,
    /// Used by the dev server
    pub serve: Option<TransformerSet>,
}

impl TransformerOverrides {
    /// Overrides for `mode`, if any
    pub fn for_mode(&self, mode: Mode) -> Option<&TransformerSet> {
        match mode {
            Mode::Build => self.build.as_ref(),
            Mode::Serve => self.serve.as_ref(),
        }
    }
}

/// Named transformers grouped by the phase they run in
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransformerSet {
    /// Run before the generator's own transforms
    pub before: Vec<String>,
    /// Run after the generator's own transforms
    pub after: Vec<String>,
    /// Run on the declaration output
    pub after_declarations: Vec<String>,
}
