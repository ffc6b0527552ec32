//! Pipeline error types

use smelt_config::{ConfigError, Mode};
use smelt_core::{CompileError, ResolveError, StorageError};
use thiserror::Error;

/// Fatal, session-level failures raised before any file is processed
#[derive(Debug, Error)]
pub enum SessionError {
    /// A named stage is not in the host's plugin list
    #[error(
        "stage '{name}' not found in the host configuration ({mode} mode); \
         is it added to the host config before smelt?"
    )]
    StageNotFound {
        /// Name as configured
        name: String,
        /// Chain being resolved
        mode: Mode,
    },

    /// The named plugin exists but cannot transform
    #[error("host plugin '{name}' has no transform hook and cannot be used as a stage")]
    StageWithoutTransform {
        /// Plugin name
        name: String,
    },

    /// The chain names this pipeline itself
    #[error("stage '{name}' refers to the pipeline itself")]
    SelfReference {
        /// The offending name
        name: String,
    },

    /// Configuration rejected at session start
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// File-scoped failures; other files are unaffected
#[derive(Debug, Error)]
pub enum TransformError {
    /// The compiler rejected the source
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// A downstream stage failed
    #[error("stage '{stage}' failed on '{id}': {message}")]
    Stage {
        /// Stage name
        stage: String,
        /// Identifier the stage received
        id: String,
        /// Stage diagnostic
        message: String,
    },

    /// The source could not be read
    #[error("failed to load '{id}': {source}")]
    Load {
        /// Identifier being loaded
        id: String,
        /// Storage failure
        #[source]
        source: StorageError,
    },

    /// The host resolver failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result alias for session start
pub type SessionResult<T> = Result<T, SessionError>;

/// Result alias for per-file operations
pub type FileResult<T> = Result<T, TransformError>;
