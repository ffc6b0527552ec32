//! File access seams
//!
//! Raw file I/O is outside the pipeline. The router reads sources through
//! [`SourceReader`] and the declaration emitter persists through
//! [`ArtifactStore`]; [`FsStorage`] implements both on the local filesystem.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O failure on a specific path
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure
    #[error("storage error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reads raw source text
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Read the file at `path` as UTF-8
    async fn read_source(&self, path: &str) -> StorageResult<String>;
}

/// Persists derived artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `contents` to `path`, replacing any existing file and creating
    /// missing parent directories
    async fn write_artifact(&self, path: &str, contents: &str) -> StorageResult<()>;
}

/// Local filesystem storage
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Create filesystem storage
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceReader for FsStorage {
    async fn read_source(&self, path: &str) -> StorageResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }
}

#[async_trait]
impl ArtifactStore for FsStorage {
    async fn write_artifact(&self, path: &str, contents: &str) -> StorageResult<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io(parent, e))?;
            }
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| StorageError::io(path, e))
    }
}
