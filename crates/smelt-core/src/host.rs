//! Contracts consumed from the host build system

use crate::Stage;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A component in the host's finalized plugin list
///
/// Only the name and the transform capability matter to the pipeline; a plugin
/// without a transform can be listed but not used as a stage.
pub trait HostPlugin: Send + Sync {
    /// Exact name stages are looked up by
    fn name(&self) -> &str;

    /// The plugin's transform hook, if it has one
    fn transform_stage(&self) -> Option<Arc<dyn Stage>>;
}

/// A host plugin made from a name and an optional stage
#[derive(Clone)]
pub struct StagePlugin {
    name: String,
    stage: Option<Arc<dyn Stage>>,
}

impl StagePlugin {
    /// Plugin exposing `stage` as its transform
    pub fn new(name: impl Into<String>, stage: Arc<dyn Stage>) -> Self {
        Self {
            name: name.into(),
            stage: Some(stage),
        }
    }

    /// Plugin with no transform capability
    pub fn without_transform(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: None,
        }
    }
}

impl fmt::Debug for StagePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagePlugin")
            .field("name", &self.name)
            .field("has_transform", &self.stage.is_some())
            .finish()
    }
}

impl HostPlugin for StagePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform_stage(&self) -> Option<Arc<dyn Stage>> {
        self.stage.clone()
    }
}

/// Options forwarded to the host resolver unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Resolving for server-side rendering
    pub ssr: bool,
    /// The identifier is a build entry point
    pub is_entry: bool,
}

/// Outcome of a host resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved to a concrete module identifier
    Resolved(String),
    /// The module is external and must not be loaded
    External(String),
    /// The host could not resolve the identifier
    Unresolved,
}

/// The host failed while resolving
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to resolve '{id}': {message}")]
pub struct ResolveError {
    /// Identifier being resolved
    pub id: String,
    /// Why resolution failed
    pub message: String,
}

impl ResolveError {
    /// Create a resolve error
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// The host's module resolution service
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `id` as imported from `importer`
    async fn resolve(
        &self,
        id: &str,
        importer: Option<&str>,
        options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError>;
}

/// How the host's single-file type stripper should parse a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLoader {
    /// Typed syntax with markup extensions
    Tsx,
    /// Typed syntax
    Ts,
}

impl SourceLoader {
    /// Loader name as hosts spell it
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLoader::Tsx => "tsx",
            SourceLoader::Ts => "ts",
        }
    }
}

/// Configuration the pipeline asks the host to merge before any file is processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfigPatch {
    /// Regex over identifiers the host's type stripper must treat as typed source
    pub typed_source_pattern: String,
    /// Loader the stripper should use for those identifiers
    pub loader: SourceLoader,
}
