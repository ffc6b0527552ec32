//! Declaration generation contract
//!
//! Deriving type declarations from compiled code is done by an external tool
//! (typically a single-file TypeScript transpile with declaration output). The
//! pipeline builds a [`DeclarationRequest`] and post-processes the answer.

use crate::TransformerSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compiler options sent with every declaration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationOptions {
    /// Produce declaration text
    pub declaration: bool,
    /// Produce a map for the declaration text
    pub declaration_map: bool,
    /// Skip emitting code
    pub emit_declaration_only: bool,
    /// Language level of the input
    pub target: String,
    /// Module system of the input
    pub module: String,
    /// How imports in the input are resolved
    pub module_resolution: String,
    /// Accept imports of files with unknown extensions, such as sources in the alternate syntax
    pub allow_arbitrary_extensions: bool,
    /// Accept imports spelled with typed-source extensions
    pub allow_importing_ts_extensions: bool,
    /// Do not type-check library declarations
    pub skip_lib_check: bool,
    /// Check `bind`, `call` and `apply` arguments strictly
    pub strict_bind_call_apply: bool,
    /// Emit a separate map file
    pub source_map: bool,
    /// Inline the map as a comment
    pub inline_source_map: bool,
}

impl Default for DeclarationOptions {
    fn default() -> Self {
        Self {
            declaration: true,
            declaration_map: true,
            emit_declaration_only: true,
            target: "ESNext".to_string(),
            module: "ESNext".to_string(),
            module_resolution: "NodeNext".to_string(),
            allow_arbitrary_extensions: true,
            allow_importing_ts_extensions: true,
            skip_lib_check: true,
            strict_bind_call_apply: true,
            source_map: true,
            inline_source_map: false,
        }
    }
}

/// One declaration generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationRequest {
    /// Compiled code to derive declarations from
    pub code: String,
    /// Source file the code was compiled from
    pub file_name: String,
    /// Generator options
    pub options: DeclarationOptions,
    /// Transformer overrides for the session's mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformers: Option<TransformerSet>,
}

/// Generator output: declaration text and its map as JSON text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationOutput {
    /// Declaration source, possibly ending in a `sourceMappingURL` comment
    pub text: String,
    /// Source map JSON for `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

/// Declaration generation failed
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The generator rejected the input
    #[error("declaration generation failed for '{file}': {message}")]
    Failed {
        /// Source file
        file: String,
        /// Generator diagnostic
        message: String,
    },

    /// The generator could not be run
    #[error("declaration generator unavailable: {0}")]
    Unavailable(String),
}

/// The external declaration generator
#[async_trait]
pub trait DeclarationGenerator: Send + Sync {
    /// Derive declarations for `request.code`
    async fn generate(
        &self,
        request: DeclarationRequest,
    ) -> Result<DeclarationOutput, GeneratorError>;
}
