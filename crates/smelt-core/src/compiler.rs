//! Compiler adapter contract
//!
//! The alternate-syntax compiler is external; the pipeline only relies on the
//! contract below. It is called at most once per file per pass, and a failure
//! is scoped to the file being compiled.

use crate::SourceMap;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Options for one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Identifier of the source, used in diagnostics and maps
    pub filename: String,
    /// Remove type annotations from the output
    pub strip_types: bool,
    /// Embed the position map in the output as a trailing comment
    pub inline_map: bool,
}

impl CompileOptions {
    /// Options for `filename` with an inline map
    pub fn new(filename: impl Into<String>, strip_types: bool) -> Self {
        Self {
            filename: filename.into(),
            strip_types,
            inline_map: true,
        }
    }
}

/// Compiler output
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    /// Translated code
    pub code: String,
    /// Separate position map; `None` when the map is inline or absent
    pub map: Option<SourceMap>,
}

impl CompileOutput {
    /// Output with code only
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Line and column in the original source (1-based line, 0-based column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// 1-based line
    pub line: u32,
    /// 0-based column
    pub column: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A file failed to compile
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "{id}{location}: {message}",
    location = .position.map(|p| format!(":{}", p)).unwrap_or_default()
)]
pub struct CompileError {
    /// Identifier of the file that failed
    pub id: String,
    /// Where in the source, if the compiler said
    pub position: Option<SourcePosition>,
    /// Compiler diagnostic
    pub message: String,
}

impl CompileError {
    /// Error without a position
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            message: message.into(),
        }
    }

    /// Attach a source position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.position = Some(SourcePosition { line, column });
        self
    }
}

/// The external alternate-syntax compiler
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Translate `source` into the target syntax
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] carrying `options.filename` when the source
    /// is malformed or the compiler cannot run.
    async fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompileError>;
}
