//! Mock Implementations for Testing
//!
//! In-memory stand-ins for every external collaborator the pipeline talks to.
//! They are deterministic, record every call for assertions, and support error
//! injection.
//!
//! # Examples
//!
//! ```rust
//! use smelt_core::test_support::mocks::MockCompiler;
//! use smelt_core::{CompileOptions, Compiler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let compiler = MockCompiler::new().without_inline_map();
//! let output = compiler
//!     .compile("answer := 42", &CompileOptions::new("/src/a.civet", true))
//!     .await?;
//!
//! assert_eq!(output.code, "const answer = 42;");
//! assert_eq!(compiler.call_count(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::source_map::MAPPING_URL_COMMENT;
use crate::{
    ArtifactStore, CompileError, CompileOptions, CompileOutput, Compiler, DeclarationGenerator,
    DeclarationOutput, DeclarationRequest, GeneratorError, HostResolver, PartialResult,
    ResolveError, ResolveOptions, Resolution, SourceMap, SourceReader, Stage, StageError,
    StageOutput, StageResult, StorageError, StorageResult, TransformContext,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// ============================================================================
// Mock Compiler
// ============================================================================

/// A tiny compiler for the declaration subset of the alternate syntax
///
/// Understands one statement per line:
///
/// - `name := value` → `const name = value;`
/// - `name: Type := value` → `const name: Type = value;` (type dropped when stripping)
/// - `name .= value` → `let name = value;`
///
/// Blank lines and `//` comments pass through; any other line is copied as-is.
/// A declaration with an empty name or value is a compile error positioned at
/// the operator.
#[derive(Debug, Default)]
pub struct MockCompiler {
    inline_map: bool,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockCompiler {
    /// Compiler emitting inline maps when asked to
    pub fn new() -> Self {
        Self {
            inline_map: true,
            ..Default::default()
        }
    }

    /// Never emit an inline map, whatever the options say
    pub fn without_inline_map(mut self) -> Self {
        self.inline_map = false;
        self
    }

    /// Fail every compilation with `message`
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    /// Number of `compile` calls so far
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Filenames passed to `compile`, in call order
    pub fn compiled_files(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn compile_line(
        line: &str,
        line_number: u32,
        options: &CompileOptions,
    ) -> Result<String, CompileError> {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];

        if trimmed.is_empty() || trimmed.starts_with("//") {
            return Ok(line.to_string());
        }

        let (operator, keyword) = if trimmed.contains(":=") {
            (":=", "const")
        } else if trimmed.contains(".=") {
            (".=", "let")
        } else {
            return Ok(line.to_string());
        };

        let split = trimmed.find(operator).unwrap_or_default();
        let column = (indent.len() + split) as u32;
        let lhs = trimmed[..split].trim();
        let rhs = trimmed[split + operator.len()..].trim().trim_end_matches(';');

        let (name, annotation) = match lhs.split_once(':') {
            Some((name, ty)) => (name.trim(), Some(ty.trim())),
            None => (lhs, None),
        };

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
        if !valid_name {
            return Err(CompileError::new(
                &options.filename,
                format!("expected identifier before '{}'", operator),
            )
            .at(line_number, column));
        }
        if rhs.is_empty() {
            return Err(CompileError::new(
                &options.filename,
                format!("expected expression after '{}'", operator),
            )
            .at(line_number, column));
        }

        let annotation = match annotation {
            Some(ty) if !options.strip_types => format!(": {}", ty),
            _ => String::new(),
        };

        Ok(format!("{}{} {}{} = {};", indent, keyword, name, annotation, rhs))
    }
}

#[async_trait]
impl Compiler for MockCompiler {
    async fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompileError> {
        lock(&self.calls).push(options.filename.clone());

        if let Some(message) = lock(&self.failure).clone() {
            return Err(CompileError::new(&options.filename, message));
        }

        let mut lines = Vec::new();
        for (index, line) in source.lines().enumerate() {
            lines.push(Self::compile_line(line, index as u32 + 1, options)?);
        }
        let mut code = lines.join("\n");

        if self.inline_map && options.inline_map {
            let mappings = std::iter::once("AAAA")
                .chain(std::iter::repeat("AACA").take(lines.len().saturating_sub(1)))
                .collect::<Vec<_>>()
                .join(";");
            let map = SourceMap::new(
                basename(&options.filename),
                vec![basename(&options.filename).to_string()],
                mappings,
            );
            let url = map
                .to_data_url()
                .map_err(|e| CompileError::new(&options.filename, e.to_string()))?;
            code.push('\n');
            code.push_str(MAPPING_URL_COMMENT);
            code.push_str(&url);
        }

        Ok(CompileOutput { code, map: None })
    }
}

// ============================================================================
// Recording Stage
// ============================================================================

/// What a [`RecordingStage`] answers with
#[derive(Debug, Clone)]
pub enum StageResponse {
    /// Decline every file
    Decline,
    /// Replace the code with a fixed string
    Replace(String),
    /// Append a suffix to the incoming code
    Append(String),
    /// Return a structured partial result
    Partial(PartialResult),
    /// Fail with a message
    Fail(String),
}

/// One recorded stage invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCall {
    /// Code the stage received
    pub code: String,
    /// Identifier the stage received
    pub id: String,
    /// Server-rendering flag the stage received
    pub ssr: bool,
}

/// A stage that answers with a configured response and records its calls
#[derive(Debug)]
pub struct RecordingStage {
    name: String,
    response: StageResponse,
    calls: Mutex<Vec<StageCall>>,
}

impl RecordingStage {
    /// Stage named `name` answering with `response`
    pub fn new(name: &str, response: StageResponse) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            response,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Stage that declines everything
    pub fn declining(name: &str) -> Arc<Self> {
        Self::new(name, StageResponse::Decline)
    }

    /// Stage that appends `suffix` to the code
    pub fn appending(name: &str, suffix: &str) -> Arc<Self> {
        Self::new(name, StageResponse::Append(suffix.to_string()))
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<StageCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> StageResult<StageOutput> {
        lock(&self.calls).push(StageCall {
            code: code.to_string(),
            id: id.to_string(),
            ssr: ctx.ssr,
        });

        match &self.response {
            StageResponse::Decline => Ok(StageOutput::Declined),
            StageResponse::Replace(code) => Ok(StageOutput::code(code.clone())),
            StageResponse::Append(suffix) => Ok(StageOutput::code(format!("{}{}", code, suffix))),
            StageResponse::Partial(partial) => Ok(StageOutput::Partial(partial.clone())),
            StageResponse::Fail(message) => Err(StageError::failed(message.clone())),
        }
    }
}

// ============================================================================
// Map Resolver
// ============================================================================

/// Host resolver backed by a fixed table
///
/// Identifiers missing from the table resolve to themselves unless
/// [`MapResolver::strict`] is used, in which case they are unresolved.
#[derive(Debug, Default)]
pub struct MapResolver {
    table: HashMap<String, Resolution>,
    strict: bool,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl MapResolver {
    /// Resolver mapping unknown identifiers to themselves
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver leaving unknown identifiers unresolved
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    /// Add an entry
    pub fn with(mut self, id: &str, resolution: Resolution) -> Self {
        self.table.insert(id.to_string(), resolution);
        self
    }

    /// `(id, importer)` pairs passed to `resolve`
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl HostResolver for MapResolver {
    async fn resolve(
        &self,
        id: &str,
        importer: Option<&str>,
        _options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        lock(&self.calls).push((id.to_string(), importer.map(str::to_string)));

        Ok(match self.table.get(id) {
            Some(resolution) => resolution.clone(),
            None if self.strict => Resolution::Unresolved,
            None => Resolution::Resolved(id.to_string()),
        })
    }
}

// ============================================================================
// Memory Storage
// ============================================================================

/// In-memory files implementing both storage seams
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<Option<String>>,
    write_count: Mutex<usize>,
}

impl MemoryStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with one file
    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.insert(path, contents);
        self
    }

    /// Add or replace a file
    pub fn insert(&self, path: &str, contents: &str) {
        lock(&self.files).insert(path.to_string(), contents.to_string());
    }

    /// Contents of a file
    pub fn get(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }

    /// Make every write fail with `message`
    pub fn fail_writes(&self, message: &str) {
        *lock(&self.fail_writes) = Some(message.to_string());
    }

    /// Number of write attempts
    pub fn write_count(&self) -> usize {
        *lock(&self.write_count)
    }
}

#[async_trait]
impl SourceReader for MemoryStorage {
    async fn read_source(&self, path: &str) -> StorageResult<String> {
        self.get(path).ok_or_else(|| {
            StorageError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            )
        })
    }
}

#[async_trait]
impl ArtifactStore for MemoryStorage {
    async fn write_artifact(&self, path: &str, contents: &str) -> StorageResult<()> {
        *lock(&self.write_count) += 1;
        if let Some(message) = lock(&self.fail_writes).clone() {
            return Err(StorageError::Backend(message));
        }
        self.insert(path, contents);
        Ok(())
    }
}

// ============================================================================
// Mock Declaration Generator
// ============================================================================

/// Derives `export declare const` lines from `const` declarations
///
/// The returned map names the compiled module (`<source><compiled extension>`)
/// as its file, and the text ends with a `sourceMappingURL` comment, the way a
/// real single-file transpile does.
#[derive(Debug)]
pub struct MockDeclarationGenerator {
    compiled_extension: String,
    failure: Mutex<Option<String>>,
    requests: Mutex<Vec<DeclarationRequest>>,
}

impl Default for MockDeclarationGenerator {
    fn default() -> Self {
        Self {
            compiled_extension: ".js".to_string(),
            failure: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockDeclarationGenerator {
    /// Generator assuming `.js` compiled modules
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different compiled-module extension in the map
    pub fn with_compiled_extension(mut self, ext: &str) -> Self {
        self.compiled_extension = ext.to_string();
        self
    }

    /// Fail every request with `message`
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<DeclarationRequest> {
        lock(&self.requests).clone()
    }

    fn infer_type(value: &str) -> &'static str {
        let value = value.trim();
        if value.parse::<f64>().is_ok() {
            "number"
        } else if value.starts_with('"') || value.starts_with('\'') {
            "string"
        } else if value == "true" || value == "false" {
            "boolean"
        } else {
            "unknown"
        }
    }
}

#[async_trait]
impl DeclarationGenerator for MockDeclarationGenerator {
    async fn generate(
        &self,
        request: DeclarationRequest,
    ) -> Result<DeclarationOutput, GeneratorError> {
        lock(&self.requests).push(request.clone());

        if let Some(message) = lock(&self.failure).clone() {
            return Err(GeneratorError::Failed {
                file: request.file_name,
                message,
            });
        }

        let mut declarations = Vec::new();
        for line in request.code.lines() {
            let Some(rest) = line.trim().strip_prefix("const ") else {
                continue;
            };
            let Some((lhs, value)) = rest.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_end_matches(';');
            let declaration = match lhs.split_once(':') {
                Some((name, ty)) => format!("export declare const {}: {};", name.trim(), ty.trim()),
                None => format!(
                    "export declare const {}: {};",
                    lhs.trim(),
                    Self::infer_type(value)
                ),
            };
            declarations.push(declaration);
        }

        let source = basename(&request.file_name).to_string();
        let compiled = format!("{}{}", source, self.compiled_extension);
        let map = SourceMap::new(compiled.clone(), vec![source], "AAAA");
        let map = map.to_json().map_err(|e| GeneratorError::Failed {
            file: request.file_name.clone(),
            message: e.to_string(),
        })?;

        let text = format!(
            "{}\n{}{}.d.ts.map",
            declarations.join("\n"),
            MAPPING_URL_COMMENT,
            compiled
        );

        Ok(DeclarationOutput {
            text,
            map: Some(map),
        })
    }
}
