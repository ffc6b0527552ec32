//! Best-effort declaration artifacts
//!
//! [`DeclarationEmitter`] sits in a chain slot like any other stage. For each
//! owned file it spawns a detached task that asks the [`DeclarationGenerator`]
//! for declarations, points the returned map at the declaration file, inlines
//! it, and writes `<source><suffix>` through the [`ArtifactStore`]. The code
//! flowing through the chain is returned untouched and never waits for that
//! task. Outcomes go to a [`DiagnosticsSink`] and the log, nowhere else.

use crate::filter::PathFilter;
use async_trait::async_trait;
use smelt_core::source_map::{split_mapping_comment, MAPPING_URL_COMMENT};
use smelt_core::{
    ArtifactStore, DeclarationGenerator, DeclarationOptions, DeclarationOutput,
    DeclarationRequest, GeneratorError, SourceMap, Stage, StageOutput, StageResult,
    StorageError, TransformContext, TransformerSet,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Name the emitter reports as a stage
pub const EMITTER_STAGE_NAME: &str = "smelt:declarations";

/// Why a declaration artifact was not written
#[derive(Debug, Error)]
pub enum EmitError {
    /// The generator failed
    #[error(transparent)]
    Generate(#[from] GeneratorError),

    /// The generator returned a map that is not valid JSON
    #[error("invalid declaration map: {0}")]
    Map(#[from] serde_json::Error),

    /// Writing the artifact failed
    #[error(transparent)]
    Store(#[from] StorageError),
}

/// Outcome of one background emission
#[derive(Debug)]
pub enum Diagnostic {
    /// The artifact was written
    DeclarationWritten {
        /// Source file
        source: String,
        /// Artifact path
        path: String,
    },
    /// The artifact was not written
    DeclarationFailed {
        /// Source file
        source: String,
        /// What went wrong
        error: EmitError,
    },
}

/// Receiving end of a [`DiagnosticsSink`]
pub type DiagnosticsReceiver = mpsc::UnboundedReceiver<Diagnostic>;

/// Where background outcomes are reported
///
/// Every outcome is logged; when the sink was created with
/// [`DiagnosticsSink::channel`] it is also forwarded to the receiver.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSink {
    tx: Option<mpsc::UnboundedSender<Diagnostic>>,
}

impl DiagnosticsSink {
    /// Sink that only logs
    pub fn log_only() -> Self {
        Self { tx: None }
    }

    /// Sink forwarding to a fresh channel
    pub fn channel() -> (Self, DiagnosticsReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Log `diagnostic` and forward it if a receiver is attached
    pub fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::DeclarationWritten { source, path } => {
                info!(source = %source, path = %path, "wrote declaration file");
            }
            Diagnostic::DeclarationFailed { source, error } => {
                warn!(source = %source, error = %error, "declaration emission failed");
            }
        }

        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is listening anymore
            let _ = tx.send(diagnostic);
        }
    }
}

/// Chain stage that writes declaration files in the background
#[derive(Clone)]
pub struct DeclarationEmitter {
    filter: PathFilter,
    output_extension: String,
    suffix: String,
    transformers: Option<TransformerSet>,
    generator: Arc<dyn DeclarationGenerator>,
    store: Arc<dyn ArtifactStore>,
    diagnostics: DiagnosticsSink,
}

impl DeclarationEmitter {
    /// Emitter for stage identifiers ending in `output_extension`
    pub fn new(
        filter: PathFilter,
        output_extension: impl Into<String>,
        suffix: impl Into<String>,
        generator: Arc<dyn DeclarationGenerator>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            filter,
            output_extension: output_extension.into(),
            suffix: suffix.into(),
            transformers: None,
            generator,
            store,
            diagnostics: DiagnosticsSink::log_only(),
        }
    }

    /// Send transformer overrides with every request
    pub fn with_transformers(mut self, transformers: Option<TransformerSet>) -> Self {
        self.transformers = transformers;
        self
    }

    /// Report outcomes to `sink`
    pub fn with_diagnostics(mut self, sink: DiagnosticsSink) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Artifact path for a source file
    pub fn declaration_path(&self, source: &str) -> String {
        format!("{}{}", source, self.suffix)
    }

    /// Generate and write the artifact for `source`, waiting for completion
    ///
    /// Returns the path written.
    pub async fn emit(&self, code: &str, source: &str) -> Result<String, EmitError> {
        let request = DeclarationRequest {
            code: code.to_string(),
            file_name: source.to_string(),
            options: DeclarationOptions::default(),
            transformers: self.transformers.clone(),
        };
        let output = self.generator.generate(request).await?;

        let name = file_name(source);
        let compiled = format!("{}{}", name, self.output_extension);
        let declaration = format!("{}{}", name, self.suffix);
        let text = inline_declaration_map(output, &compiled, &declaration)?;

        let path = self.declaration_path(source);
        self.store.write_artifact(&path, &text).await?;
        Ok(path)
    }

    fn spawn_emit(&self, code: &str, source: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(source = %source, "no async runtime; skipping declaration emission");
            return;
        };

        let emitter = self.clone();
        let code = code.to_string();
        let source = source.to_string();
        runtime.spawn(async move {
            let diagnostic = match emitter.emit(&code, &source).await {
                Ok(path) => Diagnostic::DeclarationWritten { source, path },
                Err(error) => Diagnostic::DeclarationFailed { source, error },
            };
            emitter.diagnostics.report(diagnostic);
        });
    }
}

#[async_trait]
impl Stage for DeclarationEmitter {
    fn name(&self) -> &str {
        EMITTER_STAGE_NAME
    }

    async fn transform(
        &self,
        code: &str,
        id: &str,
        _ctx: &TransformContext,
    ) -> StageResult<StageOutput> {
        let source = id.strip_suffix(self.output_extension.as_str()).unwrap_or(id);
        if !self.filter.matches(source) {
            return Ok(StageOutput::Declined);
        }

        debug!(source = %source, "queueing declaration emission");
        self.spawn_emit(code, source);
        Ok(StageOutput::code(code))
    }
}

/// Point the generator's map at the declaration file and inline it
///
/// Without a map the declaration text is returned unchanged.
pub fn inline_declaration_map(
    output: DeclarationOutput,
    compiled_name: &str,
    declaration_name: &str,
) -> Result<String, serde_json::Error> {
    let Some(json) = output.map else {
        return Ok(output.text);
    };

    let mut map = SourceMap::from_json(&json)?;
    map.rename_file(compiled_name, declaration_name);

    let (body, _) = split_mapping_comment(&output.text);
    Ok(format!(
        "{}\n\n{}{}",
        body,
        MAPPING_URL_COMMENT,
        map.to_data_url()?
    ))
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smelt_config::PipelineConfig;
    use smelt_core::test_support::mocks::{MemoryStorage, MockDeclarationGenerator};

    fn emitter(
        generator: Arc<MockDeclarationGenerator>,
        storage: Arc<MemoryStorage>,
    ) -> DeclarationEmitter {
        DeclarationEmitter::new(
            PathFilter::from_config(&PipelineConfig::default()).unwrap(),
            ".js",
            ".d.ts",
            generator,
            storage,
        )
    }

    #[test]
    fn test_inline_map_renames_and_replaces_comment() {
        let map = SourceMap::new("a.civet.js", vec!["a.civet".to_string()], "AAAA");
        let output = DeclarationOutput {
            text: "export declare const a: number;\n//# sourceMappingURL=a.civet.d.ts.map".to_string(),
            map: Some(map.to_json().unwrap()),
        };

        let text = inline_declaration_map(output, "a.civet.js", "a.civet.d.ts").unwrap();

        let (body, url) = split_mapping_comment(&text);
        assert_eq!(body, "export declare const a: number;\n");
        let inlined = SourceMap::from_data_url(url.unwrap()).unwrap();
        assert_eq!(inlined.file.as_deref(), Some("a.civet.d.ts"));
        assert_eq!(inlined.sources, vec!["a.civet"]);
        assert_eq!(text.matches(MAPPING_URL_COMMENT).count(), 1);
    }

    #[test]
    fn test_inline_map_without_map_is_verbatim() {
        let output = DeclarationOutput {
            text: "export {};".to_string(),
            map: None,
        };
        assert_eq!(
            inline_declaration_map(output, "a.civet.js", "a.civet.d.ts").unwrap(),
            "export {};"
        );
    }

    #[tokio::test]
    async fn test_emit_writes_sibling_file() {
        let generator = Arc::new(MockDeclarationGenerator::new());
        let storage = Arc::new(MemoryStorage::new());
        let emitter = emitter(generator.clone(), storage.clone());

        let path = emitter
            .emit("const a = 1;", "/src/a.civet")
            .await
            .unwrap();

        assert_eq!(path, "/src/a.civet.d.ts");
        let written = storage.get(&path).unwrap();
        assert!(written.starts_with("export declare const a: number;\n\n//# sourceMappingURL=data:"));
        assert_eq!(generator.requests()[0].file_name, "/src/a.civet");
    }

    #[tokio::test]
    async fn test_stage_returns_code_and_reports_in_background() {
        let generator = Arc::new(MockDeclarationGenerator::new());
        let storage = Arc::new(MemoryStorage::new());
        let (sink, mut rx) = DiagnosticsSink::channel();
        let emitter = emitter(generator, storage.clone()).with_diagnostics(sink);

        let output = emitter
            .transform("const a = 1;", "/src/a.civet.js", &TransformContext::default())
            .await
            .unwrap();
        assert_eq!(output, StageOutput::code("const a = 1;"));

        match rx.recv().await.unwrap() {
            Diagnostic::DeclarationWritten { source, path } => {
                assert_eq!(source, "/src/a.civet");
                assert_eq!(path, "/src/a.civet.d.ts");
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
        assert!(storage.get("/src/a.civet.d.ts").is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported_not_raised() {
        let generator = Arc::new(MockDeclarationGenerator::new());
        let storage = Arc::new(MemoryStorage::new());
        storage.fail_writes("disk full");
        let (sink, mut rx) = DiagnosticsSink::channel();
        let emitter = emitter(generator, storage.clone()).with_diagnostics(sink);

        let output = emitter
            .transform("const a = 1;", "/src/a.civet.js", &TransformContext::default())
            .await
            .unwrap();
        assert_eq!(output, StageOutput::code("const a = 1;"));

        assert!(matches!(
            rx.recv().await.unwrap(),
            Diagnostic::DeclarationFailed {
                error: EmitError::Store(_),
                ..
            }
        ));
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_unowned_ids_are_declined() {
        let generator = Arc::new(MockDeclarationGenerator::new());
        let emitter = emitter(generator.clone(), Arc::new(MemoryStorage::new()));

        let output = emitter
            .transform("export {}", "/src/a.ts.js", &TransformContext::default())
            .await
            .unwrap();

        assert!(output.is_declined());
        assert!(generator.requests().is_empty());
    }
}
