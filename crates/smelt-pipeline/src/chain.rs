//! Compile-then-chain execution for one file
//!
//! The order is fixed: compile once, run the optional post-compile hook, then
//! every resolved stage of the session's mode, one after another. A single
//! [`TransformResult`] is threaded through all of them and each
//! [`StageOutput`](smelt_core::StageOutput) is merged with
//! [`TransformResult::apply`].

use crate::error::{FileResult, TransformError};
use crate::session::SessionContext;
use smelt_core::{CompileOptions, Compiler, Stage, TransformContext, TransformResult};
use std::sync::Arc;
use tracing::debug;

/// Runs the compiler and the session's stages over one file
#[derive(Clone)]
pub struct TransformChain {
    compiler: Arc<dyn Compiler>,
    post_compile: Option<Arc<dyn Stage>>,
}

impl TransformChain {
    /// Chain around `compiler`
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self {
            compiler,
            post_compile: None,
        }
    }

    /// Run `hook` right after compilation, before any configured stage
    ///
    /// The hook sees the source identifier, not the synthesized one.
    pub fn with_post_compile(mut self, hook: Arc<dyn Stage>) -> Self {
        self.post_compile = Some(hook);
        self
    }

    /// Identifier handed to downstream stages for `source_id`
    pub fn stage_id(session: &SessionContext, source_id: &str) -> String {
        format!("{}{}", source_id, session.output_extension)
    }

    /// Transform `source` (the raw text of `source_id`)
    ///
    /// `source_id` must be the plain source path; the router strips any
    /// decoration before calling this.
    pub async fn run(
        &self,
        session: &SessionContext,
        source: &str,
        source_id: &str,
        ctx: &TransformContext,
    ) -> FileResult<TransformResult> {
        let options = CompileOptions::new(source_id, session.strip_types);
        let compiled = self.compiler.compile(source, &options).await?;
        debug!(id = %source_id, bytes = compiled.code.len(), "compiled");

        let mut result = TransformResult {
            code: compiled.code,
            map: compiled.map,
            meta: None,
        };

        if let Some(hook) = &self.post_compile {
            let output = hook
                .transform(&result.code, source_id, ctx)
                .await
                .map_err(|e| TransformError::Stage {
                    stage: hook.name().to_string(),
                    id: source_id.to_string(),
                    message: e.to_string(),
                })?;
            result.apply(output);
        }

        let stage_id = Self::stage_id(session, source_id);
        for handle in &session.stages {
            let output = handle
                .stage
                .transform(&result.code, &stage_id, ctx)
                .await
                .map_err(|e| TransformError::Stage {
                    stage: handle.name.clone(),
                    id: stage_id.clone(),
                    message: e.to_string(),
                })?;

            if output.is_declined() {
                debug!(stage = %handle.name, id = %stage_id, "stage declined; skipping");
            }
            result.apply(output);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{StageHandle, StageOrigin};
    use smelt_config::Mode;
    use smelt_core::test_support::mocks::{MockCompiler, RecordingStage, StageResponse};
    use smelt_core::{PartialResult, SourceMap, StageOutput};
    use tracing_test::traced_test;

    fn handle(stage: Arc<RecordingStage>) -> StageHandle {
        StageHandle {
            name: stage.name().to_string(),
            stage,
            origin: StageOrigin::Direct,
        }
    }

    fn session(stages: Vec<StageHandle>) -> SessionContext {
        SessionContext {
            mode: Mode::Build,
            output_extension: ".jsx".to_string(),
            marker_suffix: "?transform".to_string(),
            strip_types: true,
            stages,
        }
    }

    fn chain() -> TransformChain {
        TransformChain::new(Arc::new(MockCompiler::new().without_inline_map()))
    }

    #[tokio::test]
    async fn test_stages_run_in_order_with_synthesized_id() {
        let first = RecordingStage::appending("first", "\n// first");
        let second = RecordingStage::appending("second", "\n// second");
        let session = session(vec![handle(first.clone()), handle(second.clone())]);

        let result = chain()
            .run(&session, "a := 1", "/src/a.civet", &TransformContext::ssr())
            .await
            .unwrap();

        assert_eq!(result.code, "const a = 1;\n// first\n// second");
        assert_eq!(second.calls()[0].code, "const a = 1;\n// first");
        for stage in [&first, &second] {
            let call = &stage.calls()[0];
            assert_eq!(call.id, "/src/a.civet.jsx");
            assert!(call.ssr);
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_declining_stage_is_noop() {
        let declining = RecordingStage::declining("noop");
        let session = session(vec![handle(declining.clone())]);

        let result = chain()
            .run(&session, "a := 1", "/src/a.civet", &TransformContext::default())
            .await
            .unwrap();

        assert_eq!(result, TransformResult::from_code("const a = 1;"));
        assert_eq!(declining.call_count(), 1);
        assert!(logs_contain("stage declined; skipping"));
    }

    #[tokio::test]
    async fn test_partial_output_keeps_earlier_map() {
        let map = SourceMap::new("a.civet.jsx", vec!["a.civet".to_string()], "AAAA");
        let mapper = RecordingStage::new(
            "mapper",
            StageResponse::Partial(PartialResult::default().with_map(map.clone())),
        );
        let rewriter = RecordingStage::new("rewriter", StageResponse::Replace("x".to_string()));
        let session = session(vec![handle(mapper), handle(rewriter)]);

        let result = chain()
            .run(&session, "a := 1", "/src/a.civet", &TransformContext::default())
            .await
            .unwrap();

        assert_eq!(result.code, "x");
        assert_eq!(result.map, Some(map));
    }

    #[tokio::test]
    async fn test_post_compile_sees_source_id() {
        let hook = RecordingStage::appending("post", ";");
        let later = RecordingStage::declining("later");
        let session = session(vec![handle(later.clone())]);

        chain()
            .with_post_compile(hook.clone())
            .run(&session, "a := 1", "/src/a.civet", &TransformContext::default())
            .await
            .unwrap();

        assert_eq!(hook.calls()[0].id, "/src/a.civet");
        assert_eq!(later.calls()[0].code, "const a = 1;;");
    }

    #[tokio::test]
    async fn test_stage_failure_names_stage_and_id() {
        let failing = RecordingStage::new("broken", StageResponse::Fail("boom".to_string()));
        let after = RecordingStage::declining("after");
        let session = session(vec![handle(failing), handle(after.clone())]);

        let err = chain()
            .run(&session, "a := 1", "/src/a.civet", &TransformContext::default())
            .await
            .unwrap_err();

        match err {
            TransformError::Stage { stage, id, message } => {
                assert_eq!(stage, "broken");
                assert_eq!(id, "/src/a.civet.jsx");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(after.call_count(), 0);
    }

    #[tokio::test]
    async fn test_compile_failure_skips_stages() {
        let stage = RecordingStage::declining("never");
        let session = session(vec![handle(stage.clone())]);

        let err = chain()
            .run(&session, " := 1", "/src/bad.civet", &TransformContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TransformError::Compile(ref e) if e.id == "/src/bad.civet"));
        assert_eq!(stage.call_count(), 0);
    }

    #[tokio::test]
    async fn test_text_output_overwrites_code_only() {
        let stage = RecordingStage::new("text", StageResponse::Replace("y".to_string()));
        let session = session(vec![handle(stage)]);

        let result = chain()
            .with_post_compile(Arc::new(smelt_core::FnStage::new("meta", |_, _, _| {
                let mut meta = serde_json::Map::new();
                meta.insert("hmr".to_string(), serde_json::json!(true));
                Ok(StageOutput::Partial(PartialResult::default().with_meta(meta)))
            })))
            .run(&session, "a := 1", "/src/a.civet", &TransformContext::default())
            .await
            .unwrap();

        assert_eq!(result.code, "y");
        assert_eq!(
            result.meta.and_then(|m| m.get("hmr").cloned()),
            Some(serde_json::json!(true))
        );
    }
}
