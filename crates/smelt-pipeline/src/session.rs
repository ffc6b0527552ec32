//! Pipeline lifecycle
//!
//! ```text
//! PipelineBuilder ──build()──▶ Pipeline ──start_session(mode, plugins)──▶ Session
//!                                 │                                        │
//!                           config_hook(mode)              resolve_id / load / transform
//!                                                          transform_index_html
//! ```
//!
//! A [`Pipeline`] holds configuration and collaborators but cannot process
//! files. Starting a session resolves the mode's stage chain against the
//! host's finalized plugin list; only the resulting [`Session`] exposes the
//! per-file hooks, so no file is ever transformed with an unresolved chain.

use crate::chain::TransformChain;
use crate::declarations::{DeclarationEmitter, DiagnosticsSink, EMITTER_STAGE_NAME};
use crate::error::{FileResult, SessionError, SessionResult};
use crate::filter::PathFilter;
use crate::registry::{StageHandle, StageOrigin, StageSpec, StageTable};
use crate::rewriter::ReferenceRewriter;
use crate::router::ModuleRouter;
use async_trait::async_trait;
use smelt_config::{ConfigError, Mode, PipelineConfig};
use smelt_core::{
    ArtifactStore, Compiler, DeclarationGenerator, FsStorage, HostConfigPatch, HostPlugin,
    HostResolver, ResolveError, ResolveOptions, Resolution, SourceLoader, SourceReader, Stage,
    TransformContext, TransformResult,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Settings fixed for the lifetime of one session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Build or serve
    pub mode: Mode,
    /// Extension appended to stage identifiers, with leading dot
    pub output_extension: String,
    /// Query-like marker closing routed identifiers
    pub marker_suffix: String,
    /// Whether the compiler drops type annotations
    pub strip_types: bool,
    /// Resolved chain for `mode`
    pub stages: Vec<StageHandle>,
}

impl SessionContext {
    /// Names of the resolved stages, in order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|h| h.name.as_str()).collect()
    }
}

/// Resolver used when the host supplies none: every identifier is its own resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

#[async_trait]
impl HostResolver for IdentityResolver {
    async fn resolve(
        &self,
        id: &str,
        _importer: Option<&str>,
        _options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        Ok(Resolution::Resolved(id.to_string()))
    }
}

#[derive(Clone)]
struct DeclarationBackend {
    generator: Arc<dyn DeclarationGenerator>,
    store: Arc<dyn ArtifactStore>,
}

/// Builder for [`Pipeline`]
///
/// Everything that cannot live in a config file (the compiler, stage callables,
/// the post-compile hook, I/O backends) is supplied here.
pub struct PipelineBuilder {
    config: PipelineConfig,
    compiler: Arc<dyn Compiler>,
    resolver: Arc<dyn HostResolver>,
    reader: Arc<dyn SourceReader>,
    post_compile: Option<Arc<dyn Stage>>,
    stage_overrides: HashMap<Mode, Vec<StageSpec>>,
    declarations: Option<DeclarationBackend>,
    diagnostics: DiagnosticsSink,
}

impl PipelineBuilder {
    /// Start from `config` and `compiler`
    pub fn new(config: PipelineConfig, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            config,
            compiler,
            resolver: Arc::new(IdentityResolver),
            reader: Arc::new(FsStorage::new()),
            post_compile: None,
            stage_overrides: HashMap::new(),
            declarations: None,
            diagnostics: DiagnosticsSink::log_only(),
        }
    }

    /// Host module resolution
    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Where routed loads read raw source from
    pub fn source_reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Hook run on compiled code before the configured stages
    pub fn post_compile(mut self, hook: Arc<dyn Stage>) -> Self {
        self.post_compile = Some(hook);
        self
    }

    /// Replace the configured chain for `mode`
    ///
    /// Unlike config-file entries these may include stages supplied directly.
    pub fn stages(mut self, mode: Mode, specs: Vec<StageSpec>) -> Self {
        self.stage_overrides.insert(mode, specs);
        self
    }

    /// Declaration generator and the store artifacts are written to
    pub fn declarations(
        mut self,
        generator: Arc<dyn DeclarationGenerator>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        self.declarations = Some(DeclarationBackend { generator, store });
        self
    }

    /// Where background outcomes are reported
    pub fn diagnostics(mut self, sink: DiagnosticsSink) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Validate configuration and freeze the pipeline
    pub fn build(self) -> SessionResult<Pipeline> {
        let mut config = self.config;
        config.validate()?;

        if config.strip_types.is_none() && self.stage_overrides.values().any(|s| !s.is_empty()) {
            config.strip_types = Some(false);
        }

        if config.declarations.enabled && self.declarations.is_none() {
            return Err(SessionError::Config(ConfigError::invalid_value(
                "pipeline.declarations.enabled",
                "declarations are enabled but no declaration generator was supplied",
            )));
        }

        let filter = PathFilter::from_config(&config)?;

        Ok(Pipeline {
            config,
            filter,
            compiler: self.compiler,
            resolver: self.resolver,
            reader: self.reader,
            post_compile: self.post_compile,
            stage_overrides: self.stage_overrides,
            declarations: self.declarations,
            diagnostics: self.diagnostics,
        })
    }
}

/// A configured pipeline, ready to start sessions
pub struct Pipeline {
    config: PipelineConfig,
    filter: PathFilter,
    compiler: Arc<dyn Compiler>,
    resolver: Arc<dyn HostResolver>,
    reader: Arc<dyn SourceReader>,
    post_compile: Option<Arc<dyn Stage>>,
    stage_overrides: HashMap<Mode, Vec<StageSpec>>,
    declarations: Option<DeclarationBackend>,
    diagnostics: DiagnosticsSink,
}

impl Pipeline {
    /// Builder around `config` and `compiler`
    pub fn builder(config: PipelineConfig, compiler: Arc<dyn Compiler>) -> PipelineBuilder {
        PipelineBuilder::new(config, compiler)
    }

    /// The effective configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Configuration the host should merge before its own is finalized
    ///
    /// Production builds run the host's single-file type stripper over
    /// compiled output, which still carries the source extension; the patch
    /// tells it to parse those files as typed markup-capable source.
    pub fn config_hook(&self, mode: Mode) -> Option<HostConfigPatch> {
        match mode {
            Mode::Build => Some(HostConfigPatch {
                typed_source_pattern: format!(
                    "{}$",
                    regex::escape(&self.config.input_extension())
                ),
                loader: SourceLoader::Tsx,
            }),
            Mode::Serve => None,
        }
    }

    /// Chain entries for `mode`, before resolution
    pub fn stage_specs(&self, mode: Mode) -> Vec<StageSpec> {
        match self.stage_overrides.get(&mode) {
            Some(specs) => specs.clone(),
            None => self
                .config
                .stages
                .for_mode(mode)
                .iter()
                .map(|name| StageSpec::named(name.as_str()))
                .collect(),
        }
    }

    /// Resolve the chain for `mode` and open a session
    ///
    /// `plugins` is the host's finalized plugin list. Any entry that cannot be
    /// resolved fails the whole session.
    pub fn start_session(
        &self,
        mode: Mode,
        plugins: &[Arc<dyn HostPlugin>],
    ) -> SessionResult<Session> {
        let table = StageTable::from_plugins(plugins);
        let mut stages = table.resolve_chain(&self.stage_specs(mode), mode)?;

        let output_extension = self.config.output_extension();
        if let Some(backend) = &self.declarations {
            if self.config.declarations.active_for(mode) {
                let emitter = DeclarationEmitter::new(
                    self.filter.clone(),
                    output_extension.clone(),
                    self.config.declarations.suffix.clone(),
                    Arc::clone(&backend.generator),
                    Arc::clone(&backend.store),
                )
                .with_transformers(self.config.declarations.transformers.for_mode(mode).cloned())
                .with_diagnostics(self.diagnostics.clone());

                stages.push(StageHandle {
                    name: EMITTER_STAGE_NAME.to_string(),
                    stage: Arc::new(emitter),
                    origin: StageOrigin::Direct,
                });
            }
        }

        let context = Arc::new(SessionContext {
            mode,
            output_extension,
            marker_suffix: self.config.marker_suffix.clone(),
            strip_types: self.config.strip_types(),
            stages,
        });

        let router = ModuleRouter::new(
            self.filter.clone(),
            &context.output_extension,
            &context.marker_suffix,
            Arc::clone(&self.resolver),
            Arc::clone(&self.reader),
        );
        let rewriter = ReferenceRewriter::new(self.config.input_extension(), router.suffix());

        let mut chain = TransformChain::new(Arc::clone(&self.compiler));
        if let Some(hook) = &self.post_compile {
            chain = chain.with_post_compile(Arc::clone(hook));
        }

        info!(
            mode = %mode,
            stages = ?context.stage_names(),
            strip_types = context.strip_types,
            output_extension = %context.output_extension,
            "session started"
        );

        Ok(Session {
            context,
            filter: self.filter.clone(),
            router,
            rewriter,
            chain,
        })
    }
}

/// A running session: per-file hooks over a resolved chain
#[derive(Clone)]
pub struct Session {
    context: Arc<SessionContext>,
    filter: PathFilter,
    router: ModuleRouter,
    rewriter: ReferenceRewriter,
    chain: TransformChain,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("suffix", &self.router.suffix())
            .finish()
    }
}

impl Session {
    /// Settings fixed at session start
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The session's mode
    pub fn mode(&self) -> Mode {
        self.context.mode
    }

    /// Identifier router
    pub fn router(&self) -> &ModuleRouter {
        &self.router
    }

    /// Whether the pipeline owns `id`
    pub fn owns(&self, id: &str) -> bool {
        self.router.owns(id)
    }

    /// Resolution hook: decorate owned imports
    pub async fn resolve_id(
        &self,
        id: &str,
        importer: Option<&str>,
        options: &ResolveOptions,
    ) -> FileResult<Option<String>> {
        self.router.resolve_id(id, importer, options).await
    }

    /// Load hook: raw source for routed identifiers
    pub async fn load(&self, id: &str) -> FileResult<Option<String>> {
        self.router.load(id).await
    }

    /// Transform hook
    ///
    /// Returns `None` for identifiers the pipeline does not own; the compiler
    /// is not called for them. `id` may be routed or plain.
    pub async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> FileResult<Option<TransformResult>> {
        let source_id = self.router.source_path(id);
        if !self.filter.matches(source_id) {
            debug!(id = %id, "not owned; skipping");
            return Ok(None);
        }

        let start = Instant::now();
        let result = self.chain.run(&self.context, code, source_id, ctx).await?;
        info!(
            id = %source_id,
            mode = %self.context.mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "transformed"
        );
        Ok(Some(result))
    }

    /// Markup hook: route direct script references through the pipeline
    pub fn transform_index_html(&self, html: &str) -> String {
        self.rewriter.rewrite(html).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smelt_config::ModeStages;
    use smelt_core::test_support::mocks::{MockCompiler, RecordingStage};
    use smelt_core::StagePlugin;

    fn config_with_stages(stages: ModeStages) -> PipelineConfig {
        PipelineConfig {
            stages,
            ..Default::default()
        }
    }

    fn pipeline(config: PipelineConfig) -> Pipeline {
        Pipeline::builder(config, Arc::new(MockCompiler::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_config_hook_only_in_build() {
        let pipeline = pipeline(PipelineConfig::default());

        let patch = pipeline.config_hook(Mode::Build).unwrap();
        assert_eq!(patch.typed_source_pattern, r"\.civet$");
        assert_eq!(patch.loader, SourceLoader::Tsx);
        assert!(pipeline.config_hook(Mode::Serve).is_none());
    }

    #[test]
    fn test_chains_are_mode_partitioned() {
        let pipeline = pipeline(config_with_stages(ModeStages {
            build: vec!["babel".to_string()],
            serve: vec!["solid".to_string()],
        }));
        let plugins: Vec<Arc<dyn HostPlugin>> = vec![
            Arc::new(StagePlugin::new("babel", RecordingStage::declining("babel"))),
            Arc::new(StagePlugin::new("solid", RecordingStage::declining("solid"))),
        ];

        let build = pipeline.start_session(Mode::Build, &plugins).unwrap();
        let serve = pipeline.start_session(Mode::Serve, &plugins).unwrap();

        assert_eq!(build.context().stage_names(), vec!["babel"]);
        assert_eq!(serve.context().stage_names(), vec!["solid"]);
    }

    #[test]
    fn test_defaults_follow_stage_configuration() {
        let bare = pipeline(PipelineConfig::default());
        let session = bare.start_session(Mode::Serve, &[]).unwrap();
        assert!(session.context().strip_types);
        assert_eq!(session.context().output_extension, ".js");

        let staged = pipeline(config_with_stages(ModeStages::shared(vec!["solid".into()])));
        let plugins: Vec<Arc<dyn HostPlugin>> = vec![Arc::new(StagePlugin::new(
            "solid",
            RecordingStage::declining("solid"),
        ))];
        let session = staged.start_session(Mode::Serve, &plugins).unwrap();
        assert!(!session.context().strip_types);
        assert_eq!(session.context().output_extension, ".ts");
    }

    #[test]
    fn test_programmatic_stages_keep_types() {
        let pipeline = Pipeline::builder(PipelineConfig::default(), Arc::new(MockCompiler::new()))
            .stages(
                Mode::Build,
                vec![StageSpec::direct(RecordingStage::declining("inline"))],
            )
            .build()
            .unwrap();

        let session = pipeline.start_session(Mode::Build, &[]).unwrap();
        assert!(!session.context().strip_types);
        assert_eq!(session.context().stage_names(), vec!["inline"]);
    }

    #[test]
    fn test_enabled_declarations_need_generator() {
        let mut config = PipelineConfig::default();
        config.declarations.enabled = true;

        let result = Pipeline::builder(config, Arc::new(MockCompiler::new())).build();
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_invalid_config_rejected_at_build() {
        let config = PipelineConfig {
            include: Some(vec!["src/[".to_string()]),
            ..Default::default()
        };

        let result = Pipeline::builder(config, Arc::new(MockCompiler::new())).build();
        assert!(matches!(
            result,
            Err(SessionError::Config(ConfigError::InvalidPattern { .. }))
        ));
    }

    #[tokio::test]
    async fn test_transform_skips_unowned_without_compiling() {
        let compiler = Arc::new(MockCompiler::new());
        let pipeline = Pipeline::builder(PipelineConfig::default(), compiler.clone())
            .build()
            .unwrap();
        let session = pipeline.start_session(Mode::Serve, &[]).unwrap();

        let result = session
            .transform("export {}", "/src/a.ts", &TransformContext::default())
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(compiler.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transform_accepts_routed_id() {
        let compiler = Arc::new(MockCompiler::new().without_inline_map());
        let pipeline = Pipeline::builder(PipelineConfig::default(), compiler.clone())
            .build()
            .unwrap();
        let session = pipeline.start_session(Mode::Serve, &[]).unwrap();

        let result = session
            .transform("a := 1", "/src/a.civet.js?transform", &TransformContext::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.code, "const a = 1;");
        assert_eq!(compiler.compiled_files(), vec!["/src/a.civet"]);
    }

    #[test]
    fn test_index_html_uses_router_suffix() {
        let session = pipeline(PipelineConfig::default())
            .start_session(Mode::Serve, &[])
            .unwrap();

        assert_eq!(
            session.transform_index_html("<script src=\"/main.civet\"></script>"),
            "<script src=\"/main.civet.js?transform\"></script>"
        );
    }

    #[tokio::test]
    async fn test_custom_input_extension_owns_rewritten_references() {
        let compiler = Arc::new(MockCompiler::new().without_inline_map());
        let config = PipelineConfig {
            input_extension: ".cvt".to_string(),
            ..Default::default()
        };
        let session = Pipeline::builder(config, compiler.clone())
            .build()
            .unwrap()
            .start_session(Mode::Serve, &[])
            .unwrap();

        let html = session.transform_index_html("<script src=\"/src/m.cvt\"></script>");
        assert_eq!(html, "<script src=\"/src/m.cvt.js?transform\"></script>");

        let result = session
            .transform("m := 1", "/src/m.cvt.js?transform", &TransformContext::default())
            .await
            .unwrap();
        assert!(result.is_some());
        assert_eq!(compiler.compiled_files(), vec!["/src/m.cvt"]);
    }
}
