//! Pipeline Orchestration Layer
//!
//! This crate turns alternate-syntax source files into target-syntax modules
//! inside a host build system, and hands the result to whatever downstream
//! stages the host already runs.
//!
//! ## Architecture
//!
//! Per owned file, in order:
//! 1. **Filter**: [`PathFilter`] decides ownership; nothing else runs for other files
//! 2. **Route**: [`ModuleRouter`] decorates resolved identifiers and loads raw source
//! 3. **Compile**: the injected [`Compiler`](smelt_core::Compiler) runs once
//! 4. **Chain**: [`TransformChain`] runs the post-compile hook and the session's stages
//! 5. **Declarations** (optional): [`DeclarationEmitter`] writes a sibling `.d.ts` in the background
//!
//! Around these, [`ReferenceRewriter`] rewrites markup script references, and
//! [`StageTable`] resolves configured stage names once per session.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smelt_pipeline::{Pipeline, StageSpec};
//!
//! let pipeline = Pipeline::builder(config, compiler)
//!     .resolver(host_resolver)
//!     .build()?;
//!
//! // Once the host's plugin list is final
//! let session = pipeline.start_session(Mode::Build, &host_plugins)?;
//!
//! let routed = session.resolve_id("./app.civet", Some("/src/main.ts"), &options).await?;
//! ```

pub mod chain;
pub mod declarations;
pub mod error;
pub mod filter;
pub mod registry;
pub mod rewriter;
pub mod router;
pub mod session;

pub use chain::TransformChain;
pub use declarations::{
    inline_declaration_map, DeclarationEmitter, Diagnostic, DiagnosticsReceiver, DiagnosticsSink,
    EmitError, EMITTER_STAGE_NAME,
};
pub use error::{FileResult, SessionError, SessionResult, TransformError};
pub use filter::PathFilter;
pub use registry::{StageHandle, StageOrigin, StageSpec, StageTable, StageTableBuilder, PLUGIN_NAME};
pub use rewriter::ReferenceRewriter;
pub use router::ModuleRouter;
pub use session::{IdentityResolver, Pipeline, PipelineBuilder, Session, SessionContext};
