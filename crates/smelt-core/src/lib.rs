//! Core types and abstractions for smelt
//!
//! This crate defines the domain model shared by the pipeline and its frontends,
//! and the trait seams to everything the pipeline does not implement itself:
//!
//! - [`Compiler`]: the alternate-syntax compiler, an opaque text → text/map service
//! - [`Stage`] and [`HostPlugin`]: downstream transforms contributed by the host
//! - [`HostResolver`]: the host's module resolution service
//! - [`SourceReader`] / [`ArtifactStore`]: raw file I/O
//! - [`DeclarationGenerator`]: the independent declaration-generation step
//!
//! Concrete orchestration lives in `smelt-pipeline`; this crate only describes
//! contracts and the values that flow through them.

pub mod compiler;
pub mod declaration;
pub mod host;
pub mod registry;
pub mod result;
pub mod source_map;
pub mod stage;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use compiler::{CompileError, CompileOptions, CompileOutput, Compiler, SourcePosition};
pub use declaration::{
    DeclarationGenerator, DeclarationOptions, DeclarationOutput, DeclarationRequest,
    GeneratorError,
};
pub use host::{
    HostConfigPatch, HostPlugin, HostResolver, ResolveError, ResolveOptions, Resolution,
    SourceLoader, StagePlugin,
};
pub use registry::{Registry, RegistryBuilder};
pub use result::{MapUpdate, PartialResult, StageOutput, TransformResult};
pub use source_map::SourceMap;
pub use stage::{FnStage, Stage, StageError, StageResult, TransformContext};
pub use storage::{ArtifactStore, FsStorage, SourceReader, StorageError, StorageResult};

// Configuration types that appear in core signatures
pub use smelt_config::{Mode, TransformerSet};
