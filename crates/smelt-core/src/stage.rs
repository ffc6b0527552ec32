//! Downstream transform stages

use crate::StageOutput;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Per-call context the host passes to transform hooks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformContext {
    /// The module is being transformed for server-side rendering
    pub ssr: bool,
}

impl TransformContext {
    /// Context for a server-rendering transform
    pub fn ssr() -> Self {
        Self { ssr: true }
    }
}

/// A stage failed while transforming a file
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage reported a failure
    #[error("{0}")]
    Failed(String),

    /// I/O failure inside the stage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Create a failure with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Result type for stage operations
pub type StageResult<T> = Result<T, StageError>;

/// One transformation in the chain
///
/// Stages typically dispatch by file extension, which is why the pipeline hands
/// them an identifier carrying the output extension rather than the source's.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Transform `code` for the module `id`
    async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> StageResult<StageOutput>;
}

type StageFn = dyn Fn(&str, &str, &TransformContext) -> StageResult<StageOutput> + Send + Sync;

/// A stage backed by a plain function
///
/// This is how a callable supplied directly in configuration enters the chain.
pub struct FnStage {
    name: String,
    func: Box<StageFn>,
}

impl FnStage {
    /// Wrap `func` as a stage called `name`
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &str, &TransformContext) -> StageResult<StageOutput> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Stage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> StageResult<StageOutput> {
        (self.func)(code, id, ctx)
    }
}
