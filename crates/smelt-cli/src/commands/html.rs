use crate::builtins::builtin_plugins;
use crate::commands::build_pipeline;
use anyhow::{Context, Result};
use smelt_config::{Mode, SmeltConfig};
use std::path::Path;

/// Print `file` with its script references routed through the pipeline
pub async fn execute(config: &SmeltConfig, file: &Path, mode: Mode) -> Result<()> {
    let wired = build_pipeline(config)?;
    let session = wired.pipeline.start_session(mode, &builtin_plugins())?;

    let html = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    print!("{}", session.transform_index_html(&html));
    Ok(())
}
