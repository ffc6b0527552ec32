pub mod check_config;
pub mod html;
pub mod transform;

use crate::compiler::CommandCompiler;
use crate::generator::CommandDeclarationGenerator;
use crate::resolver::FsResolver;
use anyhow::{Context, Result};
use smelt_config::{ConfigLoader, SmeltConfig};
use smelt_core::FsStorage;
use smelt_pipeline::{DiagnosticsReceiver, DiagnosticsSink, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "smelt.toml";

/// Load the explicit config, else `./smelt.toml`, else defaults
pub async fn load_config(path: Option<&Path>) -> Result<SmeltConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        }
    };

    match path {
        Some(path) => ConfigLoader::load_from_file(&path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            debug!("no config file found; using defaults");
            Ok(SmeltConfig::default())
        }
    }
}

/// A pipeline wired to the external tools
pub struct Wired {
    pub pipeline: Pipeline,
    /// Present when declaration output can be awaited
    pub diagnostics: Option<DiagnosticsReceiver>,
}

/// Wire the pipeline from config
///
/// The declaration generator is only attached when `tools.declaration_generator`
/// is set; enabling declarations without one is rejected by the builder.
pub fn build_pipeline(config: &SmeltConfig) -> Result<Wired> {
    let root = std::env::current_dir().context("failed to read the working directory")?;
    let storage = Arc::new(FsStorage::new());

    let mut builder = Pipeline::builder(
        config.pipeline.clone(),
        Arc::new(CommandCompiler::new(config.tools.compiler.clone())),
    )
    .resolver(Arc::new(FsResolver::new(root)))
    .source_reader(storage.clone());

    let mut diagnostics = None;
    if let Some(command) = &config.tools.declaration_generator {
        let (sink, rx) = DiagnosticsSink::channel();
        builder = builder
            .declarations(
                Arc::new(CommandDeclarationGenerator::new(command.clone())),
                storage,
            )
            .diagnostics(sink);
        diagnostics = Some(rx);
    }

    let pipeline = builder.build().context("invalid pipeline configuration")?;
    Ok(Wired {
        pipeline,
        diagnostics,
    })
}
