//! `smelt transform`: drive files through the session hooks like a host would

use crate::builtins::builtin_plugins;
use crate::commands::build_pipeline;
use anyhow::{anyhow, bail, Context, Result};
use smelt_config::{Mode, SmeltConfig};
use smelt_core::{ResolveOptions, TransformContext, TransformResult};
use smelt_pipeline::{Diagnostic, DiagnosticsReceiver, Session, EMITTER_STAGE_NAME};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Where transformed code goes
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Next to each source file
    Beside,
    /// Into a directory, keeping only file names
    Directory(PathBuf),
    /// Printed
    Stdout,
}

/// Execute the transform command
pub async fn execute(
    config: &SmeltConfig,
    files: Vec<PathBuf>,
    mode: Mode,
    ssr: bool,
    target: OutputTarget,
) -> Result<()> {
    let wired = build_pipeline(config)?;
    let session = wired.pipeline.start_session(mode, &builtin_plugins())?;

    if let OutputTarget::Directory(dir) = &target {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let emitting = session
        .context()
        .stage_names()
        .contains(&EMITTER_STAGE_NAME);
    let extension = session.context().output_extension.clone();

    let mut transformed = 0usize;
    let mut failed = 0usize;
    for file in &files {
        match transform_file(&session, file, ssr).await {
            Ok(Some((source, result))) => {
                transformed += 1;
                write_output(&target, &source, &extension, &result).await?;
            }
            Ok(None) => {
                warn!(file = %file.display(), "not handled by smelt; skipped");
            }
            Err(e) => {
                failed += 1;
                error!(file = %file.display(), "{:#}", e);
            }
        }
    }

    if emitting {
        if let Some(rx) = wired.diagnostics {
            failed += await_declarations(rx, transformed).await;
        }
    }

    info!(transformed, failed, "done");
    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, files.len());
    }
    Ok(())
}

/// Resolve, load and transform one file
///
/// Returns the source path alongside the result, or `None` when the file is
/// outside the include/exclude filter.
async fn transform_file(
    session: &Session,
    file: &Path,
    ssr: bool,
) -> Result<Option<(String, TransformResult)>> {
    let path = tokio::fs::canonicalize(file)
        .await
        .with_context(|| format!("cannot open {}", file.display()))?;
    let path = path.to_string_lossy().into_owned();

    let options = ResolveOptions { ssr, is_entry: true };
    let Some(id) = session.resolve_id(&path, None, &options).await? else {
        return Ok(None);
    };
    let code = session
        .load(&id)
        .await?
        .ok_or_else(|| anyhow!("'{}' was resolved but could not be loaded", id))?;

    let ctx = TransformContext { ssr };
    let result = session.transform(&code, &id, &ctx).await?;
    Ok(result.map(|result| (path, result)))
}

async fn write_output(
    target: &OutputTarget,
    source: &str,
    extension: &str,
    result: &TransformResult,
) -> Result<()> {
    let out = match target {
        OutputTarget::Stdout => {
            println!("{}", result.code);
            return Ok(());
        }
        OutputTarget::Beside => PathBuf::from(format!("{}{}", source, extension)),
        OutputTarget::Directory(dir) => {
            let name = Path::new(source)
                .file_name()
                .ok_or_else(|| anyhow!("'{}' has no file name", source))?;
            dir.join(format!("{}{}", name.to_string_lossy(), extension))
        }
    };

    tokio::fs::write(&out, &result.code)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;

    if let Some(map) = &result.map {
        let map_path = PathBuf::from(format!("{}.map", out.display()));
        tokio::fs::write(&map_path, map.to_json()?)
            .await
            .with_context(|| format!("failed to write {}", map_path.display()))?;
    }

    info!(path = %out.display(), "wrote output");
    Ok(())
}

/// Wait for one diagnostic per transformed file; returns how many failed
async fn await_declarations(mut rx: DiagnosticsReceiver, expected: usize) -> usize {
    let mut failures = 0;
    for _ in 0..expected {
        match rx.recv().await {
            Some(Diagnostic::DeclarationWritten { .. }) => {}
            Some(Diagnostic::DeclarationFailed { .. }) => failures += 1,
            None => break,
        }
    }
    failures
}
