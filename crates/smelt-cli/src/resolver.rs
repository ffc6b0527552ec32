//! Filesystem module resolution

use async_trait::async_trait;
use smelt_core::{HostResolver, ResolveError, ResolveOptions, Resolution};
use std::path::{Component, Path, PathBuf};

/// Resolves relative and absolute paths against the filesystem
///
/// Relative specifiers (`./`, `../`) are resolved against the importer's
/// directory, or `root` for entry points. Bare specifiers are package
/// imports and reported as external.
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    /// Resolver for entry points relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidate(&self, id: &str, importer: Option<&str>) -> Option<PathBuf> {
        let path = Path::new(id);
        if path.is_absolute() {
            return Some(normalize(path));
        }
        if !(id.starts_with("./") || id.starts_with("../")) {
            return None;
        }

        let base = importer
            .and_then(|importer| Path::new(importer).parent())
            .unwrap_or(&self.root);
        Some(normalize(&base.join(path)))
    }
}

#[async_trait]
impl HostResolver for FsResolver {
    async fn resolve(
        &self,
        id: &str,
        importer: Option<&str>,
        _options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        let Some(path) = self.candidate(id, importer) else {
            return Ok(Resolution::External(id.to_string()));
        };

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ResolveError::new(id, e.to_string()))?;
        if !exists {
            return Ok(Resolution::Unresolved);
        }

        Ok(Resolution::Resolved(path.to_string_lossy().into_owned()))
    }
}

/// Remove `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
