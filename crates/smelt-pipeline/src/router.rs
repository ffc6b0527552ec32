//! Identifier rerouting
//!
//! Downstream stages pick files by extension, and the compiled artifact's
//! extension differs from the source's. The router therefore hands the host a
//! decorated identifier, `<source><output extension><marker>`, for every module
//! the pipeline owns:
//!
//! ```text
//! /src/app.civet  ──resolve──▶  /src/app.civet.jsx?transform
//!                                      │
//!                 ◀───load (strip)─────┘  reads /src/app.civet verbatim
//! ```
//!
//! This is the only place identifiers are decorated or stripped.

use crate::error::{FileResult, TransformError};
use crate::filter::PathFilter;
use smelt_core::{HostResolver, ResolveOptions, Resolution, SourceReader};
use std::sync::Arc;
use tracing::debug;

/// Decorates, strips, resolves and loads owned identifiers
#[derive(Clone)]
pub struct ModuleRouter {
    filter: PathFilter,
    suffix: String,
    resolver: Arc<dyn HostResolver>,
    reader: Arc<dyn SourceReader>,
}

impl ModuleRouter {
    /// Router appending `output_extension` + `marker_suffix`
    pub fn new(
        filter: PathFilter,
        output_extension: &str,
        marker_suffix: &str,
        resolver: Arc<dyn HostResolver>,
        reader: Arc<dyn SourceReader>,
    ) -> Self {
        Self {
            filter,
            suffix: format!("{}{}", output_extension, marker_suffix),
            resolver,
            reader,
        }
    }

    /// The decoration appended to owned identifiers
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether `id` already carries the decoration
    pub fn is_decorated(&self, id: &str) -> bool {
        id.ends_with(&self.suffix)
    }

    /// Append the decoration unless it is already there
    pub fn decorate(&self, id: &str) -> String {
        if self.is_decorated(id) {
            id.to_string()
        } else {
            format!("{}{}", id, self.suffix)
        }
    }

    /// Source path behind a decorated identifier
    pub fn strip<'a>(&self, id: &'a str) -> Option<&'a str> {
        id.strip_suffix(self.suffix.as_str())
    }

    /// `id` with any decoration removed
    pub fn source_path<'a>(&self, id: &'a str) -> &'a str {
        self.strip(id).unwrap_or(id)
    }

    /// Whether the pipeline owns `id`, decorated or not
    pub fn owns(&self, id: &str) -> bool {
        self.filter.matches(self.source_path(id))
    }

    /// Resolve an import through the host and decorate owned results
    ///
    /// Returns `None` when the pipeline does not handle the import: the
    /// identifier is not owned, or the host reports it external or unresolved.
    pub async fn resolve_id(
        &self,
        id: &str,
        importer: Option<&str>,
        options: &ResolveOptions,
    ) -> FileResult<Option<String>> {
        let plain = self.source_path(id);
        if !self.filter.matches(plain) {
            return Ok(None);
        }

        let importer = importer.map(|importer| self.source_path(importer));
        match self.resolver.resolve(plain, importer, options).await? {
            Resolution::Resolved(resolved) if self.filter.matches(&resolved) => {
                let routed = self.decorate(&resolved);
                debug!(id = %id, routed = %routed, "rerouted import");
                Ok(Some(routed))
            }
            Resolution::Resolved(resolved) => {
                debug!(id = %id, resolved = %resolved, "resolved outside the filter");
                Ok(None)
            }
            Resolution::External(_) | Resolution::Unresolved => Ok(None),
        }
    }

    /// Raw source text for a decorated identifier
    ///
    /// Compilation happens later, in the transform phase; this only reads.
    pub async fn load(&self, id: &str) -> FileResult<Option<String>> {
        let Some(path) = self.strip(id) else {
            return Ok(None);
        };
        if !self.filter.matches(path) {
            return Ok(None);
        }

        let text = self
            .reader
            .read_source(path)
            .await
            .map_err(|source| TransformError::Load {
                id: id.to_string(),
                source,
            })?;
        debug!(id = %id, path = %path, bytes = text.len(), "loaded source");
        Ok(Some(text))
    }
}
