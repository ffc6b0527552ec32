//! Source map (revision 3) values
//!
//! The pipeline never interprets `mappings`; it only carries maps between
//! steps, renames the files they point at, and embeds them as data URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Prefix of an embedded JSON source map payload
pub const DATA_URL_PREFIX: &str = "data:application/json;charset=utf-8;base64,";

/// Comment marker that introduces a source map reference
pub const MAPPING_URL_COMMENT: &str = "//# sourceMappingURL=";

/// A revision 3 source map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// Always 3
    #[serde(default = "default_version")]
    pub version: u32,
    /// Name of the generated file this map belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Prefix applied to every entry in `sources`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Original files
    #[serde(default)]
    pub sources: Vec<String>,
    /// Inlined original contents, parallel to `sources`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    /// Symbol names referenced by `mappings`
    #[serde(default)]
    pub names: Vec<String>,
    /// VLQ-encoded segments
    #[serde(default)]
    pub mappings: String,
}

fn default_version() -> u32 {
    3
}

impl SourceMap {
    /// Map for `file` generated from `sources`
    pub fn new(file: impl Into<String>, sources: Vec<String>, mappings: impl Into<String>) -> Self {
        Self {
            version: 3,
            file: Some(file.into()),
            source_root: None,
            sources,
            sources_content: Vec::new(),
            names: Vec::new(),
            mappings: mappings.into(),
        }
    }

    /// Parse map JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode as a base64 `data:` URL
    pub fn to_data_url(&self) -> Result<String, serde_json::Error> {
        let json = self.to_json()?;
        Ok(format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(json)))
    }

    /// Decode a `data:` URL produced by [`SourceMap::to_data_url`]
    pub fn from_data_url(url: &str) -> Option<Self> {
        let payload = url.strip_prefix(DATA_URL_PREFIX)?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Find and decode an inline map comment at the end of `code`
    pub fn from_inline_comment(code: &str) -> Option<Self> {
        let (_, url) = split_mapping_comment(code);
        url.and_then(Self::from_data_url)
    }

    /// Point every reference to `from` (in `file` and `sources`) at `to`
    ///
    /// Returns whether anything changed.
    pub fn rename_file(&mut self, from: &str, to: &str) -> bool {
        let mut changed = false;
        if self.file.as_deref() == Some(from) {
            self.file = Some(to.to_string());
            changed = true;
        }
        for source in &mut self.sources {
            if source == from {
                *source = to.to_string();
                changed = true;
            }
        }
        changed
    }
}

/// Split text at its last `//# sourceMappingURL=` comment
///
/// Returns the text before the comment (without the newline preceding it) and
/// the URL, or the whole text and `None` when there is no such comment.
pub fn split_mapping_comment(text: &str) -> (&str, Option<&str>) {
    let needle = format!("\n{}", MAPPING_URL_COMMENT);
    if let Some(index) = text.rfind(&needle) {
        let url = text[index + needle.len()..].trim();
        return (&text[..index], Some(url));
    }
    if let Some(url) = text.strip_prefix(MAPPING_URL_COMMENT) {
        return ("", Some(url.trim()));
    }
    (text, None)
}
