//! Transform results and stage return values
//!
//! A [`TransformResult`] is the accumulator threaded through one file's chain.
//! Every stage answers with a [`StageOutput`], and [`TransformResult::apply`] is
//! the single place where the two are merged:
//!
//! | Output      | Effect on the accumulator                              |
//! |-------------|--------------------------------------------------------|
//! | `Declined`  | none                                                   |
//! | `Code(t)`   | `code = t`, every other field kept                     |
//! | `Partial(p)`| each field present in `p` replaces the current value   |

use crate::SourceMap;
use serde_json::{Map, Value};

/// Accumulated output for one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformResult {
    /// Current translated code
    pub code: String,
    /// Position mapping, if any step produced one
    pub map: Option<SourceMap>,
    /// Host-specific metadata attached by stages
    pub meta: Option<Map<String, Value>>,
}

impl TransformResult {
    /// Result holding only code
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
            meta: None,
        }
    }

    /// Attach a position mapping
    pub fn with_map(mut self, map: SourceMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Merge one stage's output into the accumulator
    pub fn apply(&mut self, output: StageOutput) {
        match output {
            StageOutput::Declined => {}
            StageOutput::Code(code) => self.code = code,
            StageOutput::Partial(partial) => {
                if let Some(code) = partial.code {
                    self.code = code;
                }
                match partial.map {
                    Some(MapUpdate::Set(map)) => self.map = Some(map),
                    Some(MapUpdate::Clear) => self.map = None,
                    None => {}
                }
                if let Some(meta) = partial.meta {
                    self.meta = Some(meta);
                }
            }
        }
    }
}

/// What a stage hands back
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// The stage chose not to handle this file
    Declined,
    /// Replacement code, nothing else changes
    Code(String),
    /// Field-by-field replacement
    Partial(PartialResult),
}

impl StageOutput {
    /// Replacement code
    pub fn code(code: impl Into<String>) -> Self {
        Self::Code(code.into())
    }

    /// Whether the stage declined
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined)
    }
}

impl From<TransformResult> for StageOutput {
    /// A full result overrides every field, clearing the map if it has none
    fn from(result: TransformResult) -> Self {
        StageOutput::Partial(PartialResult {
            code: Some(result.code),
            map: Some(match result.map {
                Some(map) => MapUpdate::Set(map),
                None => MapUpdate::Clear,
            }),
            meta: result.meta,
        })
    }
}

/// A structured stage return; `None` fields leave the accumulator untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult {
    /// New code
    pub code: Option<String>,
    /// New mapping, or an explicit request to drop the current one
    pub map: Option<MapUpdate>,
    /// New metadata, replacing any previous metadata wholesale
    pub meta: Option<Map<String, Value>>,
}

impl PartialResult {
    /// Partial result replacing the code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Partial result replacing the map
    pub fn with_map(mut self, map: SourceMap) -> Self {
        self.map = Some(MapUpdate::Set(map));
        self
    }

    /// Partial result dropping the map
    pub fn clear_map(mut self) -> Self {
        self.map = Some(MapUpdate::Clear);
        self
    }

    /// Partial result replacing the metadata
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Change to the `map` field
#[derive(Debug, Clone, PartialEq)]
pub enum MapUpdate {
    /// Replace the map
    Set(SourceMap),
    /// Remove the map
    Clear,
}
