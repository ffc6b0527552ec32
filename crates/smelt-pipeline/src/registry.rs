//! Stage resolution against the host's finalized plugin list
//!
//! The plugin list is turned into a [`StageTable`] once, when a session starts.
//! Every configured [`StageSpec`] is then resolved against that table; the
//! first unresolvable name aborts the session before any file is seen.

use crate::error::{SessionError, SessionResult};
use smelt_config::Mode;
use smelt_core::{HostPlugin, Registry, RegistryBuilder, Stage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name under which this pipeline registers with the host
pub const PLUGIN_NAME: &str = "smelt";

/// A configured chain entry
#[derive(Clone)]
pub enum StageSpec {
    /// Look the stage up by exact plugin name
    Named(String),
    /// Use this stage as-is
    Direct(Arc<dyn Stage>),
}

impl StageSpec {
    /// Entry looked up by name
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Entry wrapping a stage directly
    pub fn direct(stage: Arc<dyn Stage>) -> Self {
        Self::Direct(stage)
    }
}

impl fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageSpec::Named(name) => f.debug_tuple("Named").field(name).finish(),
            StageSpec::Direct(stage) => f.debug_tuple("Direct").field(&stage.name()).finish(),
        }
    }
}

impl From<&str> for StageSpec {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for StageSpec {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Where a resolved stage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOrigin {
    /// Supplied directly in configuration
    Direct,
    /// Found in the host's plugin list
    Host,
}

/// A resolved chain entry
#[derive(Clone)]
pub struct StageHandle {
    /// Name used in logs and errors
    pub name: String,
    /// The callable
    pub stage: Arc<dyn Stage>,
    /// How it was obtained
    pub origin: StageOrigin,
}

impl fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageHandle")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Host plugins by name; `None` marks a plugin without a transform hook
#[derive(Default)]
pub struct StageTable {
    entries: HashMap<String, Option<Arc<dyn Stage>>>,
    order: Vec<String>,
}

impl StageTable {
    /// Build the table from a host's finalized plugin list
    pub fn from_plugins(plugins: &[Arc<dyn HostPlugin>]) -> Self {
        plugins
            .iter()
            .fold(StageTableBuilder::default(), |builder, plugin| {
                builder.register(plugin.name(), plugin.transform_stage())
            })
            .build()
    }

    /// Resolve one configured entry for `mode`
    pub fn resolve(&self, spec: &StageSpec, mode: Mode) -> SessionResult<StageHandle> {
        match spec {
            StageSpec::Direct(stage) => Ok(StageHandle {
                name: stage.name().to_string(),
                stage: Arc::clone(stage),
                origin: StageOrigin::Direct,
            }),
            StageSpec::Named(name) if name == PLUGIN_NAME => {
                Err(SessionError::SelfReference { name: name.clone() })
            }
            StageSpec::Named(name) => match self.lookup(name) {
                Some(Some(stage)) => Ok(StageHandle {
                    name: name.clone(),
                    stage: Arc::clone(stage),
                    origin: StageOrigin::Host,
                }),
                Some(None) => Err(SessionError::StageWithoutTransform { name: name.clone() }),
                None => Err(SessionError::StageNotFound {
                    name: name.clone(),
                    mode,
                }),
            },
        }
    }

    /// Resolve a whole chain, failing on the first unresolvable entry
    pub fn resolve_chain(&self, specs: &[StageSpec], mode: Mode) -> SessionResult<Vec<StageHandle>> {
        let chain = specs
            .iter()
            .map(|spec| self.resolve(spec, mode))
            .collect::<SessionResult<Vec<_>>>()?;

        debug!(
            mode = %mode,
            stages = ?chain.iter().map(|h| h.name.as_str()).collect::<Vec<_>>(),
            "resolved stage chain"
        );
        Ok(chain)
    }
}

impl Registry for StageTable {
    type Value = Option<Arc<dyn Stage>>;

    fn lookup(&self, name: &str) -> Option<&Self::Value> {
        self.entries.get(name)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Builder for [`StageTable`]
#[derive(Default)]
pub struct StageTableBuilder {
    table: StageTable,
}

impl RegistryBuilder for StageTableBuilder {
    type Registry = StageTable;
    type Value = Option<Arc<dyn Stage>>;

    fn register(mut self, name: impl Into<String>, value: Self::Value) -> Self {
        let name = name.into();
        if self.table.entries.contains_key(&name) {
            warn!(plugin = %name, "duplicate host plugin name; keeping the first registration");
            return self;
        }
        self.table.order.push(name.clone());
        self.table.entries.insert(name, value);
        self
    }

    fn build(self) -> StageTable {
        self.table
    }
}
