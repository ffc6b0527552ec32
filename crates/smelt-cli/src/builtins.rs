//! Host plugins available to the CLI
//!
//! The CLI has no host build system behind it, so it plays host itself with a
//! fixed plugin list. Config files name these in `pipeline.stages`.

use smelt_core::{FnStage, HostPlugin, StageOutput, StagePlugin};
use std::sync::Arc;

/// Declines every file
pub const IDENTITY: &str = "identity";

/// Prepends a comment naming the module
pub const BANNER: &str = "banner";

/// The CLI's finalized plugin list
pub fn builtin_plugins() -> Vec<Arc<dyn HostPlugin>> {
    let identity = FnStage::new(IDENTITY, |_, _, _| Ok(StageOutput::Declined));
    let banner = FnStage::new(BANNER, |code, id, _| {
        Ok(StageOutput::code(format!("// {}\n{}", id, code)))
    });

    vec![
        Arc::new(StagePlugin::new(IDENTITY, Arc::new(identity))),
        Arc::new(StagePlugin::new(BANNER, Arc::new(banner))),
    ]
}
