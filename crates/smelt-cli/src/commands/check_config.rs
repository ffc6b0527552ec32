//! `smelt check-config`: validate and print the effective settings per mode

use crate::builtins::builtin_plugins;
use crate::commands::build_pipeline;
use anyhow::Result;
use smelt_config::{Mode, SmeltConfig};
use tracing::error;

/// Execute the check-config command
pub async fn execute(config: &SmeltConfig) -> Result<()> {
    let wired = build_pipeline(config)?;
    let pipeline = &wired.pipeline;
    let plugins = builtin_plugins();

    println!("compiler: {}", config.tools.compiler.command.program);
    println!("output extension: {}", pipeline.config().output_extension());
    println!("strip types: {}", pipeline.config().strip_types());

    let mut broken = 0;
    for mode in Mode::ALL {
        match pipeline.start_session(mode, &plugins) {
            Ok(session) => {
                let names = session.context().stage_names();
                let chain = if names.is_empty() {
                    "(none)".to_string()
                } else {
                    names.join(" -> ")
                };
                println!("{}: {}", mode, chain);
            }
            Err(e) => {
                broken += 1;
                error!(mode = %mode, "{}", e);
                println!("{}: error: {}", mode, e);
            }
        }
    }

    if broken > 0 {
        anyhow::bail!("configuration has {} unusable mode(s)", broken);
    }
    println!("config ok");
    Ok(())
}
