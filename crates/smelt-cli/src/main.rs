use anyhow::Result;
use clap::Parser;

use smelt_cli::{
    cli::{Cli, Commands},
    commands::{self, load_config, transform::OutputTarget},
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings live in the config file, so it is read before
    // anything is logged
    let config = load_config(cli.config.as_deref()).await?;
    logging::init_logging(&config.logging, cli.level_override())?;

    match cli.command {
        Commands::Transform {
            files,
            mode,
            ssr,
            out_dir,
            stdout,
        } => {
            let target = match (out_dir, stdout) {
                (_, true) => OutputTarget::Stdout,
                (Some(dir), false) => OutputTarget::Directory(dir),
                (None, false) => OutputTarget::Beside,
            };
            commands::transform::execute(&config, files, mode.into(), ssr, target).await
        }
        Commands::Html { file, mode } => {
            commands::html::execute(&config, &file, mode.into()).await
        }
        Commands::CheckConfig => commands::check_config::execute(&config).await,
    }
}
