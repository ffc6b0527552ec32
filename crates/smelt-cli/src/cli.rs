use clap::{Parser, Subcommand, ValueEnum};
use smelt_config::Mode;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Session mode as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Production build chain
    Build,
    /// Dev server chain
    Serve,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Build => Mode::Build,
            ModeArg::Serve => Mode::Serve,
        }
    }
}

#[derive(Parser)]
#[command(name = "smelt")]
#[command(about = "smelt - compile alternate-syntax sources and run them through a stage chain")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG or the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ./smelt.toml when present)
    #[arg(short = 'C', long, global = true, env = "SMELT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Level forced on the command line, if any
    pub fn level_override(&self) -> Option<LevelFilter> {
        if self.verbose {
            Some(LevelFilter::DEBUG)
        } else {
            self.log_level.map(Into::into)
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve, load and transform source files
    Transform {
        /// Source files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Which stage chain to run
        #[arg(short, long, value_enum, default_value = "build")]
        mode: ModeArg,

        /// Transform for server-side rendering
        #[arg(long)]
        ssr: bool,

        /// Write outputs here instead of next to each source
        #[arg(short, long, conflicts_with = "stdout")]
        out_dir: Option<PathBuf>,

        /// Print outputs instead of writing files
        #[arg(long)]
        stdout: bool,
    },

    /// Rewrite script references in a markup document
    Html {
        /// Markup file
        file: PathBuf,

        /// Session mode
        #[arg(short, long, value_enum, default_value = "serve")]
        mode: ModeArg,
    },

    /// Validate the config and show the resolved chain for each mode
    CheckConfig,
}
