//! Command-line host for the smelt pipeline
//!
//! The binary plays the host build system: it resolves, loads and transforms
//! files through a [`smelt_pipeline::Session`], with the compiler and
//! declaration generator run as external processes.

pub mod builtins;
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod generator;
pub mod logging;
pub mod process;
pub mod resolver;

pub use compiler::{parse_diagnostic, CommandCompiler};
pub use generator::CommandDeclarationGenerator;
pub use resolver::FsResolver;
