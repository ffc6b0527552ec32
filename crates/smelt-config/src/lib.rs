//! # Smelt Configuration Library
//!
//! Serializable configuration for the smelt transform pipeline.
//!
//! ## Features
//!
//! - TOML and JSON config files (chosen by file extension)
//! - Per-mode stage chains (`build`, `serve`) accepting one name or a list
//! - Derived defaults for type stripping and the output extension
//! - Validation of glob patterns and extensions before a session starts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smelt_config::{ConfigLoader, Mode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("smelt.toml").await?;
//!     let serve_chain = config.pipeline.stages.for_mode(Mode::Serve);
//!     println!("{} serve stages", serve_chain.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod loader;
mod logging;
mod pipeline;
mod tools;

pub use error::*;
pub use loader::*;
pub use logging::*;
pub use pipeline::*;
pub use tools::*;
