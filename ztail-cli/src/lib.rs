//! ztail CLI library
//!
//! Command-line front end for the ztail streaming core: argument parsing,
//! compression-format auto-detection, and thin codec adapters that turn
//! any supported file into a plain byte stream for the pipeline.

pub mod cli;
pub mod detect;
pub mod error;
pub mod source;

pub use cli::Cli;
pub use error::{CliError, CliResult};
