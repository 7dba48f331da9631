//! Error handling for the CLI application

use std::fmt;

/// CLI-specific errors not already covered by I/O error context
#[derive(Debug)]
pub enum CliError {
    /// Zip archive contains no entries
    EmptyArchive(String),
    /// Named entry missing from a zip archive
    EntryNotFound {
        /// Archive path as shown to the user
        archive: String,
        /// The entry name that was requested
        entry: String,
    },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::EmptyArchive(path) => write!(f, "zip archive {path} has no entries"),
            CliError::EntryNotFound { archive, entry } => {
                write!(f, "no entry named {entry} in {archive}")
            }
        }
    }
}

impl std::error::Error for CliError {}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, anyhow::Error>;
