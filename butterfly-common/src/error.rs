//! Error types shared by the butterfly-osm crates
//!
//! Library crates wrap this type in their own error enums; only conditions that
//! are not specific to a single crate live here.

use std::path::PathBuf;

/// Main error type for butterfly-osm operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document could not be parsed
    #[error("Invalid configuration: {0}")]
    ConfigParse(String),

    /// Invalid configuration or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type for butterfly-osm operations
pub type Result<T> = std::result::Result<T, Error>;
