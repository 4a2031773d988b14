//! Error types for the harvester crate

use thiserror::Error;

/// Result type for harvester operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for harvester operations
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a local or remote resource failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The WACZ archive is structurally unusable
    #[error("Archive error: {0}")]
    Archive(String),

    /// A URL lookup matched zero or several captured pages
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Captured content could not be decoded as UTF-8
    #[error("Decode error: {0}")]
    Decode(String),

    /// Record generation or serialization failed
    #[error("Records error: {0}")]
    Records(String),

    /// The requested output format is not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
