//! Error types for the wacz module

use crate::error::Error as CrateError;
use crate::transport::TransportError;
use thiserror::Error;

/// Error type for WACZ archive operations
#[derive(Debug, Error)]
pub enum WaczError {
    /// Requested internal path is absent from the archive
    #[error("Entry not found in WACZ archive: {0}")]
    EntryNotFound(String),

    /// Neither page manifest exists, so the page list cannot be established
    #[error("Both pages.jsonl and extraPages.jsonl appear missing from WACZ archive")]
    ManifestMissing,

    /// Archive was read after it was closed
    #[error("WACZ archive is closed")]
    ClosedArchive,

    /// URL lookup matched zero or several pages
    #[error("Could not find a unique url in CDX index: {url} ({matches} matches)")]
    AmbiguousOrMissingUrl {
        /// URL that was looked up
        url: String,
        /// Number of pages that matched
        matches: usize,
    },

    /// Captured payload is not valid UTF-8
    #[error("Content is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Zip container error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error while reading an entry
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error in a manifest line
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed WARC record framing
    #[error("WARC error: {0}")]
    Warc(String),

    /// Archive bytes could not be fetched
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<WaczError> for CrateError {
    fn from(err: WaczError) -> Self {
        match err {
            WaczError::AmbiguousOrMissingUrl { .. } => CrateError::Lookup(err.to_string()),
            WaczError::Decode(_) => CrateError::Decode(err.to_string()),
            WaczError::Transport(e) => e.into(),
            WaczError::Io(e) => CrateError::Io(e),
            _ => CrateError::Archive(err.to_string()),
        }
    }
}
