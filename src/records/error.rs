//! Error types for the records module

use crate::error::Error as CrateError;
use crate::transport::TransportError;
use crate::wacz::WaczError;
use thiserror::Error;

/// Error type for record generation and serialization
#[derive(Debug, Error)]
pub enum RecordsError {
    /// Reading the crawl archive failed
    #[error("WACZ error: {0}")]
    Wacz(#[from] WaczError),

    /// Output file extension has no serializer
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// XML writing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Keyword tokenizer pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL list or output file could not be read or written
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Worker pool semaphore was closed
    #[error("Semaphore error: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),

    /// An enrichment task panicked or was cancelled
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<RecordsError> for CrateError {
    fn from(err: RecordsError) -> Self {
        match err {
            RecordsError::Wacz(e) => e.into(),
            RecordsError::Transport(e) => e.into(),
            RecordsError::UnsupportedFormat(_) => CrateError::UnsupportedFormat(err.to_string()),
            RecordsError::Io(e) => CrateError::Io(e),
            RecordsError::Json(e) => CrateError::Json(e),
            _ => CrateError::Records(err.to_string()),
        }
    }
}
