//! # Byte-Stream Transport
//!
//! Resolves a location string to bytes and back. A location is a plain local
//! path, a `file://` URI, an `http(s)://` URI, or an `s3://bucket/key` object.
//! Everything is read into memory in one go; nothing downstream needs
//! streaming reads.
//!
//! HTTP locations are read-only. Local writes create parent directories as
//! needed. S3 credentials, region and endpoint come from the usual `AWS_*`
//! environment variables.

use crate::error::Error as CrateError;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use url::Url;

/// Error type for transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Local file or remote object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote server answered with a non-success status
    #[error("HTTP status {status} for {uri}")]
    HttpStatus {
        /// Location that was requested
        uri: String,
        /// Status code returned by the server
        status: u16,
    },

    /// Object storage client error
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Location scheme is not handled by this transport
    #[error("Unsupported scheme for location: {0}")]
    UnsupportedScheme(String),

    /// Location has a known scheme but no usable bucket or key
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
}

impl From<TransportError> for CrateError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => CrateError::Io(e),
            _ => CrateError::Transport(err.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, TransportError>;

/// A location after scheme resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File on the local filesystem
    Local(PathBuf),

    /// Object reachable over HTTP(S)
    Remote(Url),

    /// Object in an S3 bucket
    ObjectStorage {
        /// Bucket name
        bucket: String,
        /// Object key inside the bucket
        key: String,
    },
}

impl Location {
    /// Resolve a location string.
    ///
    /// Strings without a `scheme://` prefix are always local paths, which keeps
    /// Windows drive letters and relative paths working.
    pub fn parse(uri: &str) -> Result<Self> {
        if !uri.contains("://") {
            return Ok(Location::Local(PathBuf::from(uri)));
        }

        let parsed =
            Url::parse(uri).map_err(|_| TransportError::UnsupportedScheme(uri.to_string()))?;
        match parsed.scheme() {
            "file" => parsed
                .to_file_path()
                .map(Location::Local)
                .map_err(|_| TransportError::UnsupportedScheme(uri.to_string())),
            "http" | "https" => Ok(Location::Remote(parsed)),
            "s3" => {
                let bucket = parsed.host_str().unwrap_or_default();
                let key = parsed.path().trim_start_matches('/');
                if bucket.is_empty() || key.is_empty() {
                    return Err(TransportError::InvalidLocation(uri.to_string()));
                }
                Ok(Location::ObjectStorage {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            _ => Err(TransportError::UnsupportedScheme(uri.to_string())),
        }
    }
}

/// Read the full contents of a location into memory
pub async fn read_bytes(uri: &str) -> Result<Vec<u8>> {
    match Location::parse(uri)? {
        Location::Local(path) => {
            debug!("Reading local file {}", path.display());
            fs::read(&path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TransportError::NotFound(uri.to_string()),
                _ => TransportError::Io(e),
            })
        }
        Location::Remote(url) => {
            debug!("Fetching remote object {}", url);
            let response = reqwest::get(url.clone()).await?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(TransportError::NotFound(uri.to_string()));
            }
            if !status.is_success() {
                return Err(TransportError::HttpStatus {
                    uri: uri.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok(response.bytes().await?.to_vec())
        }
        Location::ObjectStorage { bucket, key } => {
            debug!("Fetching object {} from bucket {}", key, bucket);
            read_object(&s3_store(&bucket)?, &key, uri).await
        }
    }
}

/// Read a location as UTF-8 text
pub async fn read_to_string(uri: &str) -> Result<String> {
    let bytes = read_bytes(uri).await?;
    String::from_utf8(bytes).map_err(|e| {
        TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

/// Write bytes to a location, replacing anything already there
pub async fn write_bytes(uri: &str, bytes: &[u8]) -> Result<()> {
    match Location::parse(uri)? {
        Location::Local(path) => {
            ensure_parent(&path).await?;
            fs::write(&path, bytes).await?;
            debug!("Wrote {} bytes to {}", bytes.len(), path.display());
            Ok(())
        }
        Location::Remote(_) => Err(TransportError::UnsupportedScheme(uri.to_string())),
        Location::ObjectStorage { bucket, key } => {
            write_object(&s3_store(&bucket)?, &key, bytes).await?;
            debug!("Wrote {} bytes to {}", bytes.len(), uri);
            Ok(())
        }
    }
}

fn s3_store(bucket: &str) -> Result<AmazonS3> {
    Ok(AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .build()?)
}

async fn read_object(store: &dyn ObjectStore, key: &str, uri: &str) -> Result<Vec<u8>> {
    match store.get(&ObjectPath::from(key)).await {
        Ok(object) => Ok(object.bytes().await?.to_vec()),
        Err(object_store::Error::NotFound { .. }) => Err(TransportError::NotFound(uri.to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn write_object(store: &dyn ObjectStore, key: &str, bytes: &[u8]) -> Result<()> {
    store
        .put(&ObjectPath::from(key), PutPayload::from(bytes.to_vec()))
        .await?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_location_parse() {
        assert_eq!(
            Location::parse("crawls/homepage.wacz").unwrap(),
            Location::Local(PathBuf::from("crawls/homepage.wacz"))
        );
        assert_eq!(
            Location::parse("file:///tmp/homepage.wacz").unwrap(),
            Location::Local(PathBuf::from("/tmp/homepage.wacz"))
        );
        assert!(matches!(
            Location::parse("https://example.com/homepage.wacz").unwrap(),
            Location::Remote(_)
        ));

        assert_eq!(
            Location::parse("s3://crawls/2024/homepage.wacz").unwrap(),
            Location::ObjectStorage {
                bucket: "crawls".to_string(),
                key: "2024/homepage.wacz".to_string(),
            }
        );
        assert!(matches!(
            Location::parse("s3://crawls/"),
            Err(TransportError::InvalidLocation(_))
        ));

        match Location::parse("ftp://example.com/homepage.wacz") {
            Err(TransportError::UnsupportedScheme(uri)) => {
                assert_eq!(uri, "ftp://example.com/homepage.wacz")
            }
            other => panic!("Expected UnsupportedScheme, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_object_write_then_read() {
        let store = InMemory::new();

        write_object(&store, "output/records.jsonl", b"{\"url\": \"https://example.com/\"}\n")
            .await
            .unwrap();
        let bytes = read_object(&store, "output/records.jsonl", "s3://crawls/output/records.jsonl")
            .await
            .unwrap();
        assert_eq!(bytes, b"{\"url\": \"https://example.com/\"}\n");
    }

    #[tokio::test]
    async fn test_object_missing_is_not_found() {
        let store = InMemory::new();

        match read_object(&store, "previous-urls.txt", "s3://crawls/previous-urls.txt").await {
            Err(TransportError::NotFound(uri)) => assert_eq!(uri, "s3://crawls/previous-urls.txt"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/urls.txt");
        let uri = path.to_str().unwrap();

        write_bytes(uri, b"https://example.com/\n").await.unwrap();
        let text = read_to_string(uri).await.unwrap();
        assert_eq!(text, "https://example.com/\n");
    }

    #[tokio::test]
    async fn test_local_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        match read_bytes(path.to_str().unwrap()).await {
            Err(TransportError::NotFound(_)) => (),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_read() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/previous-urls.txt")
            .with_status(200)
            .with_body("https://example.com/a\nhttps://example.com/b\n")
            .create_async()
            .await;

        let uri = format!("{}/previous-urls.txt", server.url());
        let text = read_to_string(&uri).await.unwrap();
        assert_eq!(text.lines().count(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_missing_and_failing() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing.txt")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/broken.txt")
            .with_status(500)
            .create_async()
            .await;

        let missing = read_bytes(&format!("{}/missing.txt", server.url())).await;
        assert!(matches!(missing, Err(TransportError::NotFound(_))));

        let broken = read_bytes(&format!("{}/broken.txt", server.url())).await;
        assert!(matches!(
            broken,
            Err(TransportError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_remote_write_unsupported() {
        let result = write_bytes("https://example.com/out.jsonl", b"{}").await;
        assert!(matches!(result, Err(TransportError::UnsupportedScheme(_))));
    }
}
