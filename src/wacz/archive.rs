//! In-memory, random-access view of a WACZ container.
//!
//! The whole container is held as one shared buffer. [`ArchiveHandle`] owns the
//! session; [`ArchiveReader`] clones share the buffer, the inflated-entry cache
//! and the closed flag, so a worker can read entries without borrowing the
//! handle. Each entry has its own cache slot, and readers asking for an entry
//! that is being inflated wait for it instead of inflating it again.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use super::error::WaczError;

type Result<T> = std::result::Result<T, WaczError>;

type Buffer = Cursor<Arc<[u8]>>;

/// Inflated bytes of one entry, filled by the first reader to ask
type Slot = Arc<Mutex<Option<Arc<[u8]>>>>;

/// Owner of an open WACZ container
#[derive(Debug)]
pub struct ArchiveHandle {
    source: String,
    reader: ArchiveReader,
}

/// Cheap clone of an open container, usable from worker threads
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    zip: ZipArchive<Buffer>,
    entries: Arc<Mutex<HashMap<String, Slot>>>,
    closed: Arc<AtomicBool>,
}

impl ArchiveHandle {
    /// Index the entries of a container already copied into memory
    ///
    /// # Arguments
    ///
    /// * `source` - Where the bytes came from, for logging
    /// * `bytes` - The complete container
    pub fn from_bytes(source: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let source = source.into();
        let buffer: Arc<[u8]> = Arc::from(bytes);
        let zip = ZipArchive::new(Cursor::new(buffer))?;
        debug!("Opened WACZ archive {} with {} entries", source, zip.len());

        Ok(Self {
            source,
            reader: ArchiveReader {
                zip,
                entries: Arc::new(Mutex::new(HashMap::new())),
                closed: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Location the archive was opened from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Read a named entry in full
    pub fn entry(&mut self, path: &str) -> Result<Arc<[u8]>> {
        self.reader.entry(path)
    }

    /// Whether a named entry exists
    pub fn contains(&self, path: &str) -> Result<bool> {
        self.reader.contains(path)
    }

    /// Hand out a reader sharing this session
    pub fn reader(&self) -> Result<ArchiveReader> {
        self.reader.ensure_open()?;
        Ok(self.reader.clone())
    }

    /// Release the session; safe to call more than once
    pub fn close(&mut self) {
        if !self.reader.closed.swap(true, Ordering::SeqCst) {
            debug!("Closing WACZ archive {}", self.source);
            if let Ok(mut entries) = self.reader.entries.lock() {
                entries.clear();
            }
        }
    }

    /// Whether [`ArchiveHandle::close`] has run
    pub fn is_closed(&self) -> bool {
        self.reader.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ArchiveHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl ArchiveReader {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WaczError::ClosedArchive);
        }
        Ok(())
    }

    /// Read a named entry in full, inflating it at most once per session
    pub fn entry(&mut self, path: &str) -> Result<Arc<[u8]>> {
        self.ensure_open()?;

        let slot = self.slot(path);
        // Held across the inflate so one entry is never inflated twice
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bytes) = cached.as_ref() {
            return Ok(bytes.clone());
        }

        let mut file = self.zip.by_name(path).map_err(|e| match e {
            ZipError::FileNotFound => WaczError::EntryNotFound(path.to_string()),
            other => WaczError::Zip(other),
        })?;
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        drop(file);

        debug!("Inflated {} ({} bytes)", path, bytes.len());

        let bytes: Arc<[u8]> = Arc::from(bytes);
        *cached = Some(bytes.clone());
        Ok(bytes)
    }

    /// Whether a named entry exists
    pub fn contains(&self, path: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.zip.index_for_name(path).is_some())
    }

    fn slot(&self, path: &str) -> Slot {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .clone()
    }
}
