//! CDX index (`indexes/index.cdx.gz`): where each captured response lives.
//!
//! Each line looks like `<sort-key> <timestamp> <json>`. Only the JSON object is
//! used. Interrupted crawls can leave broken lines behind, so a line that does
//! not parse is logged and skipped rather than failing the whole index.

use std::io::Read;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::archive::ArchiveHandle;
use super::error::WaczError;

/// Location of the compressed index inside the container
pub const CDX_INDEX_FILEPATH: &str = "indexes/index.cdx.gz";

/// Mimetype of the captures that become records
pub const HTML_MIMETYPE: &str = "text/html";

/// One captured HTTP transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdxEntry {
    /// Captured URL
    pub url: String,

    /// Mimetype of the response
    #[serde(default)]
    pub mime: Option<String>,

    /// HTTP status code
    #[serde(default, deserialize_with = "flexible_string")]
    pub status: Option<String>,

    /// Payload digest
    #[serde(default)]
    pub digest: Option<String>,

    /// Stored record length in bytes
    #[serde(default, deserialize_with = "flexible_u64")]
    pub length: Option<u64>,

    /// Byte position of the record in its segment file
    #[serde(default, deserialize_with = "flexible_u64")]
    pub offset: Option<u64>,

    /// Segment file name under `archive/`
    #[serde(default)]
    pub filename: Option<String>,
}

impl CdxEntry {
    /// Whether this capture is an HTML page
    pub fn is_html(&self) -> bool {
        self.mime.as_deref() == Some(HTML_MIMETYPE)
    }
}

/// Numbers in CDX JSON are written either as JSON numbers or as numeric strings
fn flexible_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("not an unsigned integer: {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid integer '{}': {}", s, e))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected integer, got {}",
            other
        ))),
    }
}

fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Ok(Some(other.to_string())),
    }
}

/// Parse the JSON payload of one CDX line, or `None` if the line is malformed
pub fn parse_cdx_line(line: &[u8]) -> Option<CdxEntry> {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim(),
        Err(e) => {
            warn!("Error parsing CDX line: not UTF-8: {}", e);
            return None;
        }
    };
    if line.is_empty() {
        return None;
    }

    let Some(json) = line.splitn(3, ' ').nth(2) else {
        warn!("Error parsing CDX line: no JSON payload: {}", line);
        return None;
    };

    match serde_json::from_str::<CdxEntry>(json) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Error parsing CDX line: {}: {}", e, line);
            None
        }
    }
}

/// Load the CDX index, keeping only HTML captures
pub fn load_index(handle: &mut ArchiveHandle) -> Result<Vec<CdxEntry>, WaczError> {
    let compressed = handle.entry(CDX_INDEX_FILEPATH)?;
    let mut decompressed = Vec::new();
    MultiGzDecoder::new(&compressed[..]).read_to_end(&mut decompressed)?;

    let mut total = 0;
    let entries: Vec<CdxEntry> = decompressed
        .split(|b| *b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .inspect(|_| total += 1)
        .filter_map(parse_cdx_line)
        .filter(CdxEntry::is_html)
        .collect();

    debug!(
        "Parsed {} HTML entries from {} CDX lines",
        entries.len(),
        total
    );
    Ok(entries)
}
