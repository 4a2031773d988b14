//! Reconciliation against a previous crawl.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use super::CrawlRecord;
use super::error::RecordsError;
use crate::transport::{self, TransportError};

/// Read a newline-delimited URL list, skipping blank lines
pub async fn read_url_list(uri: &str) -> Result<Vec<String>, RecordsError> {
    let text = transport::read_to_string(uri).await?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Records for URLs listed previously but absent from the current list.
///
/// A previous list that cannot be read means there is nothing to compare
/// against, so no URL is considered deleted. A missing current list is an
/// error.
///
/// # Arguments
///
/// * `urls_file` - Location of the current URL list
/// * `previous_urls_file` - Location of the previous URL list
#[instrument]
pub async fn diff_deletions(
    urls_file: &str,
    previous_urls_file: &str,
) -> Result<Vec<CrawlRecord>, RecordsError> {
    let current = read_url_list(urls_file).await?;
    let previous = match read_url_list(previous_urls_file).await {
        Ok(urls) => urls,
        Err(RecordsError::Transport(TransportError::NotFound(_))) => {
            info!(
                "Previous URLs file {} not found; no deletions computed",
                previous_urls_file
            );
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!(
                "Could not read previous URLs file {}: {}; no deletions computed",
                previous_urls_file, e
            );
            return Ok(Vec::new());
        }
    };

    let current: HashSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let deleted: Vec<CrawlRecord> = previous
        .iter()
        .filter(|url| !current.contains(url.as_str()))
        .filter(|url| seen.insert(url.as_str()))
        .map(CrawlRecord::deleted)
        .collect();

    debug!(
        "{} current URLs, {} previous URLs, {} deleted",
        current.len(),
        previous.len(),
        deleted.len()
    );
    Ok(deleted)
}

/// Collapse records sharing a URL to the one with the largest offset.
///
/// A record without an offset (a deletion) ranks above every capture, and on
/// equal rank the later record wins. Each URL keeps the position of its first
/// occurrence.
pub fn dedup(records: Vec<CrawlRecord>) -> Vec<CrawlRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<CrawlRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.url) {
            Some(&position) => {
                if rank(&record) >= rank(&kept[position]) {
                    kept[position] = record;
                }
            }
            None => {
                positions.insert(record.url.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    kept
}

fn rank(record: &CrawlRecord) -> (bool, u64) {
    (record.cdx_offset.is_none(), record.cdx_offset.unwrap_or_default())
}
