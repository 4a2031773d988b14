//! Page manifests (`pages/*.jsonl`): the canonical list of crawled URLs.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::archive::ArchiveHandle;
use super::error::WaczError;

/// Manifest files, in the order they are read
pub const PAGES_FILEPATHS: [&str; 2] = ["pages/pages.jsonl", "pages/extraPages.jsonl"];

/// URL suffixes of sitemap pages, which never become records
const SITEMAP_SUFFIXES: [&str; 2] = ["sitemap.html", "sitemap.xml"];

/// One crawled page as declared by the capture tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    /// URL of the page
    pub url: String,

    /// Page title as seen by the crawler
    #[serde(default)]
    pub title: Option<String>,

    /// Text extracted by the crawler, HTML already stripped
    #[serde(default)]
    pub text: Option<String>,
}

impl PageEntry {
    fn is_sitemap(&self) -> bool {
        SITEMAP_SUFFIXES
            .iter()
            .any(|suffix| self.url.ends_with(suffix))
    }
}

/// Load every present page manifest and concatenate their rows.
///
/// The first line of each manifest is a header and is skipped. A missing
/// manifest is tolerated as long as at least one is present.
pub fn load_manifest(handle: &mut ArchiveHandle) -> Result<Vec<PageEntry>, WaczError> {
    let mut pages = Vec::new();
    let mut found = 0;

    for path in PAGES_FILEPATHS {
        let bytes = match handle.entry(path) {
            Ok(bytes) => bytes,
            Err(WaczError::EntryNotFound(_)) => {
                warn!("A pages file was not found in WACZ file: {}.", path);
                continue;
            }
            Err(e) => return Err(e),
        };
        found += 1;

        let text = std::str::from_utf8(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let before = pages.len();
        pages.extend(parse_manifest(text)?);
        debug!("Loaded {} pages from {}", pages.len() - before, path);
    }

    if found == 0 {
        return Err(WaczError::ManifestMissing);
    }

    Ok(pages)
}

/// Parse one manifest body, skipping the header line and sitemap pages
pub fn parse_manifest(text: &str) -> Result<Vec<PageEntry>, WaczError> {
    let mut pages = Vec::new();
    for line in text.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let page: PageEntry = serde_json::from_str(line)?;
        if !page.is_sitemap() {
            pages.push(page);
        }
    }
    Ok(pages)
}
