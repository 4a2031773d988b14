//! # WACZ Archive Module
//!
//! This module reads WACZ files, the zipped archive a completed web crawl
//! produces. A WACZ file bundles every HTTP transaction of the crawl: rendered
//! pages live in WARC segment files, and two indexes tie URLs to the bytes
//! that hold them.
//!
//! ## Key Components
//!
//! - `ArchiveHandle` / `ArchiveReader`: the container held in memory, with named entry access
//! - `load_manifest`: the page manifests, the canonical list of crawled URLs
//! - `load_index`: the CDX index of segment files and byte offsets
//! - `read_record`: WARC record framing, one record from an offset
//! - `WaczClient`: joins the two indexes and extracts page content
//!
//! ## Layout of a WACZ file
//!
//! - `pages/pages.jsonl`, `pages/extraPages.jsonl`: header line, then one JSON page per line
//! - `indexes/index.cdx.gz`: gzip, one `<key> <timestamp> <json>` line per capture
//! - `archive/<filename>`: WARC segment files addressed by CDX offsets
//!
//! WACZ format: https://replayweb.page/docs/wacz-format

mod archive;
mod cdx;
mod client;
mod error;
mod pages;
mod warc;

pub use archive::{ArchiveHandle, ArchiveReader};
pub use cdx::{CDX_INDEX_FILEPATH, CdxEntry, HTML_MIMETYPE, load_index, parse_cdx_line};
pub use client::{Content, WARC_DIR, WaczClient, WebsiteRecord, join_websites};
pub use error::WaczError;
pub use pages::{PAGES_FILEPATHS, PageEntry, load_manifest, parse_manifest};
pub use warc::{WarcRecord, parse_record, read_record};

pub(crate) use client::fetch_record;
