//! # Harvester - Crawl Archive Metadata Extraction for Rust
//!
//! This crate turns the WACZ archive produced by a completed web crawl into
//! structured metadata records about every crawled HTML page, for ingestion
//! by a search index or a harvesting pipeline.
//!
//! ## Features
//!
//! - Local, HTTP(S) and S3 locations through one transport
//! - Random access to WACZ containers held in memory
//! - Page manifest and CDX index parsing, joined into a website table
//! - WARC record framing for gzip-member and uncompressed segments
//! - Open Graph and Dublin Core metadata scraping
//! - Fulltext normalization and keyword extraction
//! - Deletion detection against a previous crawl's URL list
//! - XML, JSONL, CSV and TSV output
//! - Bounded parallel enrichment with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use harvester::records::{CrawlRecordsParser, ParserConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ParserConfig::builder()
//!         .include_fulltext(true)
//!         .extract_fulltext_keywords(true)
//!         .num_workers(4)
//!         .build();
//!
//!     let mut parser = CrawlRecordsParser::new("crawls/homepage.wacz", config);
//!     let records = parser
//!         .generate_records(Some("urls.txt"), Some("previous-urls.txt"), None)
//!         .await?;
//!     println!("{} records", records.len());
//!
//!     records.write("output/records.xml").await?;
//!     Ok(())
//! }
//! ```

mod error;

pub mod records;
pub mod transport;
pub mod wacz;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::records::{CrawlRecordsParser, ParserConfig, RecordSet};
    pub use crate::wacz::{Content, WaczClient};
}
