//! # Crawl Records Module
//!
//! This module turns a completed crawl into a table of metadata records, one
//! per crawled HTML page, ready for a search index or a harvesting pipeline.
//!
//! ## Key Components
//!
//! - `CrawlRecordsParser`: builds the record table from a WACZ archive
//! - `RecordEnricher`: derives the columns of one page from its capture
//! - `extract_html_metadata`: Open Graph and Dublin Core `<meta>` scraping
//! - `KeywordExtractor`: unsupervised keyword extraction over page text
//! - `diff_deletions` / `dedup`: reconciliation against a previous crawl
//! - `RecordSet::write`: XML, JSONL, CSV or TSV output chosen by extension
//!
//! ## Workflow
//!
//! 1. The archive's website table is read (pages joined to HTML captures)
//! 2. Each row is enriched in parallel, bounded by `num_workers`
//! 3. URLs that disappeared since the previous crawl are appended as deleted
//! 4. Duplicate URLs collapse to their latest capture
//! 5. The table is serialized to the requested format

mod config;
mod enrich;
mod error;
mod fulltext;
mod keywords;
mod metadata;
mod parser;
mod reconcile;
mod serialize;

pub use config::{DEFAULT_KEYWORD_STOPWORDS, ParserConfig, ParserConfigBuilder};
pub use enrich::RecordEnricher;
pub use error::RecordsError;
pub use fulltext::{FulltextFields, normalize_fulltext, parse_fulltext_fields};
pub use keywords::{Keyword, KeywordConfig, KeywordExtractor};
pub use metadata::{
    DUBLIN_CORE_TAGS, MetaAttribute, MetaTag, OPEN_GRAPH_TAGS, extract_html_metadata,
};
pub use parser::CrawlRecordsParser;
pub use reconcile::{dedup, diff_deletions, read_url_list};
pub use serialize::OutputFormat;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Columns every record set starts with, in order
pub const BASE_COLUMNS: &[&str] = &[
    "url",
    "status",
    "cdx_warc_filename",
    "cdx_title",
    "cdx_offset",
    "cdx_length",
];

/// Whether a URL is still served or has gone away since the previous crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Page was captured in this crawl
    Active,

    /// Page was listed before but is no longer
    Deleted,
}

impl RecordStatus {
    /// Lowercase name as written to output files
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Deleted => "deleted",
        }
    }
}

/// One row of the output table
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRecord {
    /// Page URL
    pub url: String,

    /// Active or deleted
    pub status: RecordStatus,

    /// Segment file holding the capture
    pub cdx_warc_filename: Option<String>,

    /// Page title from the manifest
    pub cdx_title: Option<String>,

    /// Byte position of the capture in its segment file
    pub cdx_offset: Option<u64>,

    /// Stored length of the capture
    pub cdx_length: Option<u64>,

    /// Scraped `<meta>` values keyed by column name
    pub html_metadata: BTreeMap<String, String>,

    /// Normalized page text
    pub fulltext: Option<String>,

    /// Comma-separated keywords
    pub fulltext_keywords: Option<String>,

    /// Raw HTML body, base64 encoded
    pub html_base64: Option<String>,

    /// HTTP response headers in capture order
    pub response_headers: Option<Vec<(String, String)>>,
}

impl CrawlRecord {
    /// A record for a URL that no longer exists; every other column is null
    pub fn deleted(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: RecordStatus::Deleted,
            cdx_warc_filename: None,
            cdx_title: None,
            cdx_offset: None,
            cdx_length: None,
            html_metadata: BTreeMap::new(),
            fulltext: None,
            fulltext_keywords: None,
            html_base64: None,
            response_headers: None,
        }
    }

    /// Value of one output column, `Null` when absent
    pub fn cell(&self, column: &str) -> Value {
        let text = |value: &Option<String>| value.clone().map(Value::String).unwrap_or(Value::Null);
        let number = |value: Option<u64>| value.map(Value::from).unwrap_or(Value::Null);

        match column {
            "url" => Value::String(self.url.clone()),
            "status" => Value::String(self.status.as_str().to_string()),
            "cdx_warc_filename" => text(&self.cdx_warc_filename),
            "cdx_title" => text(&self.cdx_title),
            "cdx_offset" => number(self.cdx_offset),
            "cdx_length" => number(self.cdx_length),
            "fulltext" => text(&self.fulltext),
            "fulltext_keywords" => text(&self.fulltext_keywords),
            "html_base64" => text(&self.html_base64),
            "response_headers" => match &self.response_headers {
                Some(headers) => {
                    let mut map = Map::new();
                    for (name, value) in headers {
                        // repeated headers fold into one comma-separated value
                        match map.get_mut(name) {
                            Some(Value::String(existing)) => {
                                existing.push_str(", ");
                                existing.push_str(value);
                            }
                            _ => {
                                map.insert(name.clone(), Value::String(value.clone()));
                            }
                        }
                    }
                    Value::Object(map)
                }
                None => Value::Null,
            },
            other => self
                .html_metadata
                .get(other)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
        }
    }
}

/// The finished record table with its column order fixed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<CrawlRecord>,
}

impl RecordSet {
    /// Fix the column order for a set of records.
    ///
    /// Metadata columns appear only when at least one record has a value,
    /// in allow-list order. `fulltext` and `fulltext_keywords` are always
    /// present; the raw HTML and header columns only when configured.
    pub fn new(records: Vec<CrawlRecord>, config: &ParserConfig) -> Self {
        let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();

        for tag in &config.metadata_tags {
            let column = tag.column();
            if columns.contains(&column) {
                continue;
            }
            if records.iter().any(|r| r.html_metadata.contains_key(&column)) {
                columns.push(column);
            }
        }

        columns.push("fulltext".to_string());
        columns.push("fulltext_keywords".to_string());
        if config.include_html_base64 {
            columns.push("html_base64".to_string());
        }
        if config.include_response_headers {
            columns.push("response_headers".to_string());
        }

        Self { columns, records }
    }

    /// Output columns in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Records in order
    pub fn records(&self) -> &[CrawlRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Each record as an ordered column map
    pub fn rows(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        self.records.iter().map(|record| {
            self.columns
                .iter()
                .map(|column| (column.clone(), record.cell(column)))
                .collect()
        })
    }
}
