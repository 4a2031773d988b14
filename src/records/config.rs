//! # Record Parser Configuration
//!
//! Options controlling which fields the record parser derives for every
//! crawled page, and how much parallelism it may use. Configuration follows
//! a builder pattern so callers only spell out what they change.
//!
//! ## Key Components
//!
//! - `ParserConfig`: the full set of options
//! - `ParserConfigBuilder`: fluent construction of a `ParserConfig`
//! - `DEFAULT_KEYWORD_STOPWORDS`: navigation chrome and institutional boilerplate
//!   that keyword extraction should never report

use super::keywords::KeywordConfig;
use super::metadata::MetaTag;

/// Site chrome phrases that are never useful keywords
pub const DEFAULT_KEYWORD_STOPWORDS: &[&str] = &[
    "Skip to Main",
    "Main Content",
    "MIT",
    "Main",
    "Content",
    "Skip",
    "Libraries",
    "Open",
    "Library",
    "View Menu Home",
    "View Menu",
    "events Subscribe",
    "Subscribe",
    "Access Collection",
    "Event date",
    "access",
    "access downloads",
    "access policies",
    "Toggle navigation View",
    "navigation View Menu",
    "articles by MIT-affiliated",
    "authors made",
    "Menu Home",
    "Toggle navigation",
    "navigation View",
    "Menu Home Services",
    "Documentation Center Toggle",
    "Center Toggle navigation",
    "Stacks Toggle navigation",
    "titles Chronological list",
    "Stacks Toggle",
];

/// Configuration for the record parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Keep the whitespace-normalized fulltext of each page
    pub include_fulltext: bool,

    /// Extract keywords from the fulltext of each page
    pub extract_fulltext_keywords: bool,

    /// Add the raw HTML body, base64 encoded
    pub include_html_base64: bool,

    /// Add the captured HTTP response headers
    pub include_response_headers: bool,

    /// HTML `<meta>` tags scraped into columns
    pub metadata_tags: Vec<MetaTag>,

    /// Extra stopwords for keyword extraction
    pub keyword_stopwords: Vec<String>,

    /// Keyword extraction tuning
    pub keywords: KeywordConfig,

    /// Maximum number of pages enriched concurrently
    pub num_workers: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            include_fulltext: false,
            extract_fulltext_keywords: false,
            include_html_base64: false,
            include_response_headers: false,
            metadata_tags: MetaTag::defaults(),
            keyword_stopwords: DEFAULT_KEYWORD_STOPWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keywords: KeywordConfig::default(),
            num_workers: 1,
        }
    }
}

/// Builder for ParserConfig
#[derive(Debug, Default)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Set whether normalized fulltext is kept
    pub fn include_fulltext(mut self, include_fulltext: bool) -> Self {
        self.config.include_fulltext = include_fulltext;
        self
    }

    /// Set whether keywords are extracted from fulltext
    pub fn extract_fulltext_keywords(mut self, extract_fulltext_keywords: bool) -> Self {
        self.config.extract_fulltext_keywords = extract_fulltext_keywords;
        self
    }

    /// Set whether the raw HTML body is added as base64
    pub fn include_html_base64(mut self, include_html_base64: bool) -> Self {
        self.config.include_html_base64 = include_html_base64;
        self
    }

    /// Set whether HTTP response headers are added
    pub fn include_response_headers(mut self, include_response_headers: bool) -> Self {
        self.config.include_response_headers = include_response_headers;
        self
    }

    /// Replace the `<meta>` tag allow-list
    pub fn metadata_tags(mut self, metadata_tags: Vec<MetaTag>) -> Self {
        self.config.metadata_tags = metadata_tags;
        self
    }

    /// Replace the extra keyword stopwords
    pub fn keyword_stopwords(mut self, keyword_stopwords: Vec<String>) -> Self {
        self.config.keyword_stopwords = keyword_stopwords;
        self
    }

    /// Set keyword extraction tuning
    pub fn keywords(mut self, keywords: KeywordConfig) -> Self {
        self.config.keywords = keywords;
        self
    }

    /// Set the number of concurrent enrichment workers (at least one)
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.config.num_workers = num_workers.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ParserConfig {
        self.config
    }
}

impl ParserConfig {
    /// Create a new builder
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::new()
    }

    /// Whether any fulltext-derived field was requested
    pub fn wants_fulltext(&self) -> bool {
        self.include_fulltext || self.extract_fulltext_keywords
    }
}
