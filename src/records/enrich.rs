//! Per-page enrichment: one website row in, one record out.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, instrument};

use super::config::ParserConfig;
use super::error::RecordsError;
use super::fulltext::parse_fulltext_fields;
use super::keywords::KeywordExtractor;
use super::metadata::extract_html_metadata;
use super::{CrawlRecord, RecordStatus};
use crate::wacz::{ArchiveReader, WaczError, WebsiteRecord, fetch_record};

/// Derives every column of a record from a website row and its capture.
///
/// Cloning is cheap; every worker holds its own clone.
#[derive(Debug, Clone)]
pub struct RecordEnricher {
    config: Arc<ParserConfig>,
    keywords: Option<Arc<KeywordExtractor>>,
}

impl RecordEnricher {
    /// Create an enricher.
    ///
    /// `keywords` must be provided for keyword columns to be filled.
    pub fn new(config: Arc<ParserConfig>, keywords: Option<Arc<KeywordExtractor>>) -> Self {
        Self { config, keywords }
    }

    /// Build the record for one website row.
    ///
    /// The capture must decode as UTF-8; a body that does not fails the row
    /// with a decode error.
    #[instrument(skip(self, reader, website), fields(url = %website.url))]
    pub fn enrich(
        &self,
        reader: &mut ArchiveReader,
        website: &WebsiteRecord,
    ) -> Result<CrawlRecord, RecordsError> {
        let capture = fetch_record(reader, &website.filename, website.offset)?;

        let html_base64 = self
            .config
            .include_html_base64
            .then(|| STANDARD.encode(&capture.payload));
        let response_headers = self
            .config
            .include_response_headers
            .then(|| capture.http_headers.clone());

        let html = String::from_utf8(capture.payload).map_err(WaczError::from)?;
        let html_metadata = extract_html_metadata(&html, &self.config.metadata_tags);
        debug!("Found {} metadata tags", html_metadata.len());

        let fulltext = parse_fulltext_fields(
            website.text.as_deref(),
            self.config.include_fulltext,
            self.config.extract_fulltext_keywords,
            self.keywords.as_deref(),
        );

        Ok(CrawlRecord {
            url: website.url.clone(),
            status: RecordStatus::Active,
            cdx_warc_filename: Some(website.filename.clone()),
            cdx_title: website.title.clone(),
            cdx_offset: Some(website.offset),
            cdx_length: website.length,
            html_metadata,
            fulltext: fulltext.fulltext,
            fulltext_keywords: fulltext.fulltext_keywords,
            html_base64,
            response_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::KeywordConfig;
    use crate::test_support::{HOME_HTML, NEWS_HTML, WaczBuilder, WarcSegment, cdx_line, sample_crawl};
    use crate::wacz::WaczClient;
    use serde_json::json;

    fn sample() -> (WaczClient, Vec<WebsiteRecord>) {
        let mut client = WaczClient::from_bytes("memory", sample_crawl()).unwrap();
        let websites = client.websites().unwrap().to_vec();
        (client, websites)
    }

    #[test]
    fn test_enrich_default_columns() {
        let (client, websites) = sample();
        let mut reader = client.reader().unwrap();
        let enricher = RecordEnricher::new(Arc::new(ParserConfig::default()), None);

        let home = enricher.enrich(&mut reader, &websites[0]).unwrap();
        assert_eq!(home.url, "https://example.com/");
        assert_eq!(home.status, RecordStatus::Active);
        assert_eq!(home.cdx_title.as_deref(), Some("Example Home"));
        assert_eq!(home.cdx_offset, Some(websites[0].offset));
        assert_eq!(home.cdx_length, websites[0].length);
        assert_eq!(home.html_metadata["og_title"], "Example Home");
        assert_eq!(home.html_metadata["og_description"], "The example homepage.");
        assert_eq!(home.html_metadata["og_site_name"], "Example");
        assert!(!home.html_metadata.contains_key("og_image"));
        assert_eq!(home.fulltext, None);
        assert_eq!(home.fulltext_keywords, None);
        assert_eq!(home.html_base64, None);
        assert_eq!(home.response_headers, None);
    }

    #[test]
    fn test_enrich_optional_columns() {
        let (client, websites) = sample();
        let mut reader = client.reader().unwrap();
        let config = ParserConfig::builder()
            .include_fulltext(true)
            .extract_fulltext_keywords(true)
            .include_html_base64(true)
            .include_response_headers(true)
            .build();
        let keywords = KeywordExtractor::new(KeywordConfig::default(), &config.keyword_stopwords).unwrap();
        let enricher = RecordEnricher::new(Arc::new(config), Some(Arc::new(keywords)));

        let home = enricher.enrich(&mut reader, &websites[0]).unwrap();
        let fulltext = home.fulltext.unwrap();
        assert!(!fulltext.contains(['\n', '\r', '\t']));
        assert!(fulltext.starts_with("Skip to Main Content Welcome to Example. The example"));
        let keywords = home.fulltext_keywords.unwrap();
        assert!(!keywords.is_empty());
        assert!(!keywords.split(',').any(|k| k == "Main Content" || k == "Skip"));
        assert_eq!(
            STANDARD.decode(home.html_base64.unwrap()).unwrap(),
            HOME_HTML.as_bytes()
        );

        let news = enricher.enrich(&mut reader, &websites[3]).unwrap();
        assert_eq!(news.fulltext, None);
        assert_eq!(news.fulltext_keywords, None);
        assert_eq!(
            STANDARD.decode(news.html_base64.unwrap()).unwrap(),
            NEWS_HTML.as_bytes()
        );
        assert!(news
            .response_headers
            .unwrap()
            .contains(&("Server".to_string(), "nginx".to_string())));
    }

    #[test]
    fn test_enrich_undecodable_body_fails() {
        let mut segment = WarcSegment::new(true);
        let (offset, length) = segment.response("https://example.com/latin1", &[], b"caf\xe9");
        let bytes = WaczBuilder::new()
            .manifest("pages/pages.jsonl", &[json!({"url": "https://example.com/latin1"})])
            .cdx(&[cdx_line("https://example.com/latin1", "text/html", "rec.warc.gz", offset, length)])
            .segment("rec.warc.gz", &segment)
            .build();
        let mut client = WaczClient::from_bytes("memory", bytes).unwrap();
        let website = client.websites().unwrap()[0].clone();
        let mut reader = client.reader().unwrap();
        let enricher = RecordEnricher::new(Arc::new(ParserConfig::default()), None);

        assert!(matches!(
            enricher.enrich(&mut reader, &website),
            Err(RecordsError::Wacz(WaczError::Decode(_)))
        ));
    }
}
