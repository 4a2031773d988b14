//! Session-scoped access to one WACZ archive.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use super::archive::{ArchiveHandle, ArchiveReader};
use super::cdx::{CdxEntry, load_index};
use super::error::WaczError;
use super::pages::{PageEntry, load_manifest};
use super::warc::{WarcRecord, read_record};
use crate::transport;

/// Directory holding the WARC segment files
pub const WARC_DIR: &str = "archive";

type Result<T> = std::result::Result<T, WaczError>;

/// A crawled HTML page joined with the capture that holds it
#[derive(Debug, Clone, PartialEq)]
pub struct WebsiteRecord {
    /// URL of the page
    pub url: String,

    /// Title from the page manifest
    pub title: Option<String>,

    /// Text from the page manifest
    pub text: Option<String>,

    /// Mimetype from the CDX index
    pub mime: String,

    /// HTTP status from the CDX index
    pub status: Option<String>,

    /// Payload digest from the CDX index
    pub digest: Option<String>,

    /// Stored record length
    pub length: Option<u64>,

    /// Byte position of the record in its segment file
    pub offset: u64,

    /// Segment file name under `archive/`
    pub filename: String,
}

/// Either decoded text or raw bytes of a captured body
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// UTF-8 decoded body
    Text(String),

    /// Undecoded body
    Bytes(Vec<u8>),
}

impl Content {
    /// Borrow the body as bytes regardless of decoding
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Bytes(bytes) => bytes,
        }
    }

    /// Take the decoded text, if this is text
    pub fn into_text(self) -> Option<String> {
        match self {
            Content::Text(text) => Some(text),
            Content::Bytes(_) => None,
        }
    }
}

/// Left-join manifest pages to HTML captures on URL.
///
/// Every matching capture yields a row, so a page captured twice appears
/// twice. Pages without a capture that names a segment file and offset are
/// dropped.
pub fn join_websites(pages: &[PageEntry], captures: &[CdxEntry]) -> Vec<WebsiteRecord> {
    // Captures per URL, in index order
    let mut by_url: HashMap<&str, Vec<&CdxEntry>> = HashMap::new();
    for capture in captures.iter().filter(|c| c.is_html()) {
        by_url.entry(capture.url.as_str()).or_default().push(capture);
    }

    let mut websites = Vec::new();
    for page in pages {
        let Some(matching) = by_url.get(page.url.as_str()) else {
            continue;
        };
        for capture in matching {
            let (Some(filename), Some(offset)) = (&capture.filename, capture.offset) else {
                continue;
            };
            websites.push(WebsiteRecord {
                url: page.url.clone(),
                title: page.title.clone(),
                text: page.text.clone(),
                mime: capture.mime.clone().unwrap_or_default(),
                status: capture.status.clone(),
                digest: capture.digest.clone(),
                length: capture.length,
                offset,
                filename: filename.clone(),
            });
        }
    }
    websites
}

/// Client for reading pages and captures out of a WACZ archive.
///
/// The website table is built on first use and cached for the life of the
/// client. Closing the client closes the archive; later reads fail with
/// [`WaczError::ClosedArchive`].
#[derive(Debug)]
pub struct WaczClient {
    handle: ArchiveHandle,
    websites: Option<Vec<WebsiteRecord>>,
}

impl WaczClient {
    /// Fetch an archive from a local path or remote URI and open it
    #[instrument]
    pub async fn open(uri: &str) -> Result<Self> {
        let bytes = transport::read_bytes(uri).await?;
        info!("Loaded WACZ archive {} ({} bytes)", uri, bytes.len());
        Self::from_bytes(uri, bytes)
    }

    /// Open an archive already held in memory
    pub fn from_bytes(source: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        Ok(Self {
            handle: ArchiveHandle::from_bytes(source, bytes)?,
            websites: None,
        })
    }

    /// The underlying archive handle
    pub fn handle(&mut self) -> &mut ArchiveHandle {
        &mut self.handle
    }

    /// A reader sharing this session, for use off the current thread
    pub fn reader(&self) -> Result<ArchiveReader> {
        self.handle.reader()
    }

    /// Close the archive; safe to call more than once
    pub fn close(&mut self) {
        self.handle.close();
    }

    /// HTML pages present in the crawl, in manifest order
    pub fn websites(&mut self) -> Result<&[WebsiteRecord]> {
        if self.websites.is_none() {
            let pages = load_manifest(&mut self.handle)?;
            let captures = load_index(&mut self.handle)?;
            let websites = join_websites(&pages, &captures);
            info!(
                "Built website table: {} rows from {} pages and {} HTML captures",
                websites.len(),
                pages.len(),
                captures.len()
            );
            self.websites = Some(websites);
        }
        Ok(self.websites.as_deref().unwrap_or_default())
    }

    /// Read the WARC record for a capture
    pub fn get_record(&mut self, filename: &str, offset: u64) -> Result<WarcRecord> {
        let mut reader = self.handle.reader()?;
        fetch_record(&mut reader, filename, offset)
    }

    /// Extract a captured body by segment file and offset
    pub fn get_content(&mut self, filename: &str, offset: u64, decode: bool) -> Result<Content> {
        let record = self.get_record(filename, offset)?;
        into_content(record.payload, decode)
    }

    /// HTTP response headers captured alongside a body
    pub fn get_response_headers(
        &mut self,
        filename: &str,
        offset: u64,
    ) -> Result<Vec<(String, String)>> {
        Ok(self.get_record(filename, offset)?.http_headers)
    }

    /// Extract a captured body by URL.
    ///
    /// Slower than [`WaczClient::get_content`] because the website table has to
    /// be searched first. The URL must match exactly one row.
    pub fn get_content_by_url(&mut self, url: &str, decode: bool) -> Result<Content> {
        let matches: Vec<(String, u64)> = self
            .websites()?
            .iter()
            .filter(|w| w.url == url)
            .map(|w| (w.filename.clone(), w.offset))
            .collect();

        match matches.as_slice() {
            [(filename, offset)] => self.get_content(filename, *offset, decode),
            _ => Err(WaczError::AmbiguousOrMissingUrl {
                url: url.to_string(),
                matches: matches.len(),
            }),
        }
    }
}

/// Read one record through a reader; shared by the client and workers
pub(crate) fn fetch_record(
    reader: &mut ArchiveReader,
    filename: &str,
    offset: u64,
) -> Result<WarcRecord> {
    let path = format!("{}/{}", WARC_DIR, filename);
    let segment = reader.entry(&path)?;
    debug!("Reading record at {}:{}", path, offset);
    read_record(&segment, offset)
}

fn into_content(payload: Vec<u8>, decode: bool) -> Result<Content> {
    if decode {
        Ok(Content::Text(String::from_utf8(payload)?))
    } else {
        Ok(Content::Bytes(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ABOUT_HTML, HOME_HTML, NEWS_HTML, WaczBuilder, WarcSegment, cdx_line, sample_crawl};
    use serde_json::json;

    fn sample_client() -> WaczClient {
        WaczClient::from_bytes("memory", sample_crawl()).unwrap()
    }

    #[test]
    fn test_websites_join() {
        let mut client = sample_client();
        let websites = client.websites().unwrap();
        let urls: Vec<&str> = websites.iter().map(|w| w.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://example.com/",
                "https://example.com/about",
                "https://example.com/about",
                "https://example.com/news",
            ]
        );
        for website in websites {
            assert_eq!(website.mime, "text/html");
            assert!(!website.filename.is_empty());
        }
        assert_eq!(websites[0].title.as_deref(), Some("Example Home"));
        assert!(websites[3].text.is_none());
        assert!(websites[1].offset < websites[2].offset);
    }

    #[test]
    fn test_join_drops_unresolved_and_non_html() {
        let pages = vec![
            PageEntry {
                url: "https://a.test/".to_string(),
                title: None,
                text: None,
            },
            PageEntry {
                url: "https://b.test/".to_string(),
                title: None,
                text: None,
            },
        ];
        let captures = vec![
            CdxEntry {
                url: "https://a.test/".to_string(),
                mime: Some("text/html".to_string()),
                status: None,
                digest: None,
                length: None,
                offset: Some(10),
                filename: None,
            },
            CdxEntry {
                url: "https://b.test/".to_string(),
                mime: Some("application/pdf".to_string()),
                status: None,
                digest: None,
                length: None,
                offset: Some(10),
                filename: Some("rec.warc.gz".to_string()),
            },
        ];

        assert!(join_websites(&pages, &captures).is_empty());
    }

    #[test]
    fn test_join_many_pages_keeps_page_then_index_order() {
        let page_count = 2000;
        let pages: Vec<PageEntry> = (0..page_count)
            .map(|i| PageEntry {
                url: format!("https://example.com/page/{}", i),
                title: None,
                text: None,
            })
            .collect();

        // Two captures per page, interleaved so later pages come first in the index
        let mut captures = Vec::new();
        for round in 0..2u64 {
            for i in (0..page_count).rev() {
                captures.push(CdxEntry {
                    url: format!("https://example.com/page/{}", i),
                    mime: Some("text/html".to_string()),
                    status: None,
                    digest: None,
                    length: None,
                    offset: Some(round * 100_000 + i as u64),
                    filename: Some("rec.warc.gz".to_string()),
                });
            }
        }

        let websites = join_websites(&pages, &captures);
        assert_eq!(websites.len(), page_count * 2);
        assert_eq!(websites[0].url, "https://example.com/page/0");
        assert_eq!(websites[0].offset, 0);
        assert_eq!(websites[1].url, "https://example.com/page/0");
        assert_eq!(websites[1].offset, 100_000);
        let last = &websites[page_count * 2 - 1];
        assert_eq!(last.url, format!("https://example.com/page/{}", page_count - 1));
        assert_eq!(last.offset, 100_000 + page_count as u64 - 1);
    }

    #[test]
    fn test_get_content() {
        let mut client = sample_client();
        let news = client.websites().unwrap()[3].clone();

        let text = client
            .get_content(&news.filename, news.offset, true)
            .unwrap()
            .into_text()
            .unwrap();
        assert_eq!(text, NEWS_HTML);

        let raw = client.get_content(&news.filename, news.offset, false).unwrap();
        assert_eq!(raw, Content::Bytes(NEWS_HTML.as_bytes().to_vec()));

        let headers = client
            .get_response_headers(&news.filename, news.offset)
            .unwrap();
        assert!(headers.contains(&("Server".to_string(), "nginx".to_string())));
    }

    #[test]
    fn test_get_content_by_url() {
        let mut client = sample_client();
        let content = client
            .get_content_by_url("https://example.com/", true)
            .unwrap();
        assert_eq!(content.into_text().unwrap(), HOME_HTML);

        match client.get_content_by_url("http://not.present.in.crawl", true) {
            Err(WaczError::AmbiguousOrMissingUrl { matches: 0, .. }) => (),
            other => panic!("Expected AmbiguousOrMissingUrl, got {:?}", other),
        }

        // captured twice, so the URL alone does not identify one record
        match client.get_content_by_url("https://example.com/about", true) {
            Err(WaczError::AmbiguousOrMissingUrl { matches: 2, .. }) => (),
            other => panic!("Expected AmbiguousOrMissingUrl, got {:?}", other),
        }

        let about = client.websites().unwrap()[2].clone();
        let content = client.get_content(&about.filename, about.offset, true).unwrap();
        assert_eq!(content.into_text().unwrap(), ABOUT_HTML);
    }

    #[test]
    fn test_decode_failure_propagates() {
        let mut segment = WarcSegment::new(true);
        let (offset, length) = segment.response("https://example.com/latin1", &[], b"caf\xe9");
        let bytes = WaczBuilder::new()
            .manifest("pages/pages.jsonl", &[json!({"url": "https://example.com/latin1"})])
            .cdx(&[cdx_line("https://example.com/latin1", "text/html", "rec.warc.gz", offset, length)])
            .segment("rec.warc.gz", &segment)
            .build();
        let mut client = WaczClient::from_bytes("memory", bytes).unwrap();

        assert!(matches!(
            client.get_content_by_url("https://example.com/latin1", true),
            Err(WaczError::Decode(_))
        ));
        assert_eq!(
            client
                .get_content_by_url("https://example.com/latin1", false)
                .unwrap()
                .as_bytes(),
            b"caf\xe9"
        );
    }

    #[test]
    fn test_missing_segment_file() {
        let mut client = sample_client();
        assert!(matches!(
            client.get_content("rec-does-not-exist.warc.gz", 0, true),
            Err(WaczError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_closed_client() {
        let mut client = sample_client();
        client.close();
        assert!(matches!(client.websites(), Err(WaczError::ClosedArchive)));
        client.close();
    }

    #[tokio::test]
    async fn test_open_local_and_remote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("homepage.wacz");
        std::fs::write(&path, sample_crawl()).unwrap();

        let mut local = WaczClient::open(path.to_str().unwrap()).await.unwrap();
        assert_eq!(local.websites().unwrap().len(), 4);

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/crawls/homepage.wacz")
            .with_status(200)
            .with_body(sample_crawl())
            .create_async()
            .await;
        let uri = format!("{}/crawls/homepage.wacz", server.url());
        let mut remote = WaczClient::open(&uri).await.unwrap();
        assert_eq!(remote.websites().unwrap().len(), 4);

        let missing = WaczClient::open(dir.path().join("nope.wacz").to_str().unwrap()).await;
        assert!(matches!(missing, Err(WaczError::Transport(_))));
    }
}
