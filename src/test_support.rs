//! Builders for WACZ containers used by the unit tests.

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Assembles a WACZ container in memory
#[derive(Default)]
pub struct WaczBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl WaczBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_entry(mut self, path: &str, bytes: &[u8]) -> Self {
        self.entries.push((path.to_string(), bytes.to_vec()));
        self
    }

    /// Write a pages manifest with the usual header line first
    pub fn manifest(self, path: &str, rows: &[Value]) -> Self {
        let mut text = String::from(r#"{"format": "json-pages-1.0", "id": "pages", "title": "All Pages"}"#);
        text.push('\n');
        for row in rows {
            text.push_str(&row.to_string());
            text.push('\n');
        }
        self.raw_entry(path, text.as_bytes())
    }

    /// Write a gzip-compressed CDX index from raw lines
    pub fn cdx(self, lines: &[String]) -> Self {
        let text = lines.join("\n") + "\n";
        self.raw_entry("indexes/index.cdx.gz", &gzip(text.as_bytes()))
    }

    pub fn segment(self, filename: &str, segment: &WarcSegment) -> Self {
        let path = format!("archive/{}", filename);
        self.raw_entry(&path, &segment.bytes)
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, bytes) in &self.entries {
            let options = if path.starts_with("archive/") {
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
            } else {
                SimpleFileOptions::default()
            };
            writer.start_file(path.as_str(), options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

/// A WARC segment file built record by record
pub struct WarcSegment {
    gzip: bool,
    bytes: Vec<u8>,
}

impl WarcSegment {
    pub fn new(gzip: bool) -> Self {
        Self {
            gzip,
            bytes: Vec::new(),
        }
    }

    /// Append a response record; returns `(offset, length)` of the stored record
    pub fn response(&mut self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> (u64, u64) {
        let mut http = String::from("HTTP/1.1 200 OK\r\n");
        for (name, value) in headers {
            http.push_str(&format!("{}: {}\r\n", name, value));
        }
        http.push_str("\r\n");
        let mut block = http.into_bytes();
        block.extend_from_slice(body);
        self.record("response", url, "application/http; msgtype=response", &block)
    }

    /// Append an arbitrary record; returns `(offset, length)` of the stored record
    pub fn record(&mut self, kind: &str, url: &str, content_type: &str, block: &[u8]) -> (u64, u64) {
        let mut record = format!(
            "WARC/1.1\r\nWARC-Type: {}\r\nWARC-Target-URI: {}\r\nWARC-Date: 2023-09-25T17:52:24Z\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            kind,
            url,
            content_type,
            block.len()
        )
        .into_bytes();
        record.extend_from_slice(block);
        record.extend_from_slice(b"\r\n\r\n");

        let stored = if self.gzip { gzip(&record) } else { record };
        let offset = self.bytes.len() as u64;
        self.bytes.extend_from_slice(&stored);
        (offset, stored.len() as u64)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// One CDX line in the `<key> <timestamp> <json>` layout, with string-typed numbers
pub fn cdx_line(url: &str, mime: &str, filename: &str, offset: u64, length: u64) -> String {
    let payload = json!({
        "url": url,
        "mime": mime,
        "status": "200",
        "digest": "sha1:NCYTSW3H3FZCD2IXCKPCEKWDBSDYBRHR",
        "length": length.to_string(),
        "offset": offset.to_string(),
        "filename": filename,
    });
    format!("com,example)/ 20230925175224 {}", payload)
}

pub const HOME_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Example Home</title>
    <meta property="og:title" content="Example Home"/>
    <meta property="og:description" content="  The example homepage.  "/>
    <meta property="og:image" content=""/>
    <meta property="og:site_name" content="Example"/>
  </head>
  <body><p>Welcome to Example.</p></body>
</html>"#;

pub const ABOUT_OLD_HTML: &str = r#"<html><head><meta name="DC.title" content="About (old)"/></head><body>old</body></html>"#;

pub const ABOUT_HTML: &str = r#"<html>
  <head>
    <meta name="DC.title" content="About Example"/>
    <meta name="DC.creator" content="Example Staff"/>
  </head>
  <body>About us</body>
</html>"#;

pub const NEWS_HTML: &str = "<html><head><title>News</title></head><body>No news</body></html>";

pub const HOME_TEXT: &str = "Skip to Main Content\nWelcome to Example.\tThe example homepage lists example projects.\r\nExample projects are open source projects.";

/// A realistic small crawl:
///
/// - `/` captured once in a gzip segment
/// - `/about` captured twice (old and new) in the gzip segment, so it joins to two rows
/// - `/news` captured in an uncompressed segment, with no fulltext
/// - `/sitemap.xml` listed but filtered out
/// - `/missing` listed but never captured
/// - `/logo.png` captured but not html, plus one garbage CDX line
pub fn sample_crawl() -> Vec<u8> {
    let mut gz = WarcSegment::new(true);
    let html_headers = [("Content-Type", "text/html; charset=utf-8")];
    let (home_offset, home_length) = gz.response("https://example.com/", &html_headers, HOME_HTML.as_bytes());
    let (about_old_offset, about_old_length) =
        gz.response("https://example.com/about", &html_headers, ABOUT_OLD_HTML.as_bytes());
    let (about_offset, about_length) =
        gz.response("https://example.com/about", &html_headers, ABOUT_HTML.as_bytes());
    let (logo_offset, logo_length) =
        gz.response("https://example.com/logo.png", &[("Content-Type", "image/png")], b"\x89PNG");

    let mut plain = WarcSegment::new(false);
    plain.record("warcinfo", "", "application/warc-fields", b"software: test\r\n");
    let (news_offset, news_length) = plain.response(
        "https://example.com/news",
        &[("Content-Type", "text/html"), ("Server", "nginx")],
        NEWS_HTML.as_bytes(),
    );

    let gz_name = "rec-20230925175225009669-4ae3daf80a34.warc.gz";
    let plain_name = "rec-20230925175300000000-5bf4eb091b45.warc";

    WaczBuilder::new()
        .manifest(
            "pages/pages.jsonl",
            &[
                json!({"id": "1", "url": "https://example.com/", "title": "Example Home", "text": HOME_TEXT}),
                json!({"id": "2", "url": "https://example.com/sitemap.xml", "title": "Sitemap"}),
                json!({"id": "3", "url": "https://example.com/missing", "title": "Missing", "text": "gone"}),
            ],
        )
        .manifest(
            "pages/extraPages.jsonl",
            &[
                json!({"id": "4", "url": "https://example.com/about", "title": "About", "text": "About us"}),
                json!({"id": "5", "url": "https://example.com/news", "title": "News"}),
                json!({"id": "6", "url": "https://example.com/sitemap.html", "title": "Sitemap"}),
            ],
        )
        .cdx(&[
            cdx_line("https://example.com/", "text/html", gz_name, home_offset, home_length),
            cdx_line("https://example.com/about", "text/html", gz_name, about_old_offset, about_old_length),
            cdx_line("https://example.com/about", "text/html", gz_name, about_offset, about_length),
            cdx_line("https://example.com/logo.png", "image/png", gz_name, logo_offset, logo_length),
            "garbage-line-without-json".to_string(),
            cdx_line("https://example.com/news", "text/html", plain_name, news_offset, news_length),
        ])
        .segment(gz_name, &gz)
        .segment(plain_name, &plain)
        .build()
}
