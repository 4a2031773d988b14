//! WARC record framing.
//!
//! A CDX offset points at the first byte of a record inside a segment file.
//! The record may be a standalone gzip member (`.warc.gz`) or plain bytes
//! (`.warc`); either way its own `Content-Length` header says where it ends,
//! so the size of the surrounding zip entry is irrelevant.

use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, MultiGzDecoder, ZlibDecoder};
use tracing::debug;

use super::error::WaczError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type Result<T> = std::result::Result<T, WaczError>;

/// One logical WARC record with its HTTP payload decoded
#[derive(Debug, Clone, PartialEq)]
pub struct WarcRecord {
    /// WARC header fields in file order
    pub warc_headers: Vec<(String, String)>,

    /// HTTP status code, for records carrying an HTTP message
    pub http_status: Option<u16>,

    /// HTTP header fields in file order
    pub http_headers: Vec<(String, String)>,

    /// HTTP body for HTTP records, otherwise the whole record block
    pub payload: Vec<u8>,
}

impl WarcRecord {
    /// Look up a WARC header, case-insensitively
    pub fn warc_header(&self, name: &str) -> Option<&str> {
        find_header(&self.warc_headers, name)
    }

    /// Look up an HTTP header, case-insensitively
    pub fn http_header(&self, name: &str) -> Option<&str> {
        find_header(&self.http_headers, name)
    }

    /// The `WARC-Type` of the record
    pub fn record_type(&self) -> Option<&str> {
        self.warc_header("WARC-Type")
    }

    /// The `WARC-Target-URI` of the record
    pub fn target_uri(&self) -> Option<&str> {
        self.warc_header("WARC-Target-URI")
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Read exactly one record starting at `offset` in a segment file
pub fn read_record(segment: &[u8], offset: u64) -> Result<WarcRecord> {
    let start = usize::try_from(offset)
        .ok()
        .filter(|start| *start < segment.len())
        .ok_or_else(|| {
            WaczError::Warc(format!(
                "offset {} is outside a segment of {} bytes",
                offset,
                segment.len()
            ))
        })?;
    let data = &segment[start..];

    if data.starts_with(&GZIP_MAGIC) {
        // GzDecoder stops at the end of the first member, which is one record
        let mut record = Vec::new();
        GzDecoder::new(data).read_to_end(&mut record)?;
        parse_record(&record)
    } else {
        parse_record(data)
    }
}

/// Parse a record from the start of `data`; trailing bytes are ignored
pub fn parse_record(data: &[u8]) -> Result<WarcRecord> {
    let (head, rest) = split_head(data)
        .ok_or_else(|| WaczError::Warc("record header is not terminated".to_string()))?;
    let head = String::from_utf8_lossy(head);
    let mut lines = head.lines();

    let version = lines.next().unwrap_or_default().trim();
    if !version.starts_with("WARC/") {
        return Err(WaczError::Warc(format!(
            "expected WARC version line, found '{}'",
            version
        )));
    }
    let warc_headers = parse_header_lines(lines);

    let content_length = find_header(&warc_headers, "Content-Length")
        .ok_or_else(|| WaczError::Warc("record has no Content-Length".to_string()))?
        .trim()
        .parse::<usize>()
        .map_err(|e| WaczError::Warc(format!("invalid Content-Length: {}", e)))?;
    if rest.len() < content_length {
        return Err(WaczError::Warc(format!(
            "record block truncated: expected {} bytes, found {}",
            content_length,
            rest.len()
        )));
    }
    let block = &rest[..content_length];

    let carries_http = matches!(
        find_header(&warc_headers, "WARC-Type"),
        Some("response" | "request" | "revisit")
    ) && find_header(&warc_headers, "Content-Type")
        .is_some_and(|ct| ct.trim_start().starts_with("application/http"));

    if !carries_http || block.is_empty() {
        return Ok(WarcRecord {
            warc_headers,
            http_status: None,
            http_headers: Vec::new(),
            payload: block.to_vec(),
        });
    }

    let (http_head, body) = split_head(block)
        .ok_or_else(|| WaczError::Warc("HTTP header block is not terminated".to_string()))?;
    let http_head = String::from_utf8_lossy(http_head);
    let mut http_lines = http_head.lines();
    let status_line = http_lines.next().unwrap_or_default();
    let http_status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok());
    let http_headers = parse_header_lines(http_lines);
    let payload = decode_body(&http_headers, body);

    Ok(WarcRecord {
        warc_headers,
        http_status,
        http_headers,
        payload,
    })
}

/// Split at the first blank line, accepting CRLF or bare LF line endings
fn split_head(data: &[u8]) -> Option<(&[u8], &[u8])> {
    // A bare LF blank line only counts when it comes before the first CRLF one
    let (end, sep) = match find(data, b"\r\n\r\n") {
        Some(crlf) => find(&data[..crlf], b"\n\n").map_or((crlf, 4), |lf| (lf, 2)),
        None => (find(data, b"\n\n")?, 2),
    };
    Some((&data[..end], &data[end + sep..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Undo transfer and content encodings, keeping the raw body if either fails
fn decode_body(headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut payload = body.to_vec();

    let chunked = find_header(headers, "Transfer-Encoding")
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    if chunked {
        match dechunk(&payload) {
            Some(dechunked) => payload = dechunked,
            None => debug!("Body declared chunked but is not; keeping raw bytes"),
        }
    }

    if let Some(encoding) = find_header(headers, "Content-Encoding") {
        let encoding = encoding.trim().to_ascii_lowercase();
        match inflate(&encoding, &payload) {
            Some(inflated) => payload = inflated,
            None => debug!("Could not decode '{}' body; keeping raw bytes", encoding),
        }
    }

    payload
}

fn dechunk(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut pos = 0;

    loop {
        let line_end = pos + find(&body[pos..], b"\r\n")?;
        let size_line = std::str::from_utf8(&body[pos..line_end]).ok()?;
        let size_hex = size_line.split(';').next()?.trim();
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        pos = line_end + 2;

        if size == 0 {
            return Some(out);
        }
        let chunk_end = pos.checked_add(size)?;
        if chunk_end > body.len() {
            return None;
        }
        out.extend_from_slice(&body[pos..chunk_end]);
        pos = chunk_end;
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        }
    }
}

fn inflate(encoding: &str, body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match encoding {
        "gzip" | "x-gzip" => MultiGzDecoder::new(body).read_to_end(&mut out).ok()?,
        "deflate" => {
            // Servers disagree on whether "deflate" carries a zlib wrapper
            if ZlibDecoder::new(body).read_to_end(&mut out).is_err() {
                out.clear();
                DeflateDecoder::new(body).read_to_end(&mut out).ok()?;
            }
            out.len()
        }
        "identity" | "" => return Some(body.to_vec()),
        _ => return None,
    };
    Some(out)
}
