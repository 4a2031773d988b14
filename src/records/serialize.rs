//! Output serializers for a [`RecordSet`].
//!
//! The format follows the output file extension, case-insensitively:
//! `xml`, `jsonl`, `tsv` or `csv`.

use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;
use tracing::{info, instrument};

use super::RecordSet;
use super::error::RecordsError;
use crate::transport;

/// A supported output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `<records><record><column>value</column>...</record></records>`
    Xml,
    /// One JSON object per line
    Jsonl,
    /// Tab-separated with a header row
    Tsv,
    /// Comma-separated with a header row
    Csv,
}

impl OutputFormat {
    /// Pick a format from a file path or URI by its extension
    pub fn from_path(path: &str) -> Result<Self, RecordsError> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "tsv" => Ok(OutputFormat::Tsv),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(RecordsError::UnsupportedFormat(path.to_string())),
        }
    }
}

/// Text of a cell in XML: null becomes `None`, strings are written bare
fn xml_text(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text of a cell in CSV/TSV: null becomes an empty field
fn delimited_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quote_field(field: &str, delimiter: char) -> String {
    if field.contains([delimiter, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl RecordSet {
    /// Render as an XML document
    pub fn to_xml(&self) -> Result<Vec<u8>, RecordsError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("records")))?;

        for row in self.rows() {
            writer.write_event(Event::Start(BytesStart::new("record")))?;
            for (column, value) in &row {
                writer.write_event(Event::Start(BytesStart::new(column.as_str())))?;
                writer.write_event(Event::Text(BytesText::new(&xml_text(value))))?;
                writer.write_event(Event::End(BytesEnd::new(column.as_str())))?;
            }
            writer.write_event(Event::End(BytesEnd::new("record")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("records")))?;
        Ok(writer.into_inner())
    }

    /// Render as JSON Lines; nulls stay null
    pub fn to_jsonl(&self) -> Result<String, RecordsError> {
        let mut out = String::new();
        for row in self.rows() {
            out.push_str(&serde_json::to_string(&row)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Render as delimited text with a header row
    pub fn to_delimited(&self, delimiter: char) -> String {
        let separator = delimiter.to_string();
        let mut out = self
            .columns()
            .iter()
            .map(|column| quote_field(column, delimiter))
            .collect::<Vec<_>>()
            .join(separator.as_str());
        out.push('\n');

        for row in self.rows() {
            let line = row
                .values()
                .map(|value| quote_field(&delimited_text(value), delimiter))
                .collect::<Vec<_>>()
                .join(separator.as_str());
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Render in the given format
    pub fn render(&self, format: OutputFormat) -> Result<Vec<u8>, RecordsError> {
        match format {
            OutputFormat::Xml => self.to_xml(),
            OutputFormat::Jsonl => Ok(self.to_jsonl()?.into_bytes()),
            OutputFormat::Tsv => Ok(self.to_delimited('\t').into_bytes()),
            OutputFormat::Csv => Ok(self.to_delimited(',').into_bytes()),
        }
    }

    /// Write to a file, choosing the format from its extension.
    ///
    /// Fails with [`RecordsError::UnsupportedFormat`] before anything is
    /// written when the extension is not recognized.
    #[instrument(skip(self))]
    pub async fn write(&self, output_file: &str) -> Result<(), RecordsError> {
        let format = OutputFormat::from_path(output_file)?;
        let bytes = self.render(format)?;
        transport::write_bytes(output_file, &bytes).await?;
        info!(
            "Wrote {} records as {:?} to {}",
            self.len(),
            format,
            output_file
        );
        Ok(())
    }
}
