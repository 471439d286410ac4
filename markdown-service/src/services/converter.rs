use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Unsupported file format '{0}'")]
    UnsupportedFormat(String),

    #[error("File is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("{0}")]
    Parse(String),
}

/// A document-to-Markdown conversion engine.
///
/// Implementations are synchronous: conversion is CPU-bound and the handler
/// moves it onto the blocking pool. The filename is advisory only — its
/// extension selects the format-specific parser.
pub trait Converter: Send + Sync {
    fn convert(&self, data: &[u8], filename: &str) -> Result<String, ConvertError>;
}

/// Extension-dispatched converter for the formats the service supports
/// in-process.
pub struct DocumentConverter;

impl DocumentConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for DocumentConverter {
    fn convert(&self, data: &[u8], filename: &str) -> Result<String, ConvertError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "md" | "markdown" | "txt" | "text" => text_to_markdown(data),
            "csv" => csv_to_markdown(data),
            "json" => json_to_markdown(data),
            "html" | "htm" => html_to_markdown(data),
            "pdf" => pdf_to_markdown(data),
            "docx" => docx_to_markdown(data),
            other => Err(ConvertError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn text_to_markdown(data: &[u8]) -> Result<String, ConvertError> {
    String::from_utf8(data.to_vec()).map_err(|_| ConvertError::InvalidEncoding)
}

/// Renders CSV as a Markdown table, first record as the header row.
fn csv_to_markdown(data: &[u8]) -> Result<String, ConvertError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ConvertError::Parse(format!("Invalid CSV: {}", e)))?;
        rows.push(record.iter().map(|f| f.replace('|', "\\|")).collect());
    }

    if rows.is_empty() {
        return Ok(String::new());
    }

    let width = rows.iter().map(|r| r.len()).max().unwrap_or(1);
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(width, String::new());
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
        if i == 0 {
            out.push('|');
            out.push_str(&" --- |".repeat(width));
            out.push('\n');
        }
    }
    Ok(out)
}

fn json_to_markdown(data: &[u8]) -> Result<String, ConvertError> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| ConvertError::Parse(format!("Invalid JSON: {}", e)))?;
    let pretty = serde_json::to_string_pretty(&value)
        .map_err(|e| ConvertError::Parse(format!("Failed to render JSON: {}", e)))?;
    Ok(format!("```json\n{}\n```\n", pretty))
}

static SCRIPT_STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h([1-6])[^>]*>").unwrap());
static BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</p>|</h[1-6]>|</div>|</tr>|<br\s*/?>").unwrap());
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li[^>]*>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn html_to_markdown(data: &[u8]) -> Result<String, ConvertError> {
    let html = text_to_markdown(data)?;

    let text = SCRIPT_STYLE_RE.replace_all(&html, "");
    let text = HEADING_RE.replace_all(&text, |caps: &regex::Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} ", "#".repeat(level))
    });
    let text = BREAK_RE.replace_all(&text, "\n\n");
    let text = LIST_ITEM_RE.replace_all(&text, "\n- ");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let text: String = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");

    Ok(format!("{}\n", text.trim()))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn pdf_to_markdown(data: &[u8]) -> Result<String, ConvertError> {
    pdf_extract::extract_text_from_mem(data)
        .map_err(|e| ConvertError::Parse(format!("Failed to extract PDF text: {}", e)))
}

static DOCX_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").unwrap());

// Hard cap on the inflated size of word/document.xml. The upload guard only
// bounds the compressed archive; without this a zip bomb expands unchecked.
const MAX_DOCUMENT_XML_BYTES: u64 = 16 * 1024 * 1024;

/// DOCX is a ZIP container; the paragraph text lives in word/document.xml.
fn docx_to_markdown(data: &[u8]) -> Result<String, ConvertError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| ConvertError::Parse(format!("Not a valid DOCX archive: {}", e)))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ConvertError::Parse(format!("DOCX is missing word/document.xml: {}", e)))?;

    let mut xml = String::new();
    entry
        .take(MAX_DOCUMENT_XML_BYTES + 1)
        .read_to_string(&mut xml)
        .map_err(|e| ConvertError::Parse(format!("Failed to read DOCX content: {}", e)))?;
    if xml.len() as u64 > MAX_DOCUMENT_XML_BYTES {
        return Err(ConvertError::Parse(format!(
            "DOCX content exceeds the {}MB decompressed limit",
            MAX_DOCUMENT_XML_BYTES / (1024 * 1024)
        )));
    }

    let mut paragraphs = Vec::new();
    for paragraph in xml.split("</w:p>") {
        let text: String = DOCX_TEXT_RE
            .captures_iter(paragraph)
            .map(|caps| decode_entities(&caps[1]))
            .collect();
        let text = text.trim();
        if !text.is_empty() {
            paragraphs.push(text.to_string());
        }
    }

    Ok(paragraphs.join("\n\n"))
}
