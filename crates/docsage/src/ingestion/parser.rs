//! File parsing: extract page-attributed plain text from uploads
//!
//! Supports PDF (page-aware), markdown, and plain text. Parse failures are
//! attributable to the one file and never abort the rest of an upload batch.

use pulldown_cmark::{Event, Parser as MarkdownParser};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::FileType;

/// A parsed upload: normalized text per page plus identity metadata
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// File type detected from the filename
    pub file_type: FileType,
    /// (page_number, text) in page order, 1-indexed; empty pages are kept out
    pub pages: Vec<(u32, String)>,
    /// Hex-encoded SHA-256 of the raw bytes, used for deduplication
    pub content_hash: String,
}

impl ParsedFile {
    /// Whole-document text, for re-rank scoring and tests
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Hex-encoded SHA-256 of a byte buffer
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Parse an uploaded file into page-attributed text.
///
/// Returns `Error::DocumentProcessing` naming the file on unreadable or
/// unsupported content.
pub fn parse_file(filename: &str, data: &[u8]) -> Result<ParsedFile> {
    let file_type = FileType::from_filename(filename);
    let hash = content_hash(data);

    let pages = match file_type {
        FileType::Pdf => parse_pdf(filename, data)?,
        FileType::Markdown => {
            let text = utf8_text(filename, data, true)?;
            single_page(markdown_to_text(&text))
        }
        FileType::Text => {
            let text = utf8_text(filename, data, true)?;
            single_page(text)
        }
        // No recognized extension: accept valid UTF-8, reject binary blobs
        FileType::Unknown => {
            let text = utf8_text(filename, data, false)?;
            single_page(text)
        }
    };

    Ok(ParsedFile {
        file_type,
        pages,
        content_hash: hash,
    })
}

fn single_page(text: String) -> Vec<(u32, String)> {
    let normalized = normalize_text(&text);
    if normalized.is_empty() {
        Vec::new()
    } else {
        vec![(1, normalized)]
    }
}

fn utf8_text(filename: &str, data: &[u8], lossy: bool) -> Result<String> {
    if lossy {
        return Ok(String::from_utf8_lossy(data).into_owned());
    }
    String::from_utf8(data.to_vec())
        .map_err(|_| Error::document(filename, "binary content with no recognized format"))
}

/// Extract text page by page from a PDF
fn parse_pdf(filename: &str, data: &[u8]) -> Result<Vec<(u32, String)>> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::document(filename, format!("unreadable PDF: {}", e)))?;

    let page_count = doc.get_pages().len() as u32;
    let mut pages = Vec::with_capacity(page_count as usize);

    for page_number in 1..=page_count {
        let text = doc
            .extract_text(&[page_number])
            .map_err(|e| Error::document(filename, format!("page {}: {}", page_number, e)))?;
        let normalized = normalize_text(&text);
        if !normalized.is_empty() {
            pages.push((page_number, normalized));
        }
    }

    Ok(pages)
}

/// Flatten markdown to plain text by walking parser events
fn markdown_to_text(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for event in MarkdownParser::new(source) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(_) => out.push(' '),
            _ => {}
        }
    }
    out
}

/// Collapse whitespace runs and trim, matching the indexed form of the text
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}
