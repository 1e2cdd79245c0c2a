//! Document and chunk types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Markdown file
    Markdown,
    /// Plain text file
    Text,
    /// Unrecognized extension, treated as text when valid UTF-8
    Unknown,
}

impl FileType {
    /// Detect file type from a filename's extension
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Short tag stored in the database and returned over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the stored tag back
    pub fn from_str_tag(tag: &str) -> Self {
        match tag {
            "pdf" => Self::Pdf,
            "markdown" => Self::Markdown,
            "text" => Self::Text,
            _ => Self::Unknown,
        }
    }
}

/// Processing status of an uploaded document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Upload accepted, chunks not yet fully indexed
    Processing,
    /// All chunks embedded and written to the vector index
    Completed,
    /// Chunking or embedding failed; no usable chunks indexed
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the stored tag; unknown tags are an error at the call site
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// An uploaded file tracked by the conversation store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded
    pub filename: String,
    /// File size in bytes
    pub file_size: u64,
    /// File type tag
    pub file_type: FileType,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Number of chunks indexed for this document
    pub chunk_count: u32,
    /// Processing status
    pub status: DocumentStatus,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A contiguous span of a document's text, the unit of retrieval.
///
/// Immutable once created; lives as a vector-index record plus the
/// text/metadata needed to reconstruct a citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk ID, unique within the collection (`{document_id}-{position}`)
    pub id: String,
    /// Parent document ID
    pub document_id: Uuid,
    /// Raw text
    pub text: String,
    /// Source filename (for citations)
    pub filename: String,
    /// First page covered by this chunk (1-indexed)
    pub page_start: u32,
    /// Last page covered by this chunk (1-indexed)
    pub page_end: u32,
    /// Ordinal position within the document
    pub position: u32,
}

impl Chunk {
    /// Create a chunk for a document
    pub fn new(
        document_id: Uuid,
        filename: &str,
        text: String,
        page_start: u32,
        page_end: u32,
        position: u32,
    ) -> Self {
        Self {
            id: format!("{}-{}", document_id.simple(), position),
            document_id,
            text,
            filename: filename.to_string(),
            page_start,
            page_end,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_detection() {
        assert_eq!(FileType::from_filename("report.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("notes.md"), FileType::Markdown);
        assert_eq!(FileType::from_filename("readme.txt"), FileType::Text);
        assert_eq!(FileType::from_filename("archive.zip"), FileType::Unknown);
    }

    #[test]
    fn chunk_id_is_scoped_to_document() {
        let doc_id = Uuid::new_v4();
        let a = Chunk::new(doc_id, "a.txt", "x".into(), 1, 1, 0);
        let b = Chunk::new(doc_id, "a.txt", "y".into(), 1, 1, 1);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with(&doc_id.simple().to_string()));
    }

    #[test]
    fn status_round_trip() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("bogus"), None);
    }
}
