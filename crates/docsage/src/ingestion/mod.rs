//! Document ingestion: file parsing and chunking

mod chunker;
mod parser;

pub use chunker::{chunk_pages, ChunkDraft};
pub use parser::{content_hash, parse_file, ParsedFile};
