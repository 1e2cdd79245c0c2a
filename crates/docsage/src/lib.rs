//! docsage: document Q&A with cited sources
//!
//! Upload documents, index their chunks into a vector collection, and
//! answer questions grounded in the retrieved passages, with citations back
//! to filename and page range. Conversations and document records persist
//! in SQLite; embeddings and answer generation run against an
//! OpenAI-compatible API when a credential is configured and against
//! in-process deterministic backends otherwise.

pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::{
    chat::{Citation, Message, Role, Session},
    document::{Chunk, Document, DocumentStatus, FileType},
    request::AskRequest,
    response::{AskResponse, IngestResponse},
};
