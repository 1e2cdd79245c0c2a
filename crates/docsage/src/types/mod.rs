//! Shared data types: documents, chunks, conversations, and wire DTOs

pub mod chat;
pub mod document;
pub mod request;
pub mod response;

pub use chat::{Citation, Message, Role, Session};
pub use document::{Chunk, Document, DocumentStatus, FileType};
pub use request::{AskRequest, CreateSessionRequest};
pub use response::{AskResponse, HealthResponse, IngestResponse, StatsResponse};
