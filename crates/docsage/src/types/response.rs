//! Response bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::Citation;

/// POST /ask response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// The generated answer
    pub answer: String,
    /// Passages the answer actually drew upon
    pub citations: Vec<Citation>,
    /// Session the exchange was recorded under
    pub session_id: Uuid,
}

/// POST /ingest response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// IDs of documents indexed (or matched as duplicates) by this upload
    pub doc_ids: Vec<Uuid>,
    /// Total chunks written to the vector index
    pub chunks_indexed: usize,
    /// Number of files handled in this request
    pub files_processed: usize,
    /// Per-file failures; the rest of the batch is unaffected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IngestError>,
}

/// One failed file within an upload batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    pub filename: String,
    pub error: String,
}

/// GET /stats response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub sessions: usize,
    pub messages: usize,
    pub documents: usize,
}

/// GET /health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when all collaborators respond, `degraded` otherwise
    pub status: String,
    /// `connected` or `unavailable`
    pub database: String,
    /// `connected` or `unavailable`
    pub vector_index: String,
    pub stats: StatsResponse,
}
