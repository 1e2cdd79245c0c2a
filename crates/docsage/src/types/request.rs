//! Request bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POST /ask and /ask/stream request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Session to continue; omitted creates a new session
    #[serde(default)]
    pub session_id: Option<Uuid>,

    /// Include prior turns of the session in the prompt
    #[serde(default = "default_use_history")]
    pub use_history: bool,

    /// Number of passages to retrieve (default from config when omitted)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Override the configured re-ranking toggle
    #[serde(default)]
    pub rerank: Option<bool>,
}

fn default_use_history() -> bool {
    true
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: None,
            use_history: true,
            top_k: None,
            rerank: None,
        }
    }
}

/// POST /sessions request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Optional display title
    #[serde(default)]
    pub title: Option<String>,
}

/// Query parameters accepting a `limit`
#[derive(Debug, Clone, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query parameters for listing documents
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentListQuery {
    #[serde(default)]
    pub status: Option<String>,
}
