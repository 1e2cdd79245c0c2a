//! Error types for the document Q&A service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for docsage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single file could not be parsed or chunked; isolated per document
    #[error("Failed to process '{filename}': {message}")]
    DocumentProcessing { filename: String, message: String },

    /// Embedding or generation service unreachable (retryable)
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Vector index unreachable (callers may degrade to "no context")
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Vector dimensionality does not match the existing collection (fatal, not retryable)
    #[error("Dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Unknown session or document id
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed request body or parameters
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a document processing error attributable to one file
    pub fn document(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentProcessing {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for a session id
    pub fn session_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "Session",
            id: id.to_string(),
        }
    }

    /// Create a not-found error for a document id
    pub fn document_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "Document",
            id: id.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for transient conditions worth retrying with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::IndexUnavailable(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::DocumentProcessing { filename, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "document_processing_error",
                format!("Failed to process '{}': {}", filename, message),
            ),
            Error::BackendUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "backend_unavailable",
                msg.clone(),
            ),
            Error::IndexUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "index_unavailable",
                msg.clone(),
            ),
            Error::DimensionMismatch { expected, actual } => (
                StatusCode::CONFLICT,
                "dimension_mismatch",
                format!("collection expects {} dimensions, got {}", expected, actual),
            ),
            Error::NotFound { kind, id } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found: {}", kind, id),
            ),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg.clone()),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
