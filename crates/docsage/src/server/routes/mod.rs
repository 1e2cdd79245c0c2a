//! Route registration

pub mod ask;
pub mod documents;
pub mod health;
pub mod ingest;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // Health & stats
        .route("/health", get(health::health))
        .route("/stats", get(health::stats))
        // Ingestion
        .route(
            "/ingest",
            post(ingest::ingest).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // Questions
        .route("/ask", post(ask::ask))
        .route("/ask/stream", post(ask::ask_stream))
        // Sessions
        .route("/sessions", post(sessions::create_session))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/sessions/:id", delete(sessions::delete_session))
        .route("/sessions/:id/messages", get(sessions::list_messages))
        // Documents
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", get(documents::get_document))
        .route("/documents/:id", delete(documents::delete_document))
}
