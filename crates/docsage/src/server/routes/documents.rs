//! Document management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::request::DocumentListQuery;
use crate::types::{Document, DocumentStatus};

/// GET /documents?status=
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<Vec<Document>>> {
    let status = match query.status.as_deref() {
        Some(tag) => Some(
            DocumentStatus::parse(tag)
                .ok_or_else(|| Error::validation(format!("unknown status filter: {}", tag)))?,
        ),
        None => None,
    };
    Ok(Json(state.store().list_documents(status)?))
}

/// GET /documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>> {
    Ok(Json(state.store().get_document(id)?))
}

/// DELETE /documents/:id
///
/// Removes the document's vectors from the index before deleting the row,
/// so no orphaned chunks survive the document.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    // Verify existence first so a missing id is a 404, not a silent no-op.
    state.store().get_document(id)?;

    let deleted_vectors = state
        .index()
        .delete_by_document(state.collection(), id)
        .await?;

    let doc = state.store().delete_document(id)?;

    tracing::info!(
        "deleted document '{}' and {} vectors",
        doc.filename,
        deleted_vectors
    );

    Ok(Json(serde_json::json!({
        "status": "deleted",
        "doc_id": id,
        "filename": doc.filename,
        "deleted_vectors": deleted_vectors,
    })))
}
