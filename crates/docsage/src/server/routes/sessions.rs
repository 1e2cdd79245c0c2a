//! Session management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::request::LimitQuery;
use crate::types::{CreateSessionRequest, Message, Session};

const DEFAULT_SESSION_LIMIT: usize = 50;
const MAX_SESSION_LIMIT: usize = 100;
const DEFAULT_MESSAGE_LIMIT: usize = 100;
const MAX_MESSAGE_LIMIT: usize = 500;

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<Session>> {
    let session = state.store().create_session(request.title.as_deref())?;
    tracing::info!(session = %session.id, "created session");
    Ok(Json(session))
}

/// GET /sessions?limit=
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Session>>> {
    let limit = clamp_limit(query.limit, DEFAULT_SESSION_LIMIT, MAX_SESSION_LIMIT);
    Ok(Json(state.store().list_sessions(limit)?))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>> {
    Ok(Json(state.store().get_session(id)?))
}

/// DELETE /sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    state.store().delete_session(id)?;
    tracing::info!(session = %id, "deleted session");
    Ok(Json(serde_json::json!({
        "status": "deleted",
        "session_id": id,
    })))
}

/// GET /sessions/:id/messages?limit=
///
/// An unknown or deleted session lists as empty rather than erroring.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Message>>> {
    let limit = clamp_limit(query.limit, DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT);
    Ok(Json(state.store().list_messages(id, limit)?))
}

fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}
