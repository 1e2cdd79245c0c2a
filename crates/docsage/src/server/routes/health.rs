//! Health and stats endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{HealthResponse, StatsResponse};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let database_ok = state.store().health_check();
    let index_ok = state.index().health_check().await;

    let stats = state.store().stats().unwrap_or(StatsResponse {
        sessions: 0,
        messages: 0,
        documents: 0,
    });

    let status = if database_ok && index_ok { "ok" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        database: connectivity(database_ok),
        vector_index: connectivity(index_ok),
        stats,
    }))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    Ok(Json(state.store().stats()?))
}

fn connectivity(ok: bool) -> String {
    if ok { "connected" } else { "unavailable" }.to_string()
}
