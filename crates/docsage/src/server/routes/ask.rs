//! Question endpoints: /ask and /ask/stream

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::Response,
    Json,
};
use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{Error, Result};
use crate::retrieval::Passage;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse};

/// POST /ask
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let question = validate_question(&request)?;

    let passages = retrieve_degraded(&state, question, &request).await?;

    let answer = state
        .synthesizer()
        .answer(question, &passages, request.session_id, request.use_history)
        .await?;

    tracing::info!(
        session = %answer.session_id,
        citations = answer.citations.len(),
        "answered question"
    );

    Ok(Json(AskResponse {
        answer: answer.text,
        citations: answer.citations,
        session_id: answer.session_id,
    }))
}

/// POST /ask/stream
///
/// Same request shape as /ask; the response body is the answer text flushed
/// incrementally as it is generated. Dropping the connection stops the
/// producer.
pub async fn ask_stream(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Response> {
    let question = validate_question(&request)?;

    let passages = retrieve_degraded(&state, question, &request).await?;

    let (session_id, receiver) = state
        .synthesizer()
        .answer_stream(question, &passages, request.session_id, request.use_history)
        .await?;

    tracing::info!(session = %session_id, "streaming answer");

    let body = Body::from_stream(
        ReceiverStream::new(receiver).map(|fragment| fragment.map(axum::body::Bytes::from)),
    );

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header("x-session-id", session_id.to_string())
        .body(body)
        .map_err(|e| Error::Internal(format!("failed to build stream response: {}", e)))
}

fn validate_question(request: &AskRequest) -> Result<&str> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(Error::validation("question must not be empty"));
    }
    Ok(question)
}

/// Retrieve passages, degrading an unreachable index to "no context found"
/// instead of failing the whole request.
async fn retrieve_degraded(
    state: &AppState,
    question: &str,
    request: &AskRequest,
) -> Result<Vec<Passage>> {
    match state
        .retriever()
        .retrieve(question, request.top_k, request.rerank)
        .await
    {
        Ok(passages) => Ok(passages),
        Err(Error::IndexUnavailable(msg)) => {
            tracing::warn!("vector index unavailable, answering without context: {}", msg);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
