//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AcceptedResponse, DraftRequest, DraftResponse, ErrorResponse, ExpandResponse, ModeResponse,
    SubmitRequest,
};
use super::AppState;
use crate::runtime::{SessionError, SessionSnapshot};
use crate::state_machine::TransitionError;
use crate::transcript::MessageId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Read access
        .route("/api/session", get(get_session))
        .route("/api/session/stream", get(stream_session))
        // User actions
        .route("/api/session/messages", post(submit_message))
        .route("/api/session/draft", put(set_draft))
        .route("/api/session/mode/toggle", post(toggle_mode))
        .route("/api/session/messages/:id/expand", post(toggle_expand))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Read Access
// ============================================================

async fn get_session(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.snapshot().await?))
}

async fn stream_session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (snapshot, broadcast_rx) = state.session.watch().await?;
    Ok(sse_stream(snapshot, broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), AppError> {
    state.session.submit(req.text).await?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

async fn set_draft(
    State(state): State<AppState>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    state.session.set_draft(req.text.clone()).await?;
    Ok(Json(DraftResponse { draft: req.text }))
}

async fn toggle_mode(State(state): State<AppState>) -> Result<Json<ModeResponse>, AppError> {
    let retrieval_mode = state.session.toggle_mode().await?;
    Ok(Json(ModeResponse { retrieval_mode }))
}

async fn toggle_expand(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExpandResponse>, AppError> {
    let message_id = MessageId::new(id);
    let expanded = state.session.toggle_expand(message_id.clone()).await?;
    Ok(Json(ExpandResponse {
        message_id,
        expanded,
    }))
}

async fn get_version() -> &'static str {
    concat!("ragtrip ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::Rejected(TransitionError::EmptySubmission) => Self::BadRequest(message),
            SessionError::Rejected(_) => Self::Conflict(message),
            SessionError::UnknownMessage(_) => Self::NotFound(message),
            SessionError::Closed => Self::Unavailable(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
