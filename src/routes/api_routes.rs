use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::chat::session::{RejectReason, SendOutcome};
use crate::errors::AppError;
use crate::models::{DraftRequest, Profile, SendMessageRequest};
use crate::service::session_service::SessionService;

// ── Response bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendMessageResponse {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<RejectReason>,
}

impl From<SendOutcome> for SendMessageResponse {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Accepted => Self { outcome: "accepted", reason: None },
            SendOutcome::EmailCaptured => Self { outcome: "email_captured", reason: None },
            SendOutcome::Rejected(reason) => Self { outcome: "rejected", reason: Some(reason) },
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST `/api/sessions`: landing form submit; starts a conversation
pub async fn start_session_handler(
    State(svc): State<SessionService>,
    Json(profile): Json<Profile>,
) -> Response {
    match svc.start_session(profile).await {
        Ok(started) => (StatusCode::CREATED, Json(started)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/api/sessions/{id}`: current state of a conversation
pub async fn get_session_handler(
    Path(id): Path<String>,
    State(svc): State<SessionService>,
) -> Response {
    match svc.get(&id) {
        Ok(session) => Json(session.snapshot()).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/sessions/{id}/messages`: user turn (typed text or a chip)
pub async fn send_message_handler(
    Path(id): Path<String>,
    State(svc): State<SessionService>,
    Json(request): Json<SendMessageRequest>,
) -> Response {
    match svc.send_message(&id, request.text.as_deref()).await {
        Ok(outcome) => Json(SendMessageResponse::from(outcome)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT `/api/sessions/{id}/draft`: replace the input buffer
pub async fn set_draft_handler(
    Path(id): Path<String>,
    State(svc): State<SessionService>,
    Json(request): Json<DraftRequest>,
) -> Response {
    match svc.set_draft(&id, request.text) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/api/sessions/{id}`: start over
pub async fn end_session_handler(
    Path(id): Path<String>,
    State(svc): State<SessionService>,
) -> Response {
    match svc.end_session(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn status_for(err: &AppError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_agent_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(err: &AppError) -> Response {
    (status_for(err), err.to_string()).into_response()
}
