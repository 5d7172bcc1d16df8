use crate::models::chat::{ResetRequest, ResetResponse, SessionListResponse};
use crate::services::{ChatOrchestrator, SessionStore};
use crate::utils::error::ApiError;
use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

/// The body is optional; an empty one resets the default session.
pub async fn reset_handler(
    State(orchestrator): State<Arc<ChatOrchestrator>>,
    body: Bytes,
) -> Result<Json<ResetResponse>, ApiError> {
    let request: ResetRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };

    Ok(Json(orchestrator.reset(request.session_id)))
}

pub async fn list_sessions_handler(
    State(sessions): State<Arc<SessionStore>>,
) -> Json<SessionListResponse> {
    let sessions = sessions.list_sessions();
    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}
