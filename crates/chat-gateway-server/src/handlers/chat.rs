use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::ChatOrchestrator;
use crate::utils::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use tracing::{info_span, Instrument};

pub async fn chat_handler(
    State(orchestrator): State<Arc<ChatOrchestrator>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "chat",
        %request_id,
        session_id = request.session_id.as_deref().unwrap_or("-")
    );

    orchestrator.chat(request).instrument(span).await.map(Json)
}
