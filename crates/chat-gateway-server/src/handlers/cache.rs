use crate::models::chat::WarmupRequest;
use crate::services::cache::{CacheEntrySummary, CacheStats, ResponseCache};
use crate::services::{ChatOrchestrator, WarmupReport};
use crate::utils::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    status: &'static str,
    cleared_keys: u64,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    // Kept as text so junk values fall back to the default limit.
    limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    entries: Vec<CacheEntrySummary>,
    count: usize,
    limit: usize,
}

#[derive(Debug, Serialize)]
pub struct WarmupResponse {
    status: &'static str,
    #[serde(flatten)]
    report: WarmupReport,
}

pub async fn clear_cache_handler(
    State(cache): State<Arc<ResponseCache>>,
) -> (StatusCode, Json<CacheClearResponse>) {
    match cache.clear_all().await {
        Ok(count) => (
            StatusCode::OK,
            Json(CacheClearResponse {
                status: "ok",
                cleared_keys: count,
                message: format!("Removed {} cache entries", count),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CacheClearResponse {
                status: "error",
                cleared_keys: 0,
                message: format!("Cache could not be cleared: {}", e),
            }),
        ),
    }
}

pub async fn cache_stats_handler(State(cache): State<Arc<ResponseCache>>) -> Json<CacheStats> {
    Json(cache.stats().await)
}

pub async fn cache_entries_handler(
    State(cache): State<Arc<ResponseCache>>,
    Query(query): Query<EntriesQuery>,
) -> Json<EntriesResponse> {
    let requested = query.limit.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok());
    let limit = cache.effective_limit(requested);
    let entries = cache.list_entries(Some(limit as i64)).await;

    Json(EntriesResponse {
        count: entries.len(),
        entries,
        limit,
    })
}

pub async fn warmup_handler(
    State(orchestrator): State<Arc<ChatOrchestrator>>,
    payload: Result<Json<WarmupRequest>, JsonRejection>,
) -> Result<Json<WarmupResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let report = orchestrator.warmup(request.items).await;

    Ok(Json(WarmupResponse {
        status: "ok",
        report,
    }))
}
