use crate::services::cache::{CacheStats, ResponseCache};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

const FEATURES: [&str; 3] = ["conversation_memory", "session_management", "response_cache"];

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
    features: Vec<String>,
    cache_status: CacheStats,
}

/// Always `ok` while the process serves requests: a cache outage only shows
/// up as `cache_status.connected = false`.
pub async fn health_check(
    State(cache): State<Arc<ResponseCache>>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            features: FEATURES.iter().map(|f| f.to_string()).collect(),
            cache_status: cache.stats().await,
        }),
    )
}
