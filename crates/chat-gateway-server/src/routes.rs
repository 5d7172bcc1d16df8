use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route("/api/reset", post(handlers::session::reset_handler))
        .route("/api/sessions", get(handlers::session::list_sessions_handler))
        .route("/api/cache/clear", post(handlers::cache::clear_cache_handler))
        .route("/api/cache/stats", get(handlers::cache::cache_stats_handler))
        .route("/api/cache/entries", get(handlers::cache::cache_entries_handler))
        .route("/api/cache/warmup", post(handlers::cache::warmup_handler));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(api_routes)
        .with_state(state)
        // A panicking handler becomes a 500 instead of taking the process down
        .layer(CatchPanicLayer::new())
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
