use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use chat_gateway_server::{
    build_router,
    config::Settings,
    services::{ChatOrchestrator, HttpAnsweringEngine, ResponseCache, SessionStore},
    telemetry, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let _log_guard = telemetry::init_telemetry(&settings.logging);
    info!("🚀 Starting chat gateway...");
    info!("✅ Configuration loaded");

    // Initialize services
    let sessions = Arc::new(SessionStore::new());

    let cache = Arc::new(ResponseCache::from_config(&settings.cache)?);
    let stats = cache.stats().await;
    if stats.connected {
        info!(
            "✅ Cache store connected ({}, {} keys, {})",
            stats.backend, stats.key_count, stats.used_memory_human
        );
    } else {
        warn!("⚠️ Cache store unavailable, answering without cache until it comes back");
    }

    let engine = Arc::new(HttpAnsweringEngine::new(&settings.engine)?);
    info!("✅ Answering engine at {}", engine.answer_url());

    let orchestrator = ChatOrchestrator::new(sessions, cache, engine, &settings);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let app = build_router(AppState::new(orchestrator));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
