use std::sync::Arc;
use axum::extract::FromRef;

use crate::services::{ChatOrchestrator, ResponseCache, SessionStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub cache: Arc<ResponseCache>,
    pub orchestrator: Arc<ChatOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: ChatOrchestrator) -> Self {
        Self {
            sessions: orchestrator.sessions().clone(),
            cache: orchestrator.cache().clone(),
            orchestrator: Arc::new(orchestrator),
        }
    }
}

impl FromRef<AppState> for Arc<ChatOrchestrator> {
    fn from_ref(state: &AppState) -> Self {
        state.orchestrator.clone()
    }
}

impl FromRef<AppState> for Arc<ResponseCache> {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<AppState> for Arc<SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
