use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::chat::{
    ChatRequest, ChatResponse, ResetResponse, SessionId, WarmupItem,
};
use crate::models::{AnswerPayload, Message};
use crate::utils::{ApiError, Limiters};

use super::cache::ResponseCache;
use super::engine::{AnsweringEngine, EngineError};
use super::session::SessionStore;

/// Outcome counters of a cache warm-up run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct WarmupReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Coordinates one chat request across session memory, the answer cache and
/// the answering engine. Holds no state of its own beyond shared handles.
pub struct ChatOrchestrator {
    sessions: Arc<SessionStore>,
    cache: Arc<ResponseCache>,
    engine: Arc<dyn AnsweringEngine>,
    limiters: Limiters,
    engine_timeout: Duration,
    history_limit: usize,
    default_session_id: String,
    append_on_cache_hit: bool,
}

impl ChatOrchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        cache: Arc<ResponseCache>,
        engine: Arc<dyn AnsweringEngine>,
        settings: &Settings,
    ) -> Self {
        Self {
            sessions,
            cache,
            engine,
            limiters: Limiters::new(&settings.engine),
            engine_timeout: settings.engine.timeout(),
            history_limit: settings.engine.history_limit,
            default_session_id: settings.session.default_session_id.clone(),
            append_on_cache_hit: settings.session.append_on_cache_hit,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Missing or blank ids map to the default session.
    pub fn resolve_session_id(&self, session_id: Option<String>) -> SessionId {
        session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.default_session_id.clone())
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let start = Instant::now();

        // RECEIVED
        let question = request
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing required field 'question'".to_string()))?;
        let session_id = self.resolve_session_id(request.session_id);

        // HISTORY_RESOLVED
        let session = self.sessions.get_or_create(&session_id);
        debug!(
            "History resolved for session {} ({} messages)",
            session_id,
            session.messages.len()
        );

        // CACHE_CHECKED
        let key = self.cache.compute_key(&question);
        if let Some(entry) = self.cache.get(&key).await {
            // CACHE_HIT
            if self.append_on_cache_hit {
                self.sessions
                    .append_exchange(&session_id, &question, &entry.payload.to_history_text());
            }
            info!(
                "Cache hit for session {} key={} in {}ms",
                session_id,
                key,
                start.elapsed().as_millis()
            );
            return Ok(ChatResponse {
                result: entry.payload,
                from_cache: true,
                session_id,
            });
        }

        // CACHE_MISS -> ENGINE_INVOKED
        debug!("Cache miss for key={}, asking answering engine", key);
        let history = session.recent(self.history_limit).to_vec();
        let payload = self.ask_engine(&question, &history).await.map_err(|e| {
            warn!("Answering engine failed for session {}: {}", session_id, e);
            ApiError::from(e)
        })?;

        // HISTORY_UPDATED
        self.sessions
            .append_exchange(&session_id, &question, &payload.to_history_text());

        // CACHE_UPDATED
        if !self.cache.put(&key, &question, &payload, None).await {
            debug!("Answer for key={} not cached (store unavailable)", key);
        }

        info!(
            "Answered via engine for session {} key={} in {}ms",
            session_id,
            key,
            start.elapsed().as_millis()
        );
        Ok(ChatResponse {
            result: payload,
            from_cache: false,
            session_id,
        })
    }

    /// Bounded, time-limited engine call. Timeout counts as failure.
    async fn ask_engine(&self, question: &str, history: &[Message]) -> Result<AnswerPayload, EngineError> {
        let (_permit, waited) = self.limiters.acquire_engine().await?;
        if waited > Duration::from_millis(100) {
            debug!("Waited {}ms for an engine permit", waited.as_millis());
        }

        tokio::time::timeout(self.engine_timeout, self.engine.answer(question, history))
            .await
            .map_err(|_| EngineError::Timeout(self.engine_timeout))?
    }

    /// Idempotent: unknown sessions are reported, not rejected.
    pub fn reset(&self, session_id: Option<String>) -> ResetResponse {
        let session_id = self.resolve_session_id(session_id);
        let cleared = self.sessions.clear(&session_id);

        ResetResponse {
            status: "ok".to_string(),
            message: if cleared {
                "Session memory cleared".to_string()
            } else {
                "Session not found".to_string()
            },
            session_id,
            cleared,
        }
    }

    /// Pre-load answers. Items already cached are skipped; items without a
    /// result are answered by the engine with an empty history.
    pub async fn warmup(&self, items: Vec<WarmupItem>) -> WarmupReport {
        let mut report = WarmupReport::default();

        for item in items {
            report.total += 1;

            if item.question.trim().is_empty() {
                report.failed += 1;
                continue;
            }

            let key = self.cache.compute_key(&item.question);
            if self.cache.contains(&key).await {
                debug!("Warmup skip, already cached: {}", key);
                report.skipped += 1;
                continue;
            }

            let payload = match item.result {
                Some(payload) => payload,
                None => match self.ask_engine(&item.question, &[]).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Warmup engine call failed for key={}: {}", key, e);
                        report.failed += 1;
                        continue;
                    }
                },
            };

            let ttl = item.ttl_seconds.filter(|s| *s > 0).map(Duration::from_secs);
            if self.cache.put(&key, &item.question, &payload, ttl).await {
                report.success += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "Cache warmup finished: total={}, success={}, failed={}, skipped={}",
            report.total, report.success, report.failed, report.skipped
        );
        report
    }
}
