use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{CacheBackendKind, CacheConfig};
use crate::models::AnswerPayload;

use super::backend::{CacheBackend, CacheError};
use super::entry::{format_bytes, CacheEntry, CacheEntrySummary};
use super::key::{compute_key, normalize_question, Fingerprint};
use super::memory::MemoryBackend;
use super::redis_backend::RedisBackend;

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub connected: bool,
    pub backend: &'static str,
    pub key_count: u64,
    pub used_memory: u64,
    pub used_memory_human: String,
    pub default_ttl_seconds: u64,
}

/// Content-addressed answer cache.
///
/// Store failures never escape: reads degrade to a miss, writes to `false`,
/// stats to `connected: false`. Only `clear_all` reports the failure.
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
    default_list_limit: usize,
    max_list_limit: usize,
    connected: AtomicBool,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        info!(
            "Initializing response cache: backend={}, default_ttl={}s",
            backend.name(),
            config.default_ttl().as_secs()
        );
        Self {
            backend,
            default_ttl: config.default_ttl(),
            default_list_limit: config.default_list_limit.max(1),
            max_list_limit: config.max_list_limit.max(1),
            connected: AtomicBool::new(true),
        }
    }

    /// Build the backend selected in configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Redis => Arc::new(RedisBackend::new(
                &config.redis_url,
                &config.key_prefix,
                config.operation_timeout(),
            )?),
            CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(Self::new(backend, config))
    }

    pub fn compute_key(&self, question: &str) -> Fingerprint {
        compute_key(question)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Last observed connectivity of the backing store.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn observe<T>(&self, op: &str, result: Result<T, CacheError>) -> Option<T> {
        match result {
            Ok(value) => {
                if !self.connected.swap(true, Ordering::Relaxed) {
                    info!("Cache store reachable again");
                }
                Some(value)
            }
            Err(e) => {
                if matches!(e, CacheError::Unavailable(_) | CacheError::Timeout(_)) {
                    self.connected.store(false, Ordering::Relaxed);
                }
                warn!("Cache {} failed, continuing without cache: {}", op, e);
                None
            }
        }
    }

    /// Unexpired entry with its hit counter bumped, or None on miss/outage.
    pub async fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let entry = self.observe("get", self.backend.fetch(key).await).flatten()?;

        // Purging is left to the store, which may already hold a newer write.
        if entry.is_expired() {
            debug!("Cache entry {} expired at read time", key);
            return None;
        }

        debug!("Cache hit {} (hits={})", key, entry.hit_count);
        Some(entry)
    }

    /// Insert or overwrite. `ttl` None uses the deployment default.
    pub async fn put(
        &self,
        key: &Fingerprint,
        question: &str,
        payload: &AnswerPayload,
        ttl: Option<Duration>,
    ) -> bool {
        let entry = CacheEntry::new(
            normalize_question(question),
            payload.clone(),
            Some(ttl.unwrap_or(self.default_ttl)),
        );
        let stored = self.observe("put", self.backend.store(key, &entry).await).is_some();
        if stored {
            debug!("Cached {} (ttl={:?}s)", key, entry.ttl_seconds);
        }
        stored
    }

    pub async fn contains(&self, key: &Fingerprint) -> bool {
        self.observe("peek", self.backend.peek(key).await)
            .flatten()
            .is_some_and(|e| !e.is_expired())
    }

    pub async fn clear_all(&self) -> Result<u64, CacheError> {
        let result = self.backend.clear().await;
        match &result {
            Ok(count) => {
                self.connected.store(true, Ordering::Relaxed);
                info!("Cache cleared ({} entries)", count);
            }
            Err(e) => {
                self.connected.store(false, Ordering::Relaxed);
                warn!("Cache clear failed: {}", e);
            }
        }
        result
    }

    pub async fn stats(&self) -> CacheStats {
        match self.observe("stats", self.backend.stats().await) {
            Some(stats) => CacheStats {
                connected: true,
                backend: self.backend.name(),
                key_count: stats.key_count,
                used_memory: stats.used_memory,
                used_memory_human: format_bytes(stats.used_memory),
                default_ttl_seconds: self.default_ttl.as_secs(),
            },
            None => CacheStats {
                connected: false,
                backend: self.backend.name(),
                key_count: 0,
                used_memory: 0,
                used_memory_human: format_bytes(0),
                default_ttl_seconds: self.default_ttl.as_secs(),
            },
        }
    }

    /// Absent or non-positive limits fall back to the default; large ones are clamped.
    pub fn effective_limit(&self, limit: Option<i64>) -> usize {
        match limit {
            Some(n) if n > 0 => (n as u64).min(self.max_list_limit as u64) as usize,
            _ => self.default_list_limit,
        }
    }

    pub async fn list_entries(&self, limit: Option<i64>) -> Vec<CacheEntrySummary> {
        let limit = self.effective_limit(limit);
        let Some(keys) = self.observe("list", self.backend.keys(limit).await) else {
            return Vec::new();
        };

        let now = Utc::now();
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            // Entries can expire between listing and reading them.
            if let Some(entry) = self.observe("peek", self.backend.peek(&key).await).flatten() {
                if !entry.is_expired_at(now) {
                    entries.push(CacheEntrySummary::from_entry(key.to_string(), &entry, now));
                }
            }
        }
        entries.truncate(limit);
        entries
    }
}
