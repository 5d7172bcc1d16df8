use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::backend::{BackendStats, CacheBackend, CacheError};
use super::entry::CacheEntry;
use super::key::Fingerprint;

/// Rough per-entry overhead added to the memory estimate.
const ENTRY_OVERHEAD_BYTES: u64 = 64;

/// In-process backend for single-instance runs and tests.
#[derive(Default)]
pub struct MemoryBackend {
    map: DashMap<Fingerprint, CacheEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.map.len();
        self.map.retain(|_, e| !e.is_expired_at(now));
        let removed = before.saturating_sub(self.map.len());
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    fn approx_mem_bytes(&self) -> u64 {
        let mut sum = 0u64;
        for r in self.map.iter() {
            let value_len = serde_json::to_vec(r.value()).map(|v| v.len()).unwrap_or(0);
            sum = sum.saturating_add((r.key().as_str().len() + value_len) as u64 + ENTRY_OVERHEAD_BYTES);
        }
        sum
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        let Some(mut g) = self.map.get_mut(key) else {
            return Ok(None);
        };
        if g.is_expired() {
            drop(g);
            // Only drop it if no fresh write replaced it meanwhile.
            self.map.remove_if(key, |_, e| e.is_expired());
            return Ok(None);
        }
        g.hit_count += 1;
        Ok(Some(g.value().clone()))
    }

    async fn peek(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self
            .map
            .get(key)
            .filter(|g| !g.is_expired())
            .map(|g| g.value().clone()))
    }

    async fn store(&self, key: &Fingerprint, entry: &CacheEntry) -> Result<(), CacheError> {
        self.map.insert(key.clone(), entry.clone());
        Ok(())
    }

    async fn remove(&self, key: &Fingerprint) -> Result<bool, CacheError> {
        Ok(self.map.remove(key).is_some())
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let count = self.map.len() as u64;
        self.map.clear();
        Ok(count)
    }

    async fn keys(&self, limit: usize) -> Result<Vec<Fingerprint>, CacheError> {
        let now = Utc::now();
        Ok(self
            .map
            .iter()
            .filter(|r| !r.is_expired_at(now))
            .take(limit)
            .map(|r| r.key().clone())
            .collect())
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        self.purge_expired();
        Ok(BackendStats {
            key_count: self.map.len() as u64,
            used_memory: self.approx_mem_bytes(),
        })
    }
}
