use serde::Serialize;
use thiserror::Error;

use super::entry::CacheEntry;
use super::key::Fingerprint;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Cache store error: {0}")]
    Backend(String),

    #[error("Corrupt cache entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Aggregate counters reported by a backing store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendStats {
    pub key_count: u64,
    pub used_memory: u64,
}

/// Key-value store holding cached answers.
///
/// Implementations namespace fingerprints themselves and must treat every
/// call as fallible: the caller degrades to a miss on error.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Read an entry and bump its hit counter.
    async fn fetch(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError>;

    /// Read an entry without counting a hit.
    async fn peek(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or overwrite; the entry's ttl drives store-side expiry.
    async fn store(&self, key: &Fingerprint, entry: &CacheEntry) -> Result<(), CacheError>;

    async fn remove(&self, key: &Fingerprint) -> Result<bool, CacheError>;

    /// Remove every entry, returning how many were deleted.
    async fn clear(&self) -> Result<u64, CacheError>;

    /// Up to `limit` live keys, order unspecified.
    async fn keys(&self, limit: usize) -> Result<Vec<Fingerprint>, CacheError>;

    async fn stats(&self) -> Result<BackendStats, CacheError>;
}
