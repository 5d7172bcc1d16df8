//! Persistent answer cache
//!
//! Answers are keyed by a fingerprint of the normalized question only, so a
//! question asked from any session within the TTL gets the same answer.

pub mod backend;
pub mod entry;
pub mod key;
mod memory;
mod redis_backend;
mod response_cache;

pub use backend::{BackendStats, CacheBackend, CacheError};
pub use entry::{CacheEntry, CacheEntrySummary};
pub use key::{compute_key, normalize_question, Fingerprint};
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use response_cache::{CacheStats, ResponseCache};
