//! Redis-backed answer cache shared across gateway instances.
//!
//! Each entry is a hash `{prefix}{fingerprint}` with an `entry` field (JSON)
//! and a `hits` counter; expiry is delegated to Redis via `EXPIRE`.

use std::future::Future;
use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use redis::RedisResult;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::backend::{BackendStats, CacheBackend, CacheError};
use super::entry::CacheEntry;
use super::key::Fingerprint;

const SCAN_BATCH: usize = 200;

/// After a failed connect, calls fail fast for this long instead of each
/// paying a fresh connect timeout.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Upper bound on keys walked for `stats`; larger namespaces report the cap.
const STATS_KEY_CAP: usize = 10_000;

/// Bumps `hits` only when the entry still exists, so a concurrent expiry
/// never resurrects the key without a TTL.
const FETCH_SCRIPT: &str = r#"
local entry = redis.call('HGET', KEYS[1], 'entry')
if not entry then
  return nil
end
local hits = redis.call('HINCRBY', KEYS[1], 'hits', 1)
return {entry, hits}
"#;

pub struct RedisBackend {
    client: redis::Client,
    key_prefix: String,
    op_timeout: Duration,
    fetch_script: redis::Script,
    connection: Mutex<ConnectionSlot>,
}

#[derive(Default)]
struct ConnectionSlot {
    manager: Option<ConnectionManager>,
    retry_after: Option<Instant>,
}

impl RedisBackend {
    pub fn new(url: &str, key_prefix: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid redis url {}: {}", url, e)))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            op_timeout,
            fetch_script: redis::Script::new(FETCH_SCRIPT),
            connection: Mutex::new(ConnectionSlot::default()),
        })
    }

    fn entry_key(&self, key: &Fingerprint) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn match_pattern(&self) -> String {
        format!("{}*", self.key_prefix)
    }

    fn strip_prefix(&self, raw: &str) -> Option<Fingerprint> {
        raw.strip_prefix(&self.key_prefix).and_then(Fingerprint::parse)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = RedisResult<T>>) -> Result<T, CacheError> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() => {
                Err(CacheError::Unavailable(e.to_string()))
            }
            Ok(Err(e)) => Err(CacheError::Backend(e.to_string())),
            Err(_) => Err(CacheError::Timeout(self.op_timeout.as_millis() as u64)),
        }
    }

    /// Shared multiplexed connection, established on first use.
    ///
    /// The slot lock is never held across the connect itself. Concurrent
    /// callers may race to connect; the first manager stored wins.
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        {
            let slot = self.connection.lock().await;
            if let Some(con) = slot.manager.as_ref() {
                return Ok(con.clone());
            }
            if slot.retry_after.is_some_and(|at| Instant::now() < at) {
                return Err(CacheError::Unavailable(
                    "redis unreachable, waiting before reconnecting".to_string(),
                ));
            }
        }

        match self.bounded(self.client.get_connection_manager()).await {
            Ok(con) => {
                let mut slot = self.connection.lock().await;
                slot.retry_after = None;
                match slot.manager.as_ref() {
                    Some(existing) => Ok(existing.clone()),
                    None => {
                        info!("Connected to redis cache store (prefix={})", self.key_prefix);
                        slot.manager = Some(con.clone());
                        Ok(con)
                    }
                }
            }
            Err(e) => {
                let mut slot = self.connection.lock().await;
                slot.retry_after = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(e)
            }
        }
    }

    /// Walk the namespace with SCAN, stopping once `limit` keys are collected.
    async fn scan_keys(&self, limit: Option<usize>) -> Result<Vec<String>, CacheError> {
        let mut con = self.connection().await?;
        let pattern = self.match_pattern();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut con),
                )
                .await?;

            if absorb_batch(&mut keys, batch, limit) || next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

/// Append one SCAN batch, truncating at `limit`. Returns true once full.
fn absorb_batch(keys: &mut Vec<String>, batch: Vec<String>, limit: Option<usize>) -> bool {
    keys.extend(batch);
    match limit {
        Some(limit) if keys.len() >= limit => {
            keys.truncate(limit);
            true
        }
        _ => false,
    }
}

fn decode_entry(raw: &str, hits: u64) -> Result<CacheEntry, CacheError> {
    let mut entry: CacheEntry = serde_json::from_str(raw)?;
    entry.hit_count = hits;
    Ok(entry)
}

fn parse_used_memory(info: &str) -> u64 {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("used_memory:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn fetch(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        let mut con = self.connection().await?;
        let k = self.entry_key(key);

        let row: Option<(String, u64)> = self
            .bounded(self.fetch_script.key(&k).invoke_async(&mut con))
            .await?;

        row.map(|(raw, hits)| decode_entry(&raw, hits)).transpose()
    }

    async fn peek(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, CacheError> {
        let mut con = self.connection().await?;
        let k = self.entry_key(key);

        let (raw, hits): (Option<String>, Option<u64>) = self
            .bounded(
                redis::cmd("HMGET")
                    .arg(&k)
                    .arg("entry")
                    .arg("hits")
                    .query_async(&mut con),
            )
            .await?;

        raw.map(|raw| decode_entry(&raw, hits.unwrap_or(0))).transpose()
    }

    async fn store(&self, key: &Fingerprint, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut con = self.connection().await?;
        let k = self.entry_key(key);
        let raw = serde_json::to_string(entry)?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("DEL").arg(&k).ignore()
            .cmd("HSET").arg(&k).arg("entry").arg(&raw).arg("hits").arg(entry.hit_count).ignore();
        if let Some(ttl) = entry.ttl_seconds {
            pipe.cmd("EXPIRE").arg(&k).arg(ttl).ignore();
        }

        self.bounded(pipe.query_async::<()>(&mut con)).await?;
        debug!("Stored {} (ttl={:?})", k, entry.ttl_seconds);
        Ok(())
    }

    async fn remove(&self, key: &Fingerprint) -> Result<bool, CacheError> {
        let mut con = self.connection().await?;
        let removed: u64 = self
            .bounded(redis::cmd("DEL").arg(self.entry_key(key)).query_async(&mut con))
            .await?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let keys = self.scan_keys(None).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut con = self.connection().await?;
        let mut removed = 0u64;
        for chunk in keys.chunks(SCAN_BATCH) {
            let n: u64 = self
                .bounded(redis::cmd("DEL").arg(chunk).query_async(&mut con))
                .await?;
            removed += n;
        }

        info!("Removed {} keys under prefix {}", removed, self.key_prefix);
        Ok(removed)
    }

    async fn keys(&self, limit: usize) -> Result<Vec<Fingerprint>, CacheError> {
        let raw = self.scan_keys(Some(limit)).await?;
        Ok(raw
            .iter()
            .filter_map(|k| {
                let parsed = self.strip_prefix(k);
                if parsed.is_none() {
                    warn!("Ignoring foreign key under cache prefix: {}", k);
                }
                parsed
            })
            .collect())
    }

    async fn stats(&self) -> Result<BackendStats, CacheError> {
        let key_count = self.scan_keys(Some(STATS_KEY_CAP)).await?.len() as u64;

        let mut con = self.connection().await?;
        let info: String = self
            .bounded(redis::cmd("INFO").arg("memory").query_async(&mut con))
            .await?;

        Ok(BackendStats {
            key_count,
            used_memory: parse_used_memory(&info),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::key::compute_key;

    #[test]
    fn test_key_namespacing() {
        let backend =
            RedisBackend::new("redis://127.0.0.1:6379/0", "gw:answer:", Duration::from_secs(1)).unwrap();
        let key = compute_key("hello");

        let full = backend.entry_key(&key);
        assert_eq!(full, format!("gw:answer:{}", key));
        assert_eq!(backend.strip_prefix(&full), Some(key));
        assert_eq!(backend.strip_prefix("other:prefix:abc"), None);
        assert_eq!(backend.match_pattern(), "gw:answer:*");
    }

    #[test]
    fn test_parse_used_memory() {
        let info = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n";
        assert_eq!(parse_used_memory(info), 1_048_576);
        assert_eq!(parse_used_memory("# Memory\r\n"), 0);
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RedisBackend::new("not a url", "p:", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_absorb_batch_stops_at_limit() {
        let batch = |n: usize| (0..n).map(|i| format!("k{}", i)).collect::<Vec<_>>();

        let mut keys = Vec::new();
        assert!(!absorb_batch(&mut keys, batch(3), Some(5)));
        assert!(absorb_batch(&mut keys, batch(3), Some(5)));
        assert_eq!(keys.len(), 5);

        let mut unbounded = Vec::new();
        assert!(!absorb_batch(&mut unbounded, batch(STATS_KEY_CAP + 1), None));
        assert_eq!(unbounded.len(), STATS_KEY_CAP + 1);
    }

    /// Accepts connections and never answers, like a wedged store.
    async fn silent_listener() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_do_not_queue_on_dead_store() {
        let addr = silent_listener().await;
        let backend = std::sync::Arc::new(
            RedisBackend::new(&format!("redis://{}/", addr), "gw:", Duration::from_millis(300)).unwrap(),
        );

        let started = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = backend.clone();
                tokio::spawn(async move { backend.fetch(&compute_key(&format!("q{}", i))).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
        assert!(started.elapsed() < Duration::from_millis(900));

        // Inside the backoff window calls fail without another connect attempt.
        let started = Instant::now();
        assert!(matches!(
            backend.peek(&compute_key("q")).await,
            Err(CacheError::Unavailable(_))
        ));
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error_not_a_hang() {
        // Port 1 is never a redis server.
        let backend =
            RedisBackend::new("redis://127.0.0.1:1/", "gw:", Duration::from_millis(300)).unwrap();

        let started = std::time::Instant::now();
        assert!(backend.fetch(&compute_key("q")).await.is_err());
        assert!(backend.stats().await.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
