use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::chat::{Message, SessionId};
use super::types::Session;

/// Thread-safe in-memory session store.
///
/// Sharded by session id (DashMap), so requests for unrelated sessions never
/// contend on a single lock. Sessions live until explicitly cleared.
#[derive(Clone, Default)]
pub struct SessionStore {
    storage: Arc<DashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        info!("Initializing session store with DashMap");
        Self::default()
    }

    /// Snapshot of the session, registering an empty one on first reference.
    pub fn get_or_create(&self, session_id: &str) -> Session {
        let entry = self
            .storage
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Created session {}", session_id);
                Session::new(session_id.to_string())
            });
        entry.value().clone()
    }

    /// Most recent `limit` messages (0 = all); empty for unknown sessions.
    pub fn history(&self, session_id: &str, limit: usize) -> Vec<Message> {
        self.storage
            .get(session_id)
            .map(|s| s.recent(limit).to_vec())
            .unwrap_or_default()
    }

    /// Append a question/answer pair under one shard lock.
    /// Returns the session's message count afterwards.
    pub fn append_exchange(&self, session_id: &str, question: &str, answer: &str) -> usize {
        let mut entry = self
            .storage
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string()));

        entry.messages.push(Message::user(question));
        entry.messages.push(Message::assistant(answer));
        entry.touch();

        debug!(
            "Appended exchange to session {} ({} messages)",
            session_id,
            entry.messages.len()
        );
        entry.messages.len()
    }

    /// Remove the session. `false` when it did not exist.
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self.storage.remove(session_id).is_some();
        if removed {
            info!("Cleared session {}", session_id);
        } else {
            debug!("Clear requested for unknown session {}", session_id);
        }
        removed
    }

    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.storage.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = SessionStore::new();

        let first = store.get_or_create("abc");
        assert!(first.messages.is_empty());

        store.append_exchange("abc", "hola", "buenas");
        let again = store.get_or_create("abc");

        assert_eq!(again.messages.len(), 2);
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_exchange_order() {
        let store = SessionStore::new();
        store.append_exchange("s", "q1", "a1");
        store.append_exchange("s", "q2", "a2");

        let history = store.history("s", 0);
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);

        assert_eq!(store.history("s", 2).len(), 2);
        assert!(store.history("missing", 0).is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.append_exchange("A", "only in a", "ok");
        store.get_or_create("B");

        assert_eq!(store.get_or_create("A").messages.len(), 2);
        assert!(store.get_or_create("B").messages.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new();
        assert!(!store.clear("nonexistent"));
        assert!(!store.clear("nonexistent"));

        store.get_or_create("x");
        assert!(store.clear("x"));
        assert!(!store.clear("x"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_sessions() {
        let store = SessionStore::new();
        store.get_or_create("one");
        store.get_or_create("two");

        let mut ids = store.list_sessions();
        ids.sort();
        assert_eq!(ids, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_pairs_together() {
        let store = SessionStore::new();
        let mut handles = Vec::new();

        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let session = if i % 2 == 0 { "even" } else { "odd" };
                store.append_exchange(session, &format!("q{}", i), &format!("a{}", i));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for id in ["even", "odd"] {
            let history = store.history(id, 0);
            assert_eq!(history.len(), 32);
            for pair in history.chunks(2) {
                assert_eq!(pair[0].role, Role::User);
                assert_eq!(pair[1].role, Role::Assistant);
                assert_eq!(&pair[0].content[1..], &pair[1].content[1..]);
            }
        }
    }
}
