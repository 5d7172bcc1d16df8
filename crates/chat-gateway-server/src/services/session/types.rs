use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::chat::{Message, SessionId};

/// Conversation state for one session id
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: SessionId,

    /// Ordered history, oldest first
    pub messages: Vec<Message>,

    pub created_at: DateTime<Utc>,

    /// Last append (or creation)
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// The last `limit` messages, or all of them when `limit` is 0.
    pub fn recent(&self, limit: usize) -> &[Message] {
        if limit == 0 || self.messages.len() <= limit {
            &self.messages
        } else {
            &self.messages[self.messages.len() - limit..]
        }
    }
}
