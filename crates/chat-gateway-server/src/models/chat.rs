use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SessionId = String;

// ===== CONVERSATION MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Answer produced by the answering engine, forwarded verbatim to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerPayload {
    Text(String),
    Structured(serde_json::Value),
}

impl AnswerPayload {
    /// Wrap an arbitrary JSON document; a bare JSON string stays text.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }

    /// Text recorded as the assistant turn in session history.
    pub fn to_history_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Short single-line preview for cache listings.
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self.to_history_text();
        let mut preview: String = text.chars().take(max_chars).collect();
        if text.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview.replace('\n', " ")
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WarmupRequest {
    pub items: Vec<WarmupItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarmupItem {
    pub question: String,
    /// Answer to store directly; when absent the answering engine is asked.
    #[serde(default)]
    pub result: Option<AnswerPayload>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub result: AnswerPayload,
    pub from_cache: bool,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub session_id: SessionId,
    pub cleared: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionId>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serializes_untagged() {
        let text = AnswerPayload::Text("hola".to_string());
        assert_eq!(serde_json::to_value(&text).unwrap(), json!("hola"));

        let structured = AnswerPayload::Structured(json!({"datos": [1, 2]}));
        assert_eq!(
            serde_json::to_value(&structured).unwrap(),
            json!({"datos": [1, 2]})
        );
    }

    #[test]
    fn test_payload_deserializes_string_as_text() {
        let payload: AnswerPayload = serde_json::from_value(json!("plain")).unwrap();
        assert_eq!(payload, AnswerPayload::Text("plain".to_string()));

        let payload: AnswerPayload = serde_json::from_value(json!({"answer": 42})).unwrap();
        assert_eq!(payload, AnswerPayload::Structured(json!({"answer": 42})));
    }

    #[test]
    fn test_history_text_does_not_interpret_shape() {
        let payload = AnswerPayload::Structured(json!({"answer": "x"}));
        assert_eq!(payload.to_history_text(), r#"{"answer":"x"}"#);
    }

    #[test]
    fn test_preview_truncates() {
        let payload = AnswerPayload::Text("line one\nline two".to_string());
        assert_eq!(payload.preview(8), "line one...");
        assert_eq!(payload.preview(100), "line one line two");
    }

    #[test]
    fn test_chat_request_fields_optional() {
        let request: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.question.is_none());
        assert!(request.session_id.is_none());
    }
}
