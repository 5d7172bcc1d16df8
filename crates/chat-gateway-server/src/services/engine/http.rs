use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{AnswerPayload, Message};

use super::{AnsweringEngine, EngineError};

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    question: &'a str,
    history: &'a [Message],
}

/// Answering engine reached over HTTP (`POST {base_url}{answer_path}`).
#[derive(Clone)]
pub struct HttpAnsweringEngine {
    client: Client,
    answer_url: String,
    timeout: Duration,
}

impl HttpAnsweringEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            answer_url: config.answer_url(),
            timeout: config.timeout(),
        })
    }

    pub fn answer_url(&self) -> &str {
        &self.answer_url
    }
}

/// JSON body → payload as-is; anything else is forwarded as text.
fn decode_payload(body: String) -> AnswerPayload {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => AnswerPayload::from_json(value),
        Err(_) => AnswerPayload::Text(body),
    }
}

#[async_trait::async_trait]
impl AnsweringEngine for HttpAnsweringEngine {
    async fn answer(&self, question: &str, history: &[Message]) -> Result<AnswerPayload, EngineError> {
        debug!(
            "Calling answering engine at {} with {} history messages",
            self.answer_url,
            history.len()
        );

        let response = self
            .client
            .post(&self.answer_url)
            .json(&AnswerRequest { question, history })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(self.timeout)
                } else {
                    EngineError::Request(format!("Failed to call answering engine: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Request(format!("Failed to read engine response: {}", e)))?;

        if !status.is_success() {
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_payload(body))
    }
}
