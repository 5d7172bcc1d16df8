//! Answering engine collaborator
//!
//! The gateway treats the engine as a black box: question + prior history in,
//! opaque answer payload out.

mod http;

pub use http::HttpAnsweringEngine;

use std::time::Duration;
use thiserror::Error;

use crate::models::{AnswerPayload, Message};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("request to answering engine failed: {0}")]
    Request(String),

    #[error("answering engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("answering engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("answering engine busy: {0}")]
    Busy(String),
}

/// Trait for the downstream answering service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AnsweringEngine: Send + Sync {
    async fn answer(&self, question: &str, history: &[Message]) -> Result<AnswerPayload, EngineError>;
}
