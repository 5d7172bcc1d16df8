use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::engine::EngineError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Answering engine error: {0}")]
    EngineFailed(String),

    #[error("Answering engine timed out: {0}")]
    EngineTimeout(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    error: String,
    message: String,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout(_) => ApiError::EngineTimeout(err.to_string()),
            EngineError::Busy(_) => ApiError::Unavailable(err.to_string()),
            _ => ApiError::EngineFailed(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Engine details stay in the logs; callers get an opaque message.
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            },
            ApiError::EngineFailed(msg) => {
                tracing::error!("Answering engine error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "EngineError",
                    "The answering engine could not produce an answer".to_string(),
                )
            },
            ApiError::EngineTimeout(msg) => {
                tracing::error!("Answering engine timeout: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "EngineTimeout",
                    "The answering engine did not respond in time".to_string(),
                )
            },
            ApiError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Unavailable", msg)
            },
        };

        let body = Json(ErrorResponse {
            status: "error",
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_engine_errors_map_to_gateway_statuses() {
        let timeout: ApiError = EngineError::Timeout(Duration::from_secs(3)).into();
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let failed: ApiError = EngineError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);

        let busy: ApiError = EngineError::Busy("limiter".to_string()).into();
        assert_eq!(busy.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("missing question".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
