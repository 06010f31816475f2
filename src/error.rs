// API error type and its mapping onto HTTP responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::rate_limit::RateLimitError;
use crate::services::{GenerationError, JokeError};

/// Errors a route can hand back to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed client input, rejected before any handler logic.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    /// A joke API failure that reached the HTTP layer.
    #[error("The Dad Joke service is currently unavailable: {}", .0.detail())]
    UpstreamJoke(JokeError),
    /// Any other outbound call that failed with nothing to fall back on.
    #[error("Failed to connect to an external service: {0}")]
    Upstream(String),
}

impl From<JokeError> for ApiError {
    fn from(e: JokeError) -> Self {
        match e {
            JokeError::Status(status) => {
                ApiError::Upstream(format!("joke API returned status {status}"))
            }
            other => ApiError::UpstreamJoke(other),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        ApiError::Upstream(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamJoke(_) | ApiError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.to_string();
        match self {
            ApiError::Validation(_) => (status, Json(json!({ "detail": msg }))).into_response(),
            ApiError::RateLimited(e) => {
                let mut response = (status, Json(json!({ "error": msg }))).into_response();
                let secs = e.retry_after.as_secs().max(1);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::UpstreamJoke(_) => {
                tracing::error!("Dad joke API error reached the HTTP layer: {msg}");
                (status, Json(json!({ "message": msg }))).into_response()
            }
            ApiError::Upstream(_) => {
                tracing::error!("Outbound request error reached the HTTP layer: {msg}");
                (status, Json(json!({ "message": msg }))).into_response()
            }
        }
    }
}
