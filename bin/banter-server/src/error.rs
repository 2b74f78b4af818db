//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** upstream and internal errors are logged with full
//! detail but only a generic message is returned to the caller so that
//! API keys, URLs, or other implementation details never leak to clients.
//!
//! Once a streaming response has committed (200 + `text/event-stream`),
//! failures can no longer change the status code; those are surfaced as a
//! stream abort instead (see the chat route).

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::limit::Decision;

/// All errors that can occur in the banter-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller exhausted its quota; carries the decision for headers.
    #[error("rate limit exceeded")]
    RateLimited(Decision),

    /// The rate-limit store could not be reached.  Requests fail closed.
    #[error("rate limiter unavailable: {0}")]
    LimiterUnavailable(String),

    /// Propagated from the hosted API client before streaming committed.
    #[error("upstream error: {0}")]
    Upstream(#[from] banter_openai::UpstreamError),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),

            ServerError::RateLimited(decision) => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error":     "Rate limit exceeded",
                        "limit":     decision.limit,
                        "remaining": decision.remaining,
                        "reset":     decision.reset,
                    })),
                )
                    .into_response();
                let headers = response.headers_mut();
                headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
                headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset));
                response
            }

            ServerError::LimiterUnavailable(cause) => {
                error!(cause = %cause, "rate-limit store unavailable; failing closed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "rate limiter unavailable" })),
                )
                    .into_response()
            }

            // Internal errors: log the full detail, return a generic error
            // plus a short diagnostic message.
            ServerError::Upstream(e) => {
                error!(error = %e, "upstream API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error":   "Internal server error",
                        "message": e.to_string(),
                    })),
                )
                    .into_response()
            }

            ServerError::Internal(message) => {
                error!(message = %message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error":   "Internal server error",
                        "message": message,
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        // Log the full error chain before discarding it so diagnostic detail
        // is preserved in the server logs even though clients only see a
        // generic message.
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
