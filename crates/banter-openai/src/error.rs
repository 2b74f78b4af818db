use thiserror::Error;

/// Errors that can be returned by banter-openai operations.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// An HTTP request failed (network error, TLS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An event arrived but its payload could not be decoded.
    #[error("failed to decode stream event: {0}")]
    Decode(String),

    /// Failed to serialize or deserialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No event arrived within the caller's idle bound.
    #[error("stream stalled: no event within {0:?}")]
    Stalled(std::time::Duration),
}
