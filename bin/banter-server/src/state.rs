//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use banter_openai::OpenAiApi;

use crate::config::Config;
use crate::limit::RateLimitStore;

/// State shared across all HTTP handlers.
///
/// Everything here is read-only after startup; the only cross-request
/// mutation happens inside the rate-limit store, which provides its own
/// atomicity.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Quota store; in-memory or Redis depending on configuration.
    pub limiter: Arc<dyn RateLimitStore>,
    /// Hosted model API client.
    pub upstream: Arc<dyn OpenAiApi>,
}
