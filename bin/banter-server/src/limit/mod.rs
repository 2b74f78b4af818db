//! Per-client request quotas over a trailing window.
//!
//! [`RateLimitStore`] defines the check-and-increment interface handlers
//! call before doing any other work.  Two implementations exist:
//! [`memory::MemoryStore`] for single-instance deployments and
//! [`redis::RedisStore`] for shared deployments; the choice is made once at
//! startup.  Keys are namespaced per endpoint (`"chat:<client>"`), so the
//! same store enforces independent quotas for each route.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use thiserror::Error;

/// A quota: at most `max_requests` admissions per trailing `window`.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub max_requests: u32,
    pub window: Duration,
}

/// The outcome of one quota evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The configured quota, echoed for response headers.
    pub limit: u32,
    /// Admissions left in the current window (0 when rejected).
    pub remaining: u32,
    /// Epoch seconds at which the trailing window fully resets.
    pub reset: i64,
}

#[derive(Debug, Error)]
pub enum LimitError {
    /// The backing store could not be reached or answered garbage.
    /// Callers fail closed on this.
    #[error("rate-limit store unavailable: {0}")]
    Unavailable(String),
}

/// Atomic check-and-increment against the backing store.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Evaluate `quota` for `key`, recording the request if admitted.
    async fn limit(&self, key: &str, quota: Quota) -> Result<Decision, LimitError>;
}

/// Derive the rate-limit client identifier from forwarding headers.
///
/// Takes the first comma-separated value of `x-forwarded-for` if present,
/// else `x-real-ip`, else a constant sentinel.  Headers are trusted as-is;
/// this is only meaningful behind a reverse proxy that sets them, and all
/// direct anonymous clients share one bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }

    "anonymous".to_owned()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1, 10.0.0.2"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_key(&headers), "198.51.100.4");
    }

    #[test]
    fn no_headers_yields_sentinel() {
        assert_eq!(client_key(&HeaderMap::new()), "anonymous");
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_key(&headers), "198.51.100.4");
    }
}
