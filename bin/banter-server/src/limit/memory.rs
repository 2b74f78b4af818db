//! In-process sliding-window rate limiting.
//!
//! Timestamps per key in a `Mutex<HashMap<_, VecDeque<Instant>>>`, pruned on
//! every evaluation.  Admitted requests push a timestamp; rejected requests
//! do not, so a rejected client's window is not extended by its retries.
//! Suitable for single-instance deployments only; counts are lost on
//! restart and not shared across replicas.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::{Decision, LimitError, Quota, RateLimitStore};

#[derive(Default)]
pub struct MemoryStore {
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal: evaluate with an explicit timestamp (for testing).
    fn limit_at(&self, key: &str, quota: Quota, now: Instant) -> Decision {
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let deque = requests.entry(key.to_owned()).or_default();
        prune_window(deque, now, quota.window);

        let count = deque.len() as u32;
        let allowed = count < quota.max_requests;
        if allowed {
            deque.push_back(now);
        }

        // The window fully resets once the oldest recorded request ages out.
        let reset_after = deque
            .front()
            .map(|&oldest| quota.window.saturating_sub(now.duration_since(oldest)))
            .unwrap_or(quota.window);

        Decision {
            allowed,
            limit: quota.max_requests,
            remaining: quota.max_requests.saturating_sub(count + u32::from(allowed)),
            reset: epoch_secs_after(reset_after),
        }
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn limit(&self, key: &str, quota: Quota) -> Result<Decision, LimitError> {
        Ok(self.limit_at(key, quota, Instant::now()))
    }
}

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

fn epoch_secs_after(delay: Duration) -> i64 {
    (SystemTime::now() + delay)
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    fn quota(max_requests: u32, window_secs: u64) -> Quota {
        Quota {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    #[test]
    fn admits_up_to_the_quota_then_rejects() {
        let store = MemoryStore::new();
        let now = Instant::now();

        for i in 0..3 {
            let decision = store.limit_at("chat:a", quota(3, 60), now);
            assert!(decision.allowed, "request {i} should be admitted");
            assert_eq!(decision.remaining, 2 - i);
        }

        let decision = store.limit_at("chat:a", quota(3, 60), now);
        assert!(!decision.allowed);
        assert_eq!(decision.limit, 3);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn rejection_is_stable_for_an_exhausted_client() {
        let store = MemoryStore::new();
        let now = Instant::now();
        let _ = store.limit_at("chat:a", quota(1, 60), now);

        let first = store.limit_at("chat:a", quota(1, 60), now);
        let second = store.limit_at("chat:a", quota(1, 60), now);
        assert!(!first.allowed && !second.allowed);
        assert!(second.remaining <= first.remaining);
        assert_eq!(second.remaining, 0);
    }

    #[test]
    fn window_expiry_readmits() {
        let store = MemoryStore::new();
        let start = Instant::now();
        let _ = store.limit_at("chat:a", quota(1, 60), start);
        assert!(!store.limit_at("chat:a", quota(1, 60), start).allowed);

        let later = start + Duration::from_secs(61);
        assert!(store.limit_at("chat:a", quota(1, 60), later).allowed);
    }

    #[test]
    fn keys_are_independent() {
        let store = MemoryStore::new();
        let now = Instant::now();
        let _ = store.limit_at("chat:a", quota(1, 60), now);
        assert!(!store.limit_at("chat:a", quota(1, 60), now).allowed);
        assert!(store.limit_at("chat:b", quota(1, 60), now).allowed);
        assert!(store.limit_at("transcribe:a", quota(1, 60), now).allowed);
    }

    #[test]
    fn reset_is_in_the_future() {
        let store = MemoryStore::new();
        let decision = store.limit_at("chat:a", quota(1, 60), Instant::now());
        let epoch_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        assert!(decision.reset >= epoch_now);
        assert!(decision.reset <= epoch_now + 61);
    }
}
