//! Redis-backed sliding-window rate limiting for shared deployments.
//!
//! Each key holds a sorted set of request timestamps (epoch millis as
//! scores).  One Lua script prunes, counts, conditionally records, and
//! refreshes the key's TTL, so check-and-increment is atomic across
//! replicas.  Connection failures surface as [`LimitError::Unavailable`];
//! callers fail closed.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, Script};
use tracing::debug;
use uuid::Uuid;

use super::{Decision, LimitError, Quota, RateLimitStore};

/// Prune expired entries, count, admit if under the limit, bump the TTL,
/// and report when the window fully resets, all in one round trip.
const SLIDING_WINDOW: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
redis.call('ZREMRANGEBYSCORE', key, 0, now - window)
local count = redis.call('ZCARD', key)
local allowed = 0
if count < limit then
  redis.call('ZADD', key, now, ARGV[4])
  count = count + 1
  allowed = 1
end
redis.call('PEXPIRE', key, window)
local reset = now + window
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if oldest[2] then
  reset = tonumber(oldest[2]) + window
end
return {allowed, count, reset}
"#;

pub struct RedisStore {
    connection: ConnectionManager,
    script: Script,
}

impl RedisStore {
    /// Connect to Redis at `url` and verify the connection with a PING.
    ///
    /// Called once at startup; an error here is fatal so the server never
    /// runs with an unreachable quota store.
    pub async fn connect(url: &str) -> Result<Self, LimitError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_secs(2));

        let client = Client::open(url).map_err(|e| LimitError::Unavailable(e.to_string()))?;
        let mut connection = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(|e| LimitError::Unavailable(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| LimitError::Unavailable(e.to_string()))?;

        debug!("rate-limit store connected");
        Ok(Self {
            connection,
            script: Script::new(SLIDING_WINDOW),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn limit(&self, key: &str, quota: Quota) -> Result<Decision, LimitError> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let window_ms = quota.window.as_millis() as i64;

        let mut connection = self.connection.clone();
        let (allowed, count, reset_ms): (i64, i64, i64) = self
            .script
            .key(key)
            .arg(now_ms)
            .arg(window_ms)
            .arg(i64::from(quota.max_requests))
            .arg(Uuid::new_v4().to_string())
            .invoke_async(&mut connection)
            .await
            .map_err(|e| LimitError::Unavailable(e.to_string()))?;

        Ok(Decision {
            allowed: allowed == 1,
            limit: quota.max_requests,
            remaining: quota
                .max_requests
                .saturating_sub(count.try_into().unwrap_or(u32::MAX)),
            reset: reset_ms / 1000,
        })
    }
}
