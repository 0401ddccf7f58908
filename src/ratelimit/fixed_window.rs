//! Distributed fixed-window rate limiting.
//!
//! One atomic counter per `prefix:key` in the shared store. The first
//! increment of a window opens it by setting the key's TTL to the window
//! length; the window ends when the key expires. Counting is consistent
//! across gateway processes, at the cost of burst smoothness: a client can
//! send up to 2×max requests straddling a window boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::GatewayError;
use crate::ratelimit::RateLimitDecision;
use crate::store::SharedStore;

pub struct FixedWindowLimiter {
    store: Arc<dyn SharedStore>,
    window: Duration,
    max_requests: u32,
    key_prefix: String,
    fail_open: bool,
}

impl FixedWindowLimiter {
    pub fn new(
        store: Arc<dyn SharedStore>,
        window: Duration,
        max_requests: u32,
        key_prefix: &str,
        fail_open: bool,
    ) -> Self {
        Self {
            store,
            window,
            max_requests,
            key_prefix: key_prefix.to_string(),
            fail_open,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count this request against the caller's window.
    ///
    /// When the shared store is unreachable and `fail_open` is set, the
    /// request is allowed with `remaining = 1`: losing the counting backend
    /// degrades to unlimited throughput rather than denying all traffic.
    pub async fn check(&self, key: &str) -> Result<RateLimitDecision, GatewayError> {
        match self.count(key).await {
            Ok(decision) => Ok(decision),
            Err(err) if self.fail_open => {
                tracing::warn!(error = %err, "Rate limit store unreachable, failing open");
                Ok(RateLimitDecision {
                    allowed: true,
                    remaining: 1,
                    reset_at: Utc::now()
                        + chrono::Duration::from_std(self.window).unwrap_or_default(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn count(&self, key: &str) -> Result<RateLimitDecision, GatewayError> {
        let counter_key = format!("{}:{}", self.key_prefix, key);

        let count = self.store.incr(&counter_key).await?;
        if count == 1 {
            // Only point where a new window is opened. Re-running this
            // under the first-increment race is idempotent.
            self.store.expire(&counter_key, self.window).await?;
        }

        let remaining_ttl = self
            .store
            .ttl(&counter_key)
            .await?
            .unwrap_or(self.window);

        let count = u32::try_from(count).unwrap_or(u32::MAX);
        Ok(RateLimitDecision {
            allowed: count <= self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset_at: Utc::now() + chrono::Duration::from_std(remaining_ttl).unwrap_or_default(),
        })
    }
}
