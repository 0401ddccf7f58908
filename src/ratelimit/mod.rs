//! Rate limiting subsystem.
//!
//! Two interchangeable algorithms behind one contract:
//! - `fixed_window.rs`: distributed counters in the shared store, consistent
//!   across gateway processes, allows up to 2×max across a window boundary
//! - `sliding_window.rs`: precise in-process trailing window, not shared
//!   across processes
//!
//! They are alternative strategies selected by configuration, not layered:
//! the fixed window is the default for multi-instance deployments, the
//! sliding window fits single-instance topologies and soft limits.

use chrono::{DateTime, Utc};

pub mod fixed_window;
pub mod middleware;
pub mod sliding_window;

pub use fixed_window::FixedWindowLimiter;
pub use sliding_window::SlidingWindowLimiter;

use crate::error::GatewayError;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// When the current window ends and the quota resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window resets, floored at zero.
    pub fn retry_after_secs(&self) -> u64 {
        (self.reset_at - Utc::now()).num_seconds().max(0) as u64
    }
}

/// The configured limiter strategy.
pub enum RateLimiter {
    Fixed(FixedWindowLimiter),
    Sliding(SlidingWindowLimiter),
}

impl RateLimiter {
    pub async fn check(&self, key: &str) -> Result<RateLimitDecision, GatewayError> {
        match self {
            RateLimiter::Fixed(limiter) => limiter.check(key).await,
            RateLimiter::Sliding(limiter) => Ok(limiter.check(key)),
        }
    }

    pub fn max_requests(&self) -> u32 {
        match self {
            RateLimiter::Fixed(limiter) => limiter.max_requests(),
            RateLimiter::Sliding(limiter) => limiter.max_requests(),
        }
    }
}
