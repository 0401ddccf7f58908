//! In-process sliding-window rate limiting.
//!
//! Keeps a per-key list of request timestamps pruned to the trailing window
//! on every check. Precise for arbitrary arrival patterns, including bursts,
//! but the state is process-local: acceptable only for single-instance
//! deployments or soft limits.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};

use crate::ratelimit::RateLimitDecision;

/// Probability of sweeping stale keys on any given check, to bound memory.
const SWEEP_PROBABILITY: f32 = 0.01;

pub struct SlidingWindowLimiter {
    windows: Mutex<HashMap<String, Vec<u64>>>,
    window_ms: u64,
    max_requests: u32,
}

impl SlidingWindowLimiter {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_ms,
            max_requests,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, now_ms())
    }

    /// Check against an explicit clock. The record only ever holds
    /// timestamps within `[now - window, now]`.
    fn check_at(&self, key: &str, now_ms: u64) -> RateLimitDecision {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");

        let decision = {
            let stamps = windows.entry(key.to_string()).or_default();
            stamps.retain(|&t| t > cutoff);

            if stamps.len() as u32 >= self.max_requests {
                // Oldest surviving timestamp decides when room opens up.
                let oldest = stamps.first().copied().unwrap_or(now_ms);
                RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_at: ms_to_datetime(oldest + self.window_ms),
                }
            } else {
                stamps.push(now_ms);
                RateLimitDecision {
                    allowed: true,
                    remaining: self.max_requests - stamps.len() as u32,
                    reset_at: ms_to_datetime(now_ms + self.window_ms),
                }
            }
        };

        // Opportunistic sweep of keys with no recent activity.
        if fastrand::f32() < SWEEP_PROBABILITY {
            windows.retain(|_, stamps| stamps.iter().any(|&t| t > cutoff));
        }

        decision
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn ms_to_datetime(ms: u64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .unwrap_or_else(Utc::now)
}
