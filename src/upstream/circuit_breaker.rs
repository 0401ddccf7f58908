//! Per-backend circuit breaking.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: single probe testing recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count reaches threshold
//! Open → Half-Open: lazily, on the first call after reset_timeout
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! ```
//!
//! Breaker state is deliberately process-local: each gateway instance
//! learns backend health independently in exchange for zero coordination
//! latency on the hot path.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::observability::metrics;

/// Health state of one backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Breaker {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
}

impl Breaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
        }
    }
}

/// Registry of circuit breakers keyed by backend-service name.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Breaker>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreakerRegistry {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            breakers: DashMap::new(),
            failure_threshold,
            reset_timeout,
        }
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    /// Whether calls to the service must be short-circuited right now.
    ///
    /// Evaluates the open → half-open transition lazily: the call that
    /// finds the reset timeout elapsed is allowed through as the single
    /// probe, and the circuit stays half-open (short-circuiting everyone
    /// else) until that probe's outcome is recorded.
    pub fn is_open(&self, service: &str) -> bool {
        let mut breaker = self
            .breakers
            .entry(service.to_string())
            .or_insert_with(Breaker::new);

        match breaker.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed_enough = breaker
                    .last_failure_at
                    .is_some_and(|at| at.elapsed() > self.reset_timeout);
                if elapsed_enough {
                    breaker.state = CircuitState::HalfOpen;
                    tracing::info!(service = %service, "Circuit breaker half-open, probing");
                    metrics::record_breaker_transition(service, "half_open");
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record a successful response: failures reset and the circuit closes,
    /// whatever state it was in.
    pub fn record_success(&self, service: &str) {
        let mut breaker = self
            .breakers
            .entry(service.to_string())
            .or_insert_with(Breaker::new);

        if breaker.state != CircuitState::Closed {
            tracing::info!(service = %service, "Circuit breaker closed after recovery");
            metrics::record_breaker_transition(service, "closed");
        }
        breaker.state = CircuitState::Closed;
        breaker.failure_count = 0;
        breaker.last_failure_at = None;
    }

    /// Record a failed response (status ≥ 500 or transport error).
    pub fn record_failure(&self, service: &str) {
        let mut breaker = self
            .breakers
            .entry(service.to_string())
            .or_insert_with(Breaker::new);

        breaker.last_failure_at = Some(Instant::now());
        match breaker.state {
            CircuitState::Closed => {
                breaker.failure_count += 1;
                if breaker.failure_count >= self.failure_threshold {
                    breaker.state = CircuitState::Open;
                    tracing::warn!(
                        service = %service,
                        failures = breaker.failure_count,
                        "Circuit breaker opened"
                    );
                    metrics::record_breaker_transition(service, "open");
                }
            }
            CircuitState::HalfOpen => {
                // Probe failed: back to open with a fresh timeout.
                breaker.state = CircuitState::Open;
                tracing::warn!(service = %service, "Circuit breaker reopened after failed probe");
                metrics::record_breaker_transition(service, "open");
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, for metrics and admin introspection.
    pub fn state(&self, service: &str) -> CircuitState {
        self.breakers
            .get(service)
            .map(|b| b.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Current consecutive-failure count.
    pub fn failure_count(&self, service: &str) -> u32 {
        self.breakers
            .get(service)
            .map(|b| b.failure_count)
            .unwrap_or(0)
    }
}
