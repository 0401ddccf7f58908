//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): proxy latency distribution
//! - `gateway_auth_failures_total` (counter): rejected bearer tokens
//! - `gateway_rate_limited_total` (counter): requests rejected by quota
//! - `gateway_breaker_transitions_total` (counter): circuit state changes by service, state
//! - `gateway_threat_alerts_total` (counter): per-IP alert threshold crossings
//! - `gateway_blocked_ips_total` (counter): IPs added to the blocklist

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(err) => tracing::error!(error = %err, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, service: &str, start_time: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string(),
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string(),
    )
    .record(start_time.elapsed().as_secs_f64());
}

pub fn record_auth_failure() {
    counter!("gateway_auth_failures_total").increment(1);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_breaker_transition(service: &str, state: &str) {
    counter!(
        "gateway_breaker_transitions_total",
        "service" => service.to_string(),
        "state" => state.to_string(),
    )
    .increment(1);
}

pub fn record_threat_alert() {
    counter!("gateway_threat_alerts_total").increment(1);
}

pub fn record_ip_blocked() {
    counter!("gateway_blocked_ips_total").increment(1);
}
