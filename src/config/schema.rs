//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML config files,
//! with per-section defaults so a minimal file is enough to boot.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Shared state store (Redis) settings.
    pub redis: RedisConfig,

    /// Token, session, and login-lockout settings.
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Threat scoring and IP blocking settings.
    pub threat: ThreatConfig,

    /// Envelope encryption key material.
    pub crypto: CryptoConfig,

    /// Backend service definitions (name → instance URLs).
    pub services: Vec<ServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shared store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// When false, a process-local in-memory store is used instead.
    /// Only acceptable for single-instance deployments.
    pub enabled: bool,

    /// Connection URL (redis:// or rediss://).
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Token, session, and lockout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for bearer tokens.
    pub jwt_secret: String,

    /// Access token lifetime in minutes.
    pub access_token_ttl_mins: i64,

    /// Refresh token lifetime in days.
    pub refresh_token_ttl_days: i64,

    /// Session lifetime in days; sliding, refreshed on every lookup.
    pub session_ttl_days: u64,

    /// Failed logins within the window before the account locks.
    pub lockout_max_failures: i64,

    /// Window for counting failed logins, in seconds.
    pub lockout_window_secs: u64,

    /// How long a locked account stays locked, in seconds.
    pub lockout_duration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            access_token_ttl_mins: 15,
            refresh_token_ttl_days: 7,
            session_ttl_days: 30,
            lockout_max_failures: 5,
            lockout_window_secs: 900,
            lockout_duration_secs: 1800,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable the rate-limit middleware.
    pub enabled: bool,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per key per window.
    pub max_requests: u32,

    /// Prefix for counter keys in the shared store.
    pub key_prefix: String,

    /// Allow traffic through when the shared store is unreachable.
    /// Deliberate policy: availability over strict quota enforcement.
    pub fail_open: bool,

    /// Use the in-process sliding-window limiter instead of the distributed
    /// fixed-window counter. Precise but not shared across processes; only
    /// for single-instance deployments or soft limits.
    pub sliding: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 100,
            key_prefix: "rl".to_string(),
            fail_open: true,
            sliding: false,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before allowing a probe.
    pub reset_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 30,
        }
    }
}

/// Threat scoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreatConfig {
    /// Suspicious events per IP within the window before an operator alert.
    pub alert_threshold: i64,

    /// Suspicious events per IP within the window before the IP is blocked.
    pub block_threshold: i64,

    /// Rolling window for the per-IP counter, in seconds.
    pub counter_ttl_secs: u64,

    /// How long a blocked IP stays blocked, in seconds.
    pub block_ttl_secs: u64,

    /// Maximum serialized request payload length accepted by input scanning.
    pub max_payload_length: usize,

    /// Allow traffic through when the blocklist lookup fails.
    /// Same availability trade-off as `rate_limit.fail_open`.
    pub fail_open: bool,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            alert_threshold: 5,
            block_threshold: 10,
            counter_ttl_secs: 3600,
            block_ttl_secs: 86400,
            max_payload_length: 10_000,
            fail_open: true,
        }
    }
}

/// Envelope encryption configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Hex-encoded 32-byte AES-256-GCM key.
    pub key_hex: String,

    /// Fixed salt appended before hashing values for comparison.
    pub hash_salt: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            key_hex: "0000000000000000000000000000000000000000000000000000000000000000"
                .to_string(),
            hash_salt: "reskflow".to_string(),
        }
    }
}

/// A backend service and its instance URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name, matched against the first request path segment.
    pub name: String,

    /// Instance base URLs (e.g., "http://127.0.0.1:3001").
    pub instances: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
