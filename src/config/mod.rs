//! Configuration subsystem: schema, loading, and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_config;
pub use validation::{validate_config, ValidationError};
pub use schema::{
    AuthConfig, CircuitBreakerConfig, CryptoConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RedisConfig, ServiceConfig, ThreatConfig,
};
