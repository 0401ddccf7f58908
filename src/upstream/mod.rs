//! Upstream service routing: round-robin balancing, circuit breaking,
//! and the proxy handler itself.

pub mod balancer;
pub mod circuit_breaker;
pub mod proxy;

pub use balancer::LoadBalancer;
pub use circuit_breaker::{CircuitBreakerRegistry, CircuitState};
pub use proxy::proxy_handler;
