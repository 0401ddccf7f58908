//! Shared key/value store abstraction.
//!
//! Sessions, token blacklists, distributed rate-limit counters, and threat
//! counters must be visible to every gateway process, so they live behind
//! this trait rather than in process memory. The Redis backend is the
//! production implementation; the in-memory backend exists for tests and
//! single-instance deployments.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors from the shared store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal command surface the security core needs from the shared store.
///
/// All operations are single round-trips. Counters use atomic INCR; the
/// TTL-setting step on a fresh counter is a separate command, which is
/// acceptable: re-setting the TTL under the narrow first-increment race is
/// idempotent.
#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value` with an expiry. Overwrites any previous value
    /// and TTL (this is what makes session expiration sliding).
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically increment an integer value, creating it at 1.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remaining TTL, or `None` when the key has no expiry or does not exist.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError>;

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Append to a list. Used for the durable security-event log.
    async fn rpush(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
