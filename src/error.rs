//! Gateway error taxonomy.
//!
//! Every rejection surfaces as a structured JSON body with a stable `error`
//! message plus machine-readable fields (`service`, `retryAfter`, `threats`)
//! so API clients can distinguish failure causes without parsing prose.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by the resilience and security core.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, invalid, expired, or blacklisted token; dead session.
    /// Surfaced as 401, never retried automatically.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Role/permission/scope mismatch. Surfaced as 403 and logged as a
    /// `permission_denied` security event by the caller.
    #[error("permission denied: {0}")]
    Authorization(String),

    /// Too many failed login attempts for the account. Distinct from bad
    /// credentials: even a correct password is rejected while locked.
    #[error("account temporarily locked")]
    AccountLocked { retry_after: u64 },

    /// Quota exhausted for the current window.
    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after: u64 },

    /// Circuit breaker is open for the target backend. Fail-fast: the
    /// gateway does not retry against a known-bad backend.
    #[error("service {service} unavailable")]
    ServiceUnavailable { service: String, retry_after: u64 },

    /// Authenticated decryption failed. Fatal for the operation attempting
    /// it; silent corruption must never be returned as valid plaintext.
    #[error("decryption failed")]
    Decryption,

    /// Shared state store round-trip failed. The rate limiter handles this
    /// with its fail-open policy; everywhere else it is a hard error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration, rejected at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, retry_after, body) = match &self {
            GatewayError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                None,
                json!({ "error": msg }),
            ),
            GatewayError::Authorization(msg) => (
                StatusCode::FORBIDDEN,
                None,
                json!({ "error": msg }),
            ),
            GatewayError::AccountLocked { retry_after } => (
                StatusCode::LOCKED,
                Some(*retry_after),
                json!({ "error": "account temporarily locked", "retryAfter": retry_after }),
            ),
            GatewayError::RateLimitExceeded { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                Some(*retry_after),
                json!({ "error": "rate limit exceeded", "retryAfter": retry_after }),
            ),
            GatewayError::ServiceUnavailable { service, retry_after } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Some(*retry_after),
                json!({
                    "error": "service temporarily unavailable",
                    "service": service,
                    "retryAfter": retry_after,
                }),
            ),
            GatewayError::Decryption => (
                StatusCode::INTERNAL_SERVER_ERROR,
                None,
                json!({ "error": "decryption failed" }),
            ),
            GatewayError::Store(_) => (
                StatusCode::BAD_GATEWAY,
                None,
                json!({ "error": "shared state store unavailable" }),
            ),
            GatewayError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                None,
                json!({ "error": msg }),
            ),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
