//! Rate limiting middleware.
//!
//! Keys authenticated requests by user id and anonymous ones by client IP.
//! Quota headers go out on every response; rejections get a 429 with
//! `Retry-After` and raise a `rate_limit_exceeded` security event.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::AuthContext;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::ratelimit::RateLimitDecision;
use crate::server::{client_ip, GatewayState};
use crate::threat::{SecurityEvent, SecurityEventType};

pub async fn rate_limit_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = match request.extensions().get::<AuthContext>() {
        Some(ctx) => format!("user:{}", ctx.user_id),
        None => format!("ip:{}", client_ip(&request)),
    };

    let decision = match state.limiter.check(&key).await {
        Ok(decision) => decision,
        Err(err) => return err.into_response(),
    };

    if !decision.allowed {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();

        let ip = client_ip(&request);
        let event = SecurityEvent::new(SecurityEventType::RateLimitExceeded)
            .with_ip(&ip)
            .with_details(serde_json::json!({ "path": request.uri().path() }));
        if let Err(err) = state.scorer.log_security_event(event).await {
            tracing::warn!(error = %err, "Failed to record rate-limit security event");
        }

        let retry_after = decision.retry_after_secs();
        let mut response =
            GatewayError::RateLimitExceeded { retry_after }.into_response();
        apply_quota_headers(&mut response, state.limiter.max_requests(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_quota_headers(&mut response, state.limiter.max_requests(), &decision);
    response
}

fn apply_quota_headers(response: &mut Response, limit: u32, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    let reset_unix = decision.reset_at.timestamp().max(0);
    if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("x-ratelimit-limit", v);
    }
    if let Ok(v) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&reset_unix.to_string()) {
        headers.insert("x-ratelimit-reset", v);
    }
}
