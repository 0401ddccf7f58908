//! Bearer token authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::permissions::Role;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::server::GatewayState;

/// Identity attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
    pub session_id: Option<String>,
}

/// Verify the `Authorization: Bearer` token when present and attach an
/// [`AuthContext`] extension. Requests without a token pass through
/// anonymous; whether a given route requires authentication is the route
/// table's decision, not this layer's.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    let Some(token) = bearer else {
        return next.run(request).await;
    };

    match state.tokens.verify_token(&token).await {
        Ok(payload) => {
            request.extensions_mut().insert(AuthContext {
                user_id: payload.sub,
                role: payload.role,
                session_id: payload.session_id,
            });
            next.run(request).await
        }
        Err(err @ GatewayError::Authentication(_)) => {
            tracing::debug!(path = %request.uri().path(), "Rejected bearer token");
            metrics::record_auth_failure();
            err.into_response()
        }
        Err(err) => err.into_response(),
    }
}
