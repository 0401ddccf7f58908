//! IP block enforcement, first in the middleware chain.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::server::{client_ip, GatewayState};

pub async fn ip_block_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match state.scorer.is_ip_blocked(&ip).await {
        Ok(true) => {
            tracing::warn!(ip = %ip, path = %request.uri().path(), "Rejected blocked IP");
            (
                StatusCode::FORBIDDEN,
                axum::Json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Access denied",
                })),
            )
                .into_response()
        }
        Ok(false) => next.run(request).await,
        Err(err) if state.scorer.fail_open() => {
            tracing::warn!(error = %err, "Block lookup failed, allowing request");
            next.run(request).await
        }
        Err(err) => {
            tracing::error!(error = %err, "Block lookup failed, refusing request");
            GatewayError::Store(err).into_response()
        }
    }
}
