//! Outbound proxying with breaker gating and instance rotation.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::server::GatewayState;

/// Main proxy handler: breaker gate → round-robin pick → forward → observe.
pub async fn proxy_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let path = request.uri().path().to_string();
    let method = request.method().to_string();

    let Some(service) = service_from_path(&path) else {
        return (StatusCode::NOT_FOUND, "No matching service").into_response();
    };
    let service = service.to_string();

    if !state.balancer.has_service(&service) {
        tracing::warn!(service = %service, path = %path, "Unknown service");
        metrics::record_request(&method, 404, &service, start_time);
        return (StatusCode::NOT_FOUND, "No matching service").into_response();
    }

    // Fail fast while the circuit is open; nothing reaches the backend.
    if state.breakers.is_open(&service) {
        tracing::warn!(service = %service, "Short-circuiting call, breaker open");
        metrics::record_request(&method, 503, &service, start_time);
        return GatewayError::ServiceUnavailable {
            service,
            retry_after: state.breakers.reset_timeout().as_secs(),
        }
        .into_response();
    }

    let Some(instance) = state.balancer.next_instance(&service) else {
        metrics::record_request(&method, 503, &service, start_time);
        return GatewayError::ServiceUnavailable {
            service,
            retry_after: state.breakers.reset_timeout().as_secs(),
        }
        .into_response();
    };

    let outbound = match build_outbound(request, &instance) {
        Ok(req) => req,
        Err(err) => {
            tracing::error!(service = %service, instance = %instance, error = %err, "Bad outbound request");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
        }
    };

    match state.client.request(outbound).await {
        Ok(response) => {
            let status = response.status();
            // Only 5xx counts against the breaker; 4xx is the client's
            // problem, not the backend's.
            if status.is_server_error() {
                state.breakers.record_failure(&service);
            } else {
                state.breakers.record_success(&service);
            }
            metrics::record_request(&method, status.as_u16(), &service, start_time);

            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Err(err) => {
            tracing::error!(service = %service, instance = %instance, error = %err, "Upstream error");
            state.breakers.record_failure(&service);
            metrics::record_request(&method, 502, &service, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// The first path segment names the target backend service.
fn service_from_path(path: &str) -> Option<&str> {
    let segment = path.trim_start_matches('/').split('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

fn build_outbound(
    request: Request<Body>,
    instance: &str,
) -> Result<Request<Body>, axum::http::Error> {
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target: Uri = format!("{}{}", instance.trim_end_matches('/'), path_and_query).parse()?;

    let mut builder = Request::builder().method(parts.method).uri(target);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            if name != header::HOST {
                headers.append(name.clone(), value.clone());
            }
        }
    }
    builder.body(body)
}
