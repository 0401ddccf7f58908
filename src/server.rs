//! Server assembly: shared state, middleware chain, and the run loop.
//!
//! # Request Flow
//! ```text
//! request-id → TraceLayer → TimeoutLayer → ip_block → auth → rate_limit → proxy_handler
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::from_fn_with_state,
    routing::{any, get},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{auth_middleware, LoginGuard, SessionManager, TokenService, TokenTtls};
use crate::config::GatewayConfig;
use crate::crypto::CryptoEnvelope;
use crate::error::GatewayError;
use crate::ratelimit::{
    middleware::rate_limit_middleware, FixedWindowLimiter, RateLimiter, SlidingWindowLimiter,
};
use crate::store::SharedStore;
use crate::threat::{ip_block_middleware, InputValidator, SecuritySignal, ThreatScorer};
use crate::upstream::{proxy_handler, CircuitBreakerRegistry, LoadBalancer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct GatewayState {
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionManager>,
    pub login_guard: Arc<LoginGuard>,
    pub limiter: Arc<RateLimiter>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub balancer: Arc<LoadBalancer>,
    pub scorer: Arc<ThreatScorer>,
    pub validator: Arc<InputValidator>,
    pub crypto: Arc<CryptoEnvelope>,
    pub client: Client<HttpConnector, Body>,
}

/// The assembled gateway.
pub struct GatewayServer {
    router: Router,
    state: GatewayState,
}

impl GatewayServer {
    /// Wire every subsystem against the given shared store.
    pub fn new(config: &GatewayConfig, store: Arc<dyn SharedStore>) -> Result<Self, GatewayError> {
        let crypto = Arc::new(CryptoEnvelope::new(
            &config.crypto.key_hex,
            &config.crypto.hash_salt,
        )?);

        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&store),
            Duration::from_secs(config.auth.session_ttl_days * 24 * 60 * 60),
        ));
        let tokens = Arc::new(TokenService::new(
            &config.auth.jwt_secret,
            TokenTtls {
                access: chrono::Duration::minutes(config.auth.access_token_ttl_mins),
                refresh: chrono::Duration::days(config.auth.refresh_token_ttl_days),
            },
            Arc::clone(&store),
            Arc::clone(&sessions),
            Arc::clone(&crypto),
        ));
        let login_guard = Arc::new(LoginGuard::new(
            Arc::clone(&store),
            config.auth.lockout_max_failures,
            Duration::from_secs(config.auth.lockout_window_secs),
            Duration::from_secs(config.auth.lockout_duration_secs),
        ));

        let limiter = Arc::new(if config.rate_limit.sliding {
            RateLimiter::Sliding(SlidingWindowLimiter::new(
                config.rate_limit.window_secs * 1_000,
                config.rate_limit.max_requests,
            ))
        } else {
            RateLimiter::Fixed(FixedWindowLimiter::new(
                Arc::clone(&store),
                Duration::from_secs(config.rate_limit.window_secs),
                config.rate_limit.max_requests,
                &config.rate_limit.key_prefix,
                config.rate_limit.fail_open,
            ))
        });

        let breakers = Arc::new(CircuitBreakerRegistry::new(
            config.circuit_breaker.failure_threshold,
            Duration::from_secs(config.circuit_breaker.reset_timeout_secs),
        ));
        let balancer = Arc::new(LoadBalancer::from_config(&config.services));

        let (signals, _) = broadcast::channel::<SecuritySignal>(1024);
        let scorer = Arc::new(ThreatScorer::new(
            Arc::clone(&store),
            signals,
            &config.threat,
        ));
        let validator = Arc::new(InputValidator::new(&config.threat));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = GatewayState {
            tokens,
            sessions,
            login_guard,
            limiter,
            breakers,
            balancer,
            scorer,
            validator,
            crypto,
            client,
        };
        let router = Self::build_router(config, state.clone());
        Ok(Self { router, state })
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the Axum router. Layers run outermost-first: trace, timeout,
    /// then ip-block before auth before rate-limit, so a blocked IP never
    /// spends store round-trips on token checks.
    fn build_router(config: &GatewayConfig, state: GatewayState) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler));

        if config.rate_limit.enabled {
            router = router.layer(from_fn_with_state(state.clone(), rate_limit_middleware));
        }
        router
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .layer(from_fn_with_state(state.clone(), ip_block_middleware))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .with_state(state)
    }

    /// Accept connections until shutdown is signalled.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    } else {
        tracing::info!("Shutdown signal received");
    }
}

/// Client IP for rate-limit keys and threat scoring. Trusts the first
/// `X-Forwarded-For` entry (this gateway sits behind the edge LB), falling
/// back to the socket peer address.
pub(crate) fn client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
