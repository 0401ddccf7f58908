//! Rate limiting, authentication, and IP blocking through the middleware
//! chain.

use std::net::SocketAddr;

use reskflow_gateway::auth::{Role, TokenType};
use reskflow_gateway::store::{SharedStore, StoreError};

mod common;

#[tokio::test]
async fn quota_headers_flow_and_excess_requests_get_429() {
    let backend_addr: SocketAddr = "127.0.0.1:29281".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29282".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async { (200, "ok".into()) }).await;

    let mut config = common::single_backend_config("orders", backend_addr);
    config.rate_limit.max_requests = 3;
    common::start_gateway(gateway_addr, config).await;

    let client = common::test_client();
    let url = format!("http://{gateway_addr}/orders/1");

    for expected_remaining in ["2", "1", "0"] {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["x-ratelimit-limit"], "3");
        assert_eq!(res.headers()["x-ratelimit-remaining"], expected_remaining);
        assert!(res.headers().contains_key("x-ratelimit-reset"));
    }

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert!(res.headers().contains_key("retry-after"));
    assert_eq!(res.headers()["x-ratelimit-remaining"], "0");
}

#[tokio::test]
async fn authenticated_and_anonymous_clients_are_limited_separately() {
    let backend_addr: SocketAddr = "127.0.0.1:29283".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29284".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async { (200, "ok".into()) }).await;

    let mut config = common::single_backend_config("orders", backend_addr);
    config.rate_limit.max_requests = 2;
    let state = common::start_gateway(gateway_addr, config).await;

    let token = state
        .tokens
        .issue_token("user-42", Role::Customer, TokenType::Access, None)
        .unwrap();

    let client = common::test_client();
    let url = format!("http://{gateway_addr}/orders/1");

    // Exhaust the anonymous (per-IP) quota.
    for _ in 0..2 {
        assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    }
    assert_eq!(client.get(&url).send().await.unwrap().status(), 429);

    // The authenticated user has their own bucket.
    let res = client
        .get(&url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn invalid_bearer_token_is_rejected_with_401() {
    let backend_addr: SocketAddr = "127.0.0.1:29285".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29286".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async { (200, "ok".into()) }).await;
    common::start_gateway(
        gateway_addr,
        common::single_backend_config("orders", backend_addr),
    )
    .await;

    let client = common::test_client();
    let res = client
        .get(format!("http://{gateway_addr}/orders/1"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 401);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid or expired token");
}

#[tokio::test]
async fn blocked_ip_is_refused_before_reaching_the_backend() {
    let backend_addr: SocketAddr = "127.0.0.1:29287".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29288".parse().unwrap();

    let backend_calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let calls = backend_calls.clone();
    common::start_programmable_backend(backend_addr, move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            (200, "ok".into())
        }
    })
    .await;

    let state = common::start_gateway(
        gateway_addr,
        common::single_backend_config("orders", backend_addr),
    )
    .await;

    state.scorer.block_ip("127.0.0.1", "test block").await.unwrap();

    let client = common::test_client();
    let res = client
        .get(format!("http://{gateway_addr}/orders/1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 403);
    assert_eq!(backend_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// Store whose every command fails, standing in for a Redis outage.
struct DownStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("down".into()))
}

#[async_trait::async_trait]
impl SharedStore for DownStore {
    async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        down()
    }
    async fn set_ex(&self, _: &str, _: &str, _: std::time::Duration) -> Result<(), StoreError> {
        down()
    }
    async fn del(&self, _: &str) -> Result<(), StoreError> {
        down()
    }
    async fn exists(&self, _: &str) -> Result<bool, StoreError> {
        down()
    }
    async fn incr(&self, _: &str) -> Result<i64, StoreError> {
        down()
    }
    async fn expire(&self, _: &str, _: std::time::Duration) -> Result<(), StoreError> {
        down()
    }
    async fn ttl(&self, _: &str) -> Result<Option<std::time::Duration>, StoreError> {
        down()
    }
    async fn sadd(&self, _: &str, _: &str) -> Result<(), StoreError> {
        down()
    }
    async fn srem(&self, _: &str, _: &str) -> Result<(), StoreError> {
        down()
    }
    async fn smembers(&self, _: &str) -> Result<Vec<String>, StoreError> {
        down()
    }
    async fn rpush(&self, _: &str, _: &str) -> Result<(), StoreError> {
        down()
    }
}

#[tokio::test]
async fn blocklist_outage_honors_the_fail_open_flag() {
    let backend_addr: SocketAddr = "127.0.0.1:29291".parse().unwrap();
    let open_addr: SocketAddr = "127.0.0.1:29292".parse().unwrap();
    let closed_addr: SocketAddr = "127.0.0.1:29293".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async { (200, "ok".into()) }).await;

    // Default policy: a dead store degrades to admitting traffic.
    let config = common::single_backend_config("orders", backend_addr);
    common::start_gateway_with_store(open_addr, config, std::sync::Arc::new(DownStore)).await;

    let client = common::test_client();
    let res = client
        .get(format!("http://{open_addr}/orders/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Fail-closed: the same outage refuses traffic instead.
    let mut config = common::single_backend_config("orders", backend_addr);
    config.threat.fail_open = false;
    common::start_gateway_with_store(closed_addr, config, std::sync::Arc::new(DownStore)).await;

    let res = client
        .get(format!("http://{closed_addr}/orders/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn health_endpoint_answers_locally() {
    let gateway_addr: SocketAddr = "127.0.0.1:29289".parse().unwrap();
    let mut config = reskflow_gateway::config::GatewayConfig::default();
    config.redis.enabled = false;
    common::start_gateway(gateway_addr, config).await;

    let client = common::test_client();
    let res = client
        .get(format!("http://{gateway_addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
