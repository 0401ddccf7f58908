//! Circuit breaker behavior through the full proxy path.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

#[tokio::test]
async fn breaker_opens_after_five_failures_and_recovers_via_probe() {
    let backend_addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29182".parse().unwrap();

    let backend_calls = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(false));
    let (calls, health) = (backend_calls.clone(), healthy.clone());
    common::start_programmable_backend(backend_addr, move || {
        let calls = calls.clone();
        let health = health.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if health.load(Ordering::SeqCst) {
                (200, "ok".into())
            } else {
                (500, "boom".into())
            }
        }
    })
    .await;

    let mut config = common::single_backend_config("orders", backend_addr);
    config.circuit_breaker.reset_timeout_secs = 1;
    common::start_gateway(gateway_addr, config).await;

    let client = common::test_client();
    let url = format!("http://{gateway_addr}/orders/health");

    // Five backend failures flow through and trip the breaker.
    for _ in 0..5 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 500);
    }
    assert_eq!(backend_calls.load(Ordering::SeqCst), 5);

    // Open circuit: fail fast, backend never contacted.
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert!(res.headers().contains_key("retry-after"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["service"], "orders");
    assert_eq!(backend_calls.load(Ordering::SeqCst), 5);

    // After the reset timeout a single probe goes through and, on success,
    // closes the circuit for everyone.
    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(backend_calls.load(Ordering::SeqCst), 6);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn failed_probe_reopens_the_circuit() {
    let backend_addr: SocketAddr = "127.0.0.1:29183".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29184".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async { (500, "boom".into()) }).await;

    let mut config = common::single_backend_config("orders", backend_addr);
    config.circuit_breaker.reset_timeout_secs = 1;
    common::start_gateway(gateway_addr, config).await;

    let client = common::test_client();
    let url = format!("http://{gateway_addr}/orders/x");

    for _ in 0..5 {
        client.get(&url).send().await.unwrap();
    }
    assert_eq!(client.get(&url).send().await.unwrap().status(), 503);

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    // Probe reaches the still-broken backend.
    assert_eq!(client.get(&url).send().await.unwrap().status(), 500);
    // Back to failing fast.
    assert_eq!(client.get(&url).send().await.unwrap().status(), 503);
}

#[tokio::test]
async fn unknown_service_is_a_404() {
    let gateway_addr: SocketAddr = "127.0.0.1:29185".parse().unwrap();
    let mut config = reskflow_gateway::config::GatewayConfig::default();
    config.redis.enabled = false;
    common::start_gateway(gateway_addr, config).await;

    let client = common::test_client();
    let res = client
        .get(format!("http://{gateway_addr}/ghosts/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
