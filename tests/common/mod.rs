//! Shared utilities for gateway integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reskflow_gateway::config::{GatewayConfig, ServiceConfig};
use reskflow_gateway::server::{GatewayServer, GatewayState};
use reskflow_gateway::store::{MemoryStore, SharedStore};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Build a gateway on the in-memory store, spawn it on `gateway_addr`, and
/// hand back its state for direct manipulation in tests.
pub async fn start_gateway(gateway_addr: SocketAddr, config: GatewayConfig) -> GatewayState {
    start_gateway_with_store(gateway_addr, config, Arc::new(MemoryStore::new())).await
}

/// Same as [`start_gateway`] but with a caller-supplied shared store.
pub async fn start_gateway_with_store(
    gateway_addr: SocketAddr,
    config: GatewayConfig,
    store: Arc<dyn SharedStore>,
) -> GatewayState {
    let server = GatewayServer::new(&config, store).unwrap();
    let state = server.state().clone();

    let listener = TcpListener::bind(gateway_addr).await.unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    state
}

/// A single-instance config pointing one service at one backend.
#[allow(dead_code)]
pub fn single_backend_config(service: &str, backend_addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.redis.enabled = false;
    config.services.push(ServiceConfig {
        name: service.to_string(),
        instances: vec![format!("http://{backend_addr}")],
    });
    config
}

#[allow(dead_code)]
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
