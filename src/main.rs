//! Gateway binary: load config, wire subsystems, serve.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use reskflow_gateway::config::{load_config, GatewayConfig};
use reskflow_gateway::observability::{logging, metrics};
use reskflow_gateway::server::GatewayServer;
use reskflow_gateway::store::{MemoryStore, RedisStore, SharedStore};
use reskflow_gateway::threat::SecuritySignal;

#[derive(Parser, Debug)]
#[command(name = "reskflow-gateway", about = "ReskFlow API gateway security core")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    logging::init(&config.observability.log_level);
    tracing::info!("reskflow-gateway v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn SharedStore> = if config.redis.enabled {
        Arc::new(RedisStore::connect(&config.redis.url).await?)
    } else {
        tracing::warn!("Redis disabled, using in-memory store; state is not shared");
        Arc::new(MemoryStore::new())
    };

    let server = GatewayServer::new(&config, store)?;

    // Drain security signals into the log; a real deployment would forward
    // them to an alerting pipeline here.
    let mut signals = server.state().scorer.subscribe();
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(SecuritySignal::Alert { ip, count }) => {
                    tracing::warn!(ip = %ip, count, "Security alert")
                }
                Ok(SecuritySignal::IpBlocked { ip, reason }) => {
                    tracing::warn!(ip = %ip, reason = %reason, "IP block signal")
                }
                Ok(SecuritySignal::Event(event)) => {
                    tracing::debug!(event = ?event.event_type, ip = ?event.ip, "Security event")
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Security signal consumer lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
