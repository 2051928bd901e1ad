//! Caching HTTP/1.0 Forward Proxy
//!
//! Relays client GET requests for absolute URIs to the named origin and keeps
//! small responses in a bounded in-memory cache.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    FORWARD PROXY                     │
//!                      │                                                      │
//!   Client request     │  ┌──────────┐   ┌──────────────┐   ┌─────────────┐   │
//!   ───────────────────┼─▶│   net    │──▶│    http      │──▶│ uri/headers │   │
//!                      │  │ listener │   │   handler    │   │  parsing    │   │
//!                      │  └──────────┘   └──────┬───────┘   └─────────────┘   │
//!                      │                        │                             │
//!                      │                        ▼                             │
//!                      │                 ┌──────────────┐                     │
//!   Cached response    │                 │    cache     │                     │
//!   ◀──────────────────┼──── hit ────────│ (RwLock, LRU │                     │
//!                      │                 │  by recency) │                     │
//!                      │                 └──────┬───────┘                     │
//!                      │                   miss │            ┌────────────┐   │
//!   Relayed response   │                        └───────────▶│  origin    │───┼──▶ Origin
//!   ◀──────────────────┼─────────── streamed chunks ◀────────│  exchange  │◀──┼─── server
//!                      │                                     └────────────┘   │
//!                      │  ┌────────────────────────────────────────────────┐  │
//!                      │  │ config · observability · lifecycle             │  │
//!                      │  └────────────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use forward_proxy::config::{load_config, ProxyConfig};
use forward_proxy::lifecycle::{signals, Shutdown};
use forward_proxy::net::Listener;
use forward_proxy::observability::{logging, metrics};
use forward_proxy::{ProxyServer, ResponseCache};

#[derive(Parser)]
#[command(name = "forward-proxy")]
#[command(about = "Caching HTTP/1.0 forward proxy", long_about = None)]
struct Cli {
    /// Port to listen on (binds 0.0.0.0:<PORT> unless the config says otherwise).
    port: u16,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    config.listener.set_port(cli.port);

    logging::init_logging(&config.observability);
    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        cache_capacity_bytes = config.cache.total_capacity_bytes,
        max_object_bytes = config.cache.max_object_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let cache = Arc::new(ResponseCache::new(config.cache)?);
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server = ProxyServer::new(&config, cache);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::trigger_on_signal(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
