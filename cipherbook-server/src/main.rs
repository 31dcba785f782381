//! cipherbook server
//!
//! Tracks confidential market orders from placement through decryption to
//! settlement and serves their progress over HTTP and WebSocket.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use cipherbook_core::chain::{ChainClient, JsonRpcClient};
use cipherbook_core::desk::OrderDesk;
use cipherbook_core::events::coordinator_command_channel;
use cipherbook_core::processors::{
    CoordinatorHandle, CoordinatorSettings, OrderLifecycleCoordinator,
};
use cipherbook_core::store::OrderStore;
use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// cipherbook - confidential market order lifecycle server
#[derive(Parser, Debug)]
#[command(name = "cipherbook-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./cipherbook.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the JSON-RPC endpoint from the config file
    #[arg(long, env = "CIPHERBOOK_RPC_URL")]
    rpc_url: Option<Url>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting cipherbook-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = ConfigLoader::new(&args.config, args.listen, args.rpc_url);
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let chain = Arc::new(JsonRpcClient::new(&config.chain));
    chain.connect().await.map_err(|e| {
        tracing::error!("Failed to connect to {}: {}", config.chain.rpc_url, e);
        e
    })?;

    let store = OrderStore::new();
    let (command_tx, command_rx) = coordinator_command_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let coordinator = OrderLifecycleCoordinator::new(
        chain.clone(),
        store.clone(),
        CoordinatorSettings {
            poll_interval: config.poller.interval,
            market_order_hook: Some(config.chain.market_order_hook),
        },
    );
    let coordinator_task = tokio::spawn(coordinator.run(shutdown_rx, command_rx));

    let handle = CoordinatorHandle::new(store, command_tx);
    let desk = OrderDesk::new(
        chain,
        handle.clone(),
        config.pool.pool_key(config.chain.market_order_hook),
        config.swap,
    );
    let state = AppState::new(handle, desk);

    let router = build_router(state);
    let listen_addr = config.server.listen;
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Release every watcher and poller before exiting.
    let _ = shutdown_tx.send(true);
    if let Err(e) = coordinator_task.await {
        tracing::error!("Coordinator task failed: {}", e);
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cipherbook_core=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
