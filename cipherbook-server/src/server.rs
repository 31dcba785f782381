//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use alloy_primitives::Address;
use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use cipherbook_core::chain::{ChainClient, ChainSnapshot};
use cipherbook_core::processors::CoordinatorHandle;
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .nest("/api/v1", api::router())
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// `false` once the coordinator task has stopped; no order progresses
    /// after that.
    coordinator_running: bool,
    chain_id: Option<u64>,
    account: Option<Address>,
    orders: usize,
    executing_orders: usize,
    /// Bumped on every order change.
    store_version: u64,
}

fn health_report(coordinator: &CoordinatorHandle, chain: Option<ChainSnapshot>) -> HealthResponse {
    let book = coordinator.store().snapshot();
    let coordinator_running = coordinator.is_running();
    HealthResponse {
        status: if coordinator_running && chain.is_some() {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        coordinator_running,
        chain_id: chain.map(|snapshot| snapshot.chain_id),
        account: chain.map(|snapshot| snapshot.account),
        orders: book.len(),
        executing_orders: book.executing().count(),
        store_version: book.version(),
    }
}

/// Health check - 200 while the coordinator runs on a connected chain,
/// 503 otherwise. Either way the body reports the order counts.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = health_report(&state.coordinator, state.desk.chain().snapshot());
    let code = if report.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
