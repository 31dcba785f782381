//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `GET    /orders`                            – list all orders
//! - `GET    /orders/executing`                  – list orders still executing
//! - `GET    /orders/{id}`                       – one order
//! - `POST   /orders`                            – place a market order
//! - `POST   /orders/track`                      – track an order submitted elsewhere
//! - `POST   /orders/adopt`                      – resume an order known by handle
//! - `PUT    /orders/{id}/status`                – set a terminal status
//! - `PUT    /orders/by-handle/{handle}/status`  – same, by handle
//! - `DELETE /orders/{id}/tracking`              – release watchers and pollers
//! - `GET    /orders/{id}/ws`                    – WebSocket progress stream
//! - `POST   /swaps`, `POST /swaps/track`, `POST /flush`

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use cipherbook_core::desk::DeskError;
use cipherbook_core::entities::{Order, OrderId};
use cipherbook_core::processors::CoordinatorError;
use cipherbook_core::store::StoreError;
use cipherbook_sdk::objects::OrderResponse;

use crate::state::AppState;

mod orders;
mod swaps;

/// Build the API router, nested under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            get(orders::query::list_orders).post(orders::submit::place_market_order),
        )
        .route("/orders/executing", get(orders::query::list_executing_orders))
        .route("/orders/track", post(orders::submit::track_order))
        .route("/orders/adopt", post(orders::submit::adopt_order))
        .route("/orders/{id}", get(orders::query::get_order))
        .route("/orders/{id}/status", put(orders::status::update_order_status))
        .route(
            "/orders/by-handle/{handle}/status",
            put(orders::status::update_order_status_by_handle),
        )
        .route(
            "/orders/{id}/tracking",
            delete(orders::status::release_order),
        )
        .route("/orders/{id}/ws", get(orders::ws::order_progress_ws))
        .route("/swaps", post(swaps::swap))
        .route("/swaps/track", post(swaps::track_transaction))
        .route("/flush", post(swaps::flush_order))
}

fn to_response(order: &Order) -> OrderResponse {
    OrderResponse::from(order)
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
enum ApiError {
    /// The requested order does not exist.
    NotFound(OrderId),
    /// Duplicate id, handle held by another order, or a transaction the
    /// order is not waiting on.
    Conflict(String),
    /// The request body or path could not be used as given.
    BadRequest(String),
    /// The node rejected a write.
    Chain(String),
    /// The coordinator task is gone.
    Unavailable,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            other => ApiError::Conflict(other.to_string()),
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::Store(e) => e.into(),
            CoordinatorError::Stopped => ApiError::Unavailable,
        }
    }
}

impl From<DeskError> for ApiError {
    fn from(e: DeskError) -> Self {
        match e {
            DeskError::Coordinator(e) => e.into(),
            DeskError::Chain(e) => ApiError::Chain(e.to_string()),
            e @ DeskError::AmountOutOfRange(_) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("order {id} not found")).into_response()
            }
            ApiError::Conflict(reason) => (StatusCode::CONFLICT, reason).into_response(),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
            ApiError::Chain(reason) => {
                tracing::warn!(reason = %reason, "Chain write rejected");
                (StatusCode::BAD_GATEWAY, reason).into_response()
            }
            ApiError::Unavailable => {
                tracing::error!("Order lifecycle coordinator is not running");
                (StatusCode::SERVICE_UNAVAILABLE, "coordinator unavailable").into_response()
            }
        }
    }
}
