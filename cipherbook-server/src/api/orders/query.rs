use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use cipherbook_core::entities::OrderId;
use cipherbook_sdk::objects::OrderResponse;

use super::super::{ApiError, to_response};
use crate::state::AppState;

/// `GET /orders`
pub(in crate::api) async fn list_orders(State(state): State<AppState>) -> impl IntoResponse {
    let orders: Vec<OrderResponse> = state
        .coordinator
        .list_orders()
        .iter()
        .map(|order| to_response(order))
        .collect();
    Json(orders)
}

/// `GET /orders/executing`
pub(in crate::api) async fn list_executing_orders(
    State(state): State<AppState>,
) -> impl IntoResponse {
    let orders: Vec<OrderResponse> = state
        .coordinator
        .list_executing_orders()
        .iter()
        .map(|order| to_response(order))
        .collect();
    Json(orders)
}

/// `GET /orders/{id}`
pub(in crate::api) async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = OrderId::from(id);
    let order = state
        .coordinator
        .get_order(&id)
        .ok_or(ApiError::NotFound(id))?;
    Ok(Json(to_response(&order)))
}
