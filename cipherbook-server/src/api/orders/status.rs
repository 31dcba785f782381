use std::str::FromStr;

use alloy_primitives::U256;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use cipherbook_core::entities::OrderId;
use cipherbook_core::store::StoreUpdate;
use cipherbook_sdk::objects::{StatusUpdateResponse, UpdateStatusRequest};

use super::super::{ApiError, to_response};
use crate::state::AppState;

fn to_update_response(update: &StoreUpdate) -> StatusUpdateResponse {
    StatusUpdateResponse {
        changed: update.is_changed(),
        order: update.order().map(|order| to_response(order)),
    }
}

/// `PUT /orders/{id}/status`
///
/// Updates on terminal orders are accepted and reported as unchanged.
pub(in crate::api) async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = state
        .coordinator
        .update_order_status(&OrderId::from(id), request.status)?;
    Ok(Json(to_update_response(&update)))
}

/// `PUT /orders/by-handle/{handle}/status`
///
/// `handle` is decimal or `0x` prefixed hex. Unknown handles are a no-op.
pub(in crate::api) async fn update_order_status_by_handle(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = U256::from_str(&handle)
        .map_err(|e| ApiError::BadRequest(format!("invalid handle {handle}: {e}")))?;
    let update = state
        .coordinator
        .update_order_status_by_handle(handle, request.status);
    Ok(Json(to_update_response(&update)))
}

/// `DELETE /orders/{id}/tracking`: stop watching and polling; the order
/// itself is kept.
pub(in crate::api) async fn release_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = OrderId::from(id);
    if state.coordinator.get_order(&id).is_none() {
        return Err(ApiError::NotFound(id));
    }
    state.coordinator.release(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
