use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use cipherbook_core::chain::contracts::InEuint128;
use cipherbook_core::desk::PlacedOrder;
use cipherbook_core::entities::{NewOrder, OrderId};
use cipherbook_sdk::objects::{
    AdoptOrderRequest, PlaceMarketOrderRequest, TrackOrderRequest, TransactionSubmitted,
};

use super::super::{ApiError, to_response};
use crate::state::AppState;

/// `POST /orders`: submit `placeMarketOrder` from the configured account
/// and track the transaction.
pub(in crate::api) async fn place_market_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceMarketOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = NewOrder {
        id: request.id.map(OrderId::from),
        amount: request.amount,
        from_token: request.from_token,
        to_token: request.to_token,
    };
    let input = InEuint128::from(&request.encrypted_input);

    let PlacedOrder { tx, order } = state
        .desk
        .place_market_order(order, request.zero_for_one, &input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionSubmitted {
            transaction_hash: tx,
            order: Some(to_response(&order)),
        }),
    ))
}

/// `POST /orders/track`: the caller submitted the placement itself.
pub(in crate::api) async fn track_order(
    State(state): State<AppState>,
    Json(request): Json<TrackOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.coordinator.add_async_order(NewOrder {
        id: request.id.map(OrderId::from),
        amount: request.amount,
        from_token: request.from_token,
        to_token: request.to_token,
    })?;
    let order = state
        .coordinator
        .track_submission(&order.id, request.transaction_hash)
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(&order))))
}

/// `POST /orders/adopt`: resume an order from a previous session.
pub(in crate::api) async fn adopt_order(
    State(state): State<AppState>,
    Json(request): Json<AdoptOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.coordinator.adopt_order(
        NewOrder {
            id: request.id.map(OrderId::from),
            amount: request.amount,
            from_token: request.from_token,
            to_token: request.to_token,
        },
        request.handle,
        request.decrypted,
    )?;

    Ok((StatusCode::CREATED, Json(to_response(&order))))
}
