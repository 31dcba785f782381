//! Swap and flush endpoints. Every submitted transaction is watched as a
//! trigger for settlement events.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use cipherbook_sdk::objects::{SwapRequest, TrackTransactionRequest, TransactionSubmitted};

use super::ApiError;
use crate::state::AppState;

fn submitted(transaction_hash: alloy_primitives::TxHash) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        Json(TransactionSubmitted {
            transaction_hash,
            order: None,
        }),
    )
}

/// `POST /swaps`
pub(super) async fn swap(
    State(state): State<AppState>,
    Json(request): Json<SwapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = state
        .desk
        .swap(request.zero_for_one, request.amount_in)
        .await?;
    Ok(submitted(tx))
}

/// `POST /swaps/track`
pub(super) async fn track_transaction(
    State(state): State<AppState>,
    Json(request): Json<TrackTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .coordinator
        .watch_trigger(request.transaction_hash)
        .await?;
    Ok(submitted(request.transaction_hash))
}

/// `POST /flush`
pub(super) async fn flush_order(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tx = state.desk.flush_order().await?;
    Ok(submitted(tx))
}
