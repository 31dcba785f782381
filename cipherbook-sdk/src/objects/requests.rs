//! Request and response bodies for the order and swap endpoints.

use alloy_primitives::{B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use super::order::{OrderResponse, TerminalStatus};

/// An encrypted input as produced by the confidential-computation library.
///
/// `ct_hash` is the ciphertext handle the order will later be correlated by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub ct_hash: U256,
    pub security_zone: u8,
    pub utype: u8,
    pub signature: Bytes,
}

/// `POST /orders`: submit a confidential market order through the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceMarketOrderRequest {
    /// Caller-assigned id. Generated by the server when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
    /// Direction on the pool: `true` sells currency0 for currency1.
    pub zero_for_one: bool,
    pub encrypted_input: EncryptedInput,
}

/// `POST /orders/track`: track an order whose transaction was submitted
/// by the caller's own wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOrderRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
    pub transaction_hash: B256,
}

/// `POST /orders/adopt`: resume tracking an order from a previous session
/// that is only known by its handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptOrderRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub handle: U256,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub from_token: String,
    #[serde(default)]
    pub to_token: String,
    /// Whether the handle is already known to be decrypted.
    #[serde(default)]
    pub decrypted: bool,
}

/// `PUT /orders/{id}/status` and `PUT /orders/by-handle/{handle}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TerminalStatus,
}

/// Result of a status update. `changed` is `false` when the update was a
/// no-op (unknown handle, same status, or order already terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub changed: bool,
    pub order: Option<OrderResponse>,
}

/// `POST /swaps`: exact-input swap on the configured pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub zero_for_one: bool,
    /// Input amount in the token's smallest unit.
    pub amount_in: U256,
}

/// `POST /swaps/track`: watch a transaction submitted by anyone for
/// settlement and failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTransactionRequest {
    pub transaction_hash: B256,
}

/// Response for endpoints that submit a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSubmitted {
    pub transaction_hash: B256,
    /// The order the transaction belongs to, for market order submissions.
    #[serde(default)]
    pub order: Option<OrderResponse>,
}
