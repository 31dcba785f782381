use std::fmt;

use alloy_primitives::TxHash;
use cipherbook_sdk::objects::{OrderProgress, OrderResponse, OrderStatus};
use serde::{Deserialize, Serialize};

use super::Handle;
use super::lifecycle::Stage;

/// Caller-assigned order identity, stable regardless of chain state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh time-ordered id for orders whose caller did not pick one.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Descriptive fields of an order about to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: Option<OrderId>,
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
}

impl NewOrder {
    pub fn into_order(self) -> Order {
        Order {
            id: self.id.unwrap_or_else(OrderId::generate),
            handle: None,
            amount: self.amount,
            from_token: self.from_token,
            to_token: self.to_token,
            timestamp: time::OffsetDateTime::now_utc(),
            submission_tx: None,
            stage: Stage::Created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    /// Assigned from the placement event; immutable once set.
    pub handle: Option<Handle>,
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
    /// Creation time. Never changes.
    pub timestamp: time::OffsetDateTime,
    /// The placement transaction this order is waiting on.
    pub submission_tx: Option<TxHash>,
    pub stage: Stage,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        self.stage.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn progress(&self) -> OrderProgress {
        self.stage.progress(self.handle.is_some())
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            id: order.id.to_string(),
            handle: order.handle,
            amount: order.amount.clone(),
            from_token: order.from_token.clone(),
            to_token: order.to_token.clone(),
            timestamp: order.timestamp.unix_timestamp(),
            submission_tx: order.submission_tx,
            status: order.status(),
            stage: order.stage.into(),
            progress: order.progress(),
        }
    }
}
