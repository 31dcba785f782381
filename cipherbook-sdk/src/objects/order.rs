//! Order views exposed to the presentation layer.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Coarse order status as seen by an order list.
///
/// Every non-terminal lifecycle stage maps to `Executing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Executing,
    Completed,
    Failed,
}

/// The two statuses a caller may set on an order directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Completed,
    Failed,
}

impl From<TerminalStatus> for OrderStatus {
    fn from(value: TerminalStatus) -> Self {
        match value {
            TerminalStatus::Completed => OrderStatus::Completed,
            TerminalStatus::Failed => OrderStatus::Failed,
        }
    }
}

/// Fine-grained lifecycle stage of a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Created,
    AwaitingConfirmation,
    Confirmed,
    AwaitingDecryption,
    Decrypted,
    Queued,
    Settled,
    Failed,
}

/// State of one step in the confirmation / decryption / settlement guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Step-by-step progress of an order, for rendering a transaction guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderProgress {
    pub confirmation: StepState,
    pub decryption: StepState,
    pub settlement: StepState,
}

/// A tracked order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    /// Ciphertext handle, once the placement event has been decoded.
    pub handle: Option<U256>,
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
    /// Creation time, unix seconds.
    pub timestamp: i64,
    pub submission_tx: Option<B256>,
    pub status: OrderStatus,
    pub stage: LifecycleStage,
    pub progress: OrderProgress,
}

impl OrderResponse {
    pub fn is_terminal(&self) -> bool {
        self.status != OrderStatus::Executing
    }
}
