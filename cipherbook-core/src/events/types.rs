//! Event type definitions for the lifecycle coordinator.
//!
//! Events are ephemeral. They carry identifiers and chain data, never
//! order state; whoever handles one re-reads the order from the store.

use alloy_primitives::TxHash;

use crate::chain::{HookLog, TransactionReceipt};
use crate::entities::{Handle, OrderId};

/// What a watched transaction is being watched for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchBinding {
    /// The order's own placement transaction: confirms the order and may
    /// also settle it.
    Submission { order_id: OrderId },
    /// A transaction submitted by anyone (swap, flush) that may settle or
    /// fail queued orders.
    Trigger,
}

impl std::fmt::Display for WatchBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchBinding::Submission { order_id } => write!(f, "submission:{order_id}"),
            WatchBinding::Trigger => write!(f, "trigger"),
        }
    }
}

/// Emitted by a `ReceiptWatcher` once its transaction is mined.
#[derive(Debug, Clone)]
pub struct ReceiptResolved {
    pub tx: TxHash,
    pub receipt: TransactionReceipt,
}

/// Emitted by a `DecryptionPoller` after every successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionPoll {
    pub handle: Handle,
    pub decrypted: bool,
    /// 1-based number of the read that produced this result.
    pub attempt: u32,
}

/// Emitted by the `HookLogFollower` for every query that found logs.
#[derive(Debug, Clone)]
pub struct HookLogsFetched {
    pub from_block: u64,
    pub logs: Vec<HookLog>,
}

/// Requests handled by the coordinator task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// Watch `tx` as the order's placement transaction.
    TrackSubmission { order_id: OrderId, tx: TxHash },
    /// Watch `tx` for settlement and failure events of any order.
    WatchTrigger { tx: TxHash },
    /// Stop every watcher and poller of the order.
    Release { order_id: OrderId },
}

/// Results flowing from watchers and pollers back into the coordinator.
#[derive(Debug, Clone)]
pub enum LifecycleSignal {
    Receipt {
        binding: WatchBinding,
        resolved: ReceiptResolved,
    },
    Poll {
        order_id: OrderId,
        poll: DecryptionPoll,
    },
    HookLogs(HookLogsFetched),
}
