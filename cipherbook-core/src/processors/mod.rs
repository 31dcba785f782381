//! Lifecycle processors for confidential market orders.
//!
//! - `ReceiptWatcher`: waits for one transaction receipt at a time, reports
//!   it once
//! - `DecryptionPoller`: polls the decryption status of a handle until it
//!   reports `true`
//! - `HookLogFollower`: queries the hook's settlement and failure logs on an
//!   interval, reports every new batch
//! - `SettlementCorrelator`: receives `CorrelateReceipt` and
//!   `CorrelateHookLogs`, confirms placements and resolves orders by handle
//! - `OrderLifecycleCoordinator`: owns the watchers and pollers, receives
//!   `CoordinatorCommand`s, drives orders through their stages

pub mod coordinator;
pub mod decryption_poller;
pub mod hook_log_follower;
pub mod receipt_watcher;
pub mod settlement_correlator;

pub use coordinator::{
    CoordinatorError, CoordinatorHandle, CoordinatorSettings, OrderLifecycleCoordinator,
};
pub use decryption_poller::DecryptionPoller;
pub use hook_log_follower::HookLogFollower;
pub use receipt_watcher::ReceiptWatcher;
pub use settlement_correlator::{
    CorrelateHookLogs, CorrelateReceipt, CorrelationReport, HookLogReport,
    PROCESSED_RECEIPTS_CAPACITY, ResolvedOrder, SettlementCorrelator,
};
