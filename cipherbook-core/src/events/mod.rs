//! Event system for the lifecycle coordinator.
//!
//! # Event Flow
//!
//! 1. Callers send `CoordinatorCommand`s -> `OrderLifecycleCoordinator`
//! 2. The coordinator starts `ReceiptWatcher`s, which emit `ReceiptResolved`
//! 3. `SettlementCorrelator` turns receipts into store updates
//! 4. The coordinator starts `DecryptionPoller`s, which emit `DecryptionPoll`
//! 5. While executing orders hold a handle, the `HookLogFollower` emits
//!    `HookLogsFetched`, also correlated by the `SettlementCorrelator`
//!
//! Watchers and pollers report through `LifecycleSignal`s, so every store
//! mutation caused by them happens on the coordinator task.

pub mod channels;
pub mod types;

pub use channels::{
    CoordinatorCommandReceiver, CoordinatorCommandSender, DEFAULT_CHANNEL_BUFFER,
    LifecycleSignalReceiver, LifecycleSignalSender, coordinator_command_channel,
    lifecycle_signal_channel,
};

pub use types::{
    CoordinatorCommand, DecryptionPoll, HookLogsFetched, LifecycleSignal, ReceiptResolved,
    WatchBinding,
};
