//! Event channel factories and handles.

use super::types::{CoordinatorCommand, LifecycleSignal};
use tokio::sync::mpsc;

/// Default buffer size for the command channel.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for coordinator commands.
pub type CoordinatorCommandSender = mpsc::Sender<CoordinatorCommand>;
/// Receiver handle for coordinator commands.
pub type CoordinatorCommandReceiver = mpsc::Receiver<CoordinatorCommand>;

/// Sender handle for lifecycle signals.
///
/// Unbounded: signals are sent from synchronous callbacks and must never be
/// dropped. Each watcher resolves at most once and each poller sends one
/// signal per interval, so the backlog stays small.
pub type LifecycleSignalSender = mpsc::UnboundedSender<LifecycleSignal>;
/// Receiver handle for lifecycle signals.
pub type LifecycleSignalReceiver = mpsc::UnboundedReceiver<LifecycleSignal>;

/// Create a new coordinator command channel.
pub fn coordinator_command_channel() -> (CoordinatorCommandSender, CoordinatorCommandReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new lifecycle signal channel.
///
/// The coordinator owns the receiver and hands clones of the sender to the
/// callbacks of its watchers and pollers.
pub fn lifecycle_signal_channel() -> (LifecycleSignalSender, LifecycleSignalReceiver) {
    mpsc::unbounded_channel()
}
