//! DecryptionPoller.
//!
//! The DecryptionPoller is responsible for:
//! - Reading `getOrderDecryptStatus(handle)` on a fixed interval
//! - Reporting every successful read through its [`CallbackSlot`]
//! - Stopping itself for good after the first read that reports `true`
//!
//! Read errors are logged and the loop keeps going. At most one loop runs
//! per poller; the coordinator owns one poller per order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::chain::DecryptStatusReader;
use crate::entities::Handle;
use crate::events::DecryptionPoll;
use crate::utils::CallbackSlot;

pub struct DecryptionPoller<R> {
    reader: Arc<R>,
    interval: Duration,
    on_poll: CallbackSlot<DecryptionPoll>,
    active: Option<ActivePoll>,
}

struct ActivePoll {
    handle: Handle,
    /// Cleared by `stop` and by the loop itself on a terminal read. The
    /// loop checks it after every read, so a read still in flight when the
    /// poller is stopped never reports.
    running: Arc<AtomicBool>,
    /// Set once the handle was reported as decrypted.
    decrypted: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl<R> DecryptionPoller<R>
where
    R: DecryptStatusReader + 'static,
{
    pub fn new(reader: Arc<R>, interval: Duration, on_poll: CallbackSlot<DecryptionPoll>) -> Self {
        Self {
            reader,
            interval,
            on_poll,
            active: None,
        }
    }

    /// Start polling `handle`. The first read happens immediately.
    ///
    /// Returns `false` without doing anything when `handle` is already being
    /// polled or was already reported as decrypted. Starting a different
    /// handle stops the previous loop first.
    pub fn start(&mut self, handle: Handle) -> bool {
        if let Some(active) = &self.active {
            if active.handle == handle
                && (active.running.load(Ordering::SeqCst) || active.decrypted.load(Ordering::SeqCst))
            {
                return false;
            }
        }
        self.stop();

        let running = Arc::new(AtomicBool::new(true));
        let decrypted = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(poll_loop(
            self.reader.clone(),
            handle,
            self.interval,
            self.on_poll.clone(),
            running.clone(),
            decrypted.clone(),
        ));

        debug!(handle = %handle, interval_ms = self.interval.as_millis() as u64, "Decryption polling started");
        self.active = Some(ActivePoll {
            handle,
            running,
            decrypted,
            task,
        });
        true
    }
}

impl<R> DecryptionPoller<R> {
    /// Stop polling. Immediate and idempotent.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            if active.running.swap(false, Ordering::SeqCst) {
                debug!(handle = %active.handle, "Decryption polling stopped");
            }
            active.task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.running.load(Ordering::SeqCst))
    }

    /// The handle of the current or last loop, until `stop` is called.
    pub fn handle(&self) -> Option<Handle> {
        self.active.as_ref().map(|active| active.handle)
    }
}

impl<R> Drop for DecryptionPoller<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop<R>(
    reader: Arc<R>,
    handle: Handle,
    interval: Duration,
    on_poll: CallbackSlot<DecryptionPoll>,
    running: Arc<AtomicBool>,
    decrypted: Arc<AtomicBool>,
) where
    R: DecryptStatusReader + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempt = 0u32;

    loop {
        ticker.tick().await;
        if !running.load(Ordering::SeqCst) {
            return;
        }
        attempt += 1;

        match reader.order_decrypt_status(handle).await {
            Ok(is_decrypted) => {
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                if is_decrypted {
                    running.store(false, Ordering::SeqCst);
                    decrypted.store(true, Ordering::SeqCst);
                    info!(handle = %handle, attempt, "Handle decrypted");
                }
                on_poll.call(DecryptionPoll {
                    handle,
                    decrypted: is_decrypted,
                    attempt,
                });
                if is_decrypted {
                    return;
                }
            }
            Err(e) => {
                warn!(
                    handle = %handle,
                    attempt,
                    error = %e,
                    "Decryption status read failed, will retry"
                );
            }
        }
    }
}
