//! ReceiptWatcher.
//!
//! The ReceiptWatcher is responsible for:
//! - Waiting for the receipt of one transaction at a time on a spawned task
//! - Reporting the receipt once through its [`CallbackSlot`]
//! - Dropping interest in a transaction as soon as the watched identifier
//!   changes, so a stale wait can never report
//!
//! There are no retries and no timeout here. A transaction that is never
//! mined simply never reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::TxHash;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::chain::ReceiptSource;
use crate::events::ReceiptResolved;
use crate::utils::CallbackSlot;

pub struct ReceiptWatcher<S> {
    source: Arc<S>,
    on_receipt: CallbackSlot<ReceiptResolved>,
    /// Bumped whenever the watched identifier changes. A wait only reports
    /// while the generation it was started with is still current.
    generation: Arc<AtomicU64>,
    current: Option<ActiveWatch>,
}

struct ActiveWatch {
    tx: TxHash,
    task: JoinHandle<()>,
}

impl<S> ReceiptWatcher<S>
where
    S: ReceiptSource + 'static,
{
    pub fn new(source: Arc<S>, on_receipt: CallbackSlot<ReceiptResolved>) -> Self {
        Self {
            source,
            on_receipt,
            generation: Arc::new(AtomicU64::new(0)),
            current: None,
        }
    }

    /// Watch `tx`, or go idle with `None`.
    ///
    /// Watching the identifier that is already watched is a no-op, so each
    /// transaction resolves at most once per watcher.
    pub fn watch(&mut self, tx: Option<TxHash>) {
        if self.current.as_ref().map(|active| active.tx) == tx {
            return;
        }

        self.cancel();
        let Some(tx) = tx else {
            return;
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let current_generation = self.generation.clone();
        let source = self.source.clone();
        let on_receipt = self.on_receipt.clone();

        debug!(tx = %tx, "Watching transaction receipt");
        let task = tokio::spawn(async move {
            match source.wait_for_receipt(tx).await {
                Ok(receipt) => {
                    if current_generation.load(Ordering::SeqCst) != generation {
                        debug!(tx = %tx, "Dropping receipt of a transaction no longer watched");
                        return;
                    }
                    debug!(tx = %tx, logs = receipt.logs.len(), "Transaction receipt resolved");
                    on_receipt.call(ReceiptResolved { tx, receipt });
                }
                Err(e) => {
                    warn!(tx = %tx, error = %e, "Receipt wait failed, transaction left unresolved");
                }
            }
        });

        self.current = Some(ActiveWatch { tx, task });
    }

    /// The identifier currently watched, resolved or not.
    #[cfg(test)]
    fn watched(&self) -> Option<TxHash> {
        self.current.as_ref().map(|active| active.tx)
    }

    /// Whether a wait is still in flight.
    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }
}

impl<S> ReceiptWatcher<S> {
    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(active) = self.current.take() {
            active.task.abort();
        }
    }
}

impl<S> Drop for ReceiptWatcher<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, receipt, tx};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn channel_slot() -> (
        CallbackSlot<ReceiptResolved>,
        mpsc::UnboundedReceiver<ReceiptResolved>,
    ) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let slot = CallbackSlot::new(move |resolved| {
            let _ = sender.send(resolved);
        });
        (slot, receiver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_without_identifier() {
        let chain = Arc::new(MockChain::new());
        let (slot, mut resolved) = channel_slot();
        let mut watcher = ReceiptWatcher::new(chain, slot);

        watcher.watch(None);
        assert!(!watcher.is_pending());
        assert_eq!(watcher.watched(), None);
        assert!(resolved.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_once_mined() {
        let chain = Arc::new(MockChain::new());
        let (slot, mut resolved) = channel_slot();
        let mut watcher = ReceiptWatcher::new(chain.clone(), slot);

        watcher.watch(Some(tx(1)));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(watcher.is_pending());

        chain.push_receipt(receipt(tx(1), vec![]));
        let got = resolved.recv().await.unwrap();
        assert_eq!(got.tx, tx(1));

        // Same identifier again: no second resolution.
        watcher.watch(Some(tx(1)));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(resolved.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_identifier_suppresses_stale_receipt() {
        let chain = Arc::new(MockChain::new());
        let (slot, mut resolved) = channel_slot();
        let mut watcher = ReceiptWatcher::new(chain.clone(), slot);

        watcher.watch(Some(tx(1)));
        tokio::task::yield_now().await;
        watcher.watch(Some(tx(2)));

        chain.push_receipt(receipt(tx(1), vec![]));
        chain.push_receipt(receipt(tx(2), vec![]));

        let got = resolved.recv().await.unwrap();
        assert_eq!(got.tx, tx(2));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(resolved.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_and_dropping_release_the_wait() {
        let chain = Arc::new(MockChain::new());
        let (slot, mut resolved) = channel_slot();
        let mut watcher = ReceiptWatcher::new(chain.clone(), slot.clone());

        watcher.watch(Some(tx(1)));
        watcher.watch(None);
        assert!(!watcher.is_pending());

        let mut second = ReceiptWatcher::new(chain.clone(), slot);
        second.watch(Some(tx(2)));
        drop(second);

        chain.push_receipt(receipt(tx(1), vec![]));
        chain.push_receipt(receipt(tx(2), vec![]));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(resolved.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_watchers_run_concurrently() {
        let chain = Arc::new(MockChain::new());
        let (slot, mut resolved) = channel_slot();
        let mut watchers: Vec<_> = (1..=3)
            .map(|n| {
                let mut watcher = ReceiptWatcher::new(chain.clone(), slot.clone());
                watcher.watch(Some(tx(n)));
                watcher
            })
            .collect();

        for n in [3, 1, 2] {
            chain.push_receipt(receipt(tx(n), vec![]));
            assert_eq!(resolved.recv().await.unwrap().tx, tx(n));
        }
        assert!(watchers.iter().all(|w| w.watched().is_some()));
        watchers.clear();
    }
}
