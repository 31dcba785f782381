//! HookLogFollower.
//!
//! The HookLogFollower is responsible for:
//! - Querying the hook's `OrderSettled` / `OrderFailed` logs on a fixed
//!   interval, starting at the block after the head seen when it started
//! - Reporting every non-empty batch through its [`CallbackSlot`]
//!
//! It catches outcomes emitted by transactions nobody asked to watch. The
//! coordinator runs it only while an executing order holds a handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::chain::LogSource;
use crate::events::HookLogsFetched;
use crate::utils::CallbackSlot;

pub struct HookLogFollower<L> {
    source: Arc<L>,
    interval: Duration,
    on_logs: CallbackSlot<HookLogsFetched>,
    task: Option<JoinHandle<()>>,
}

impl<L> HookLogFollower<L>
where
    L: LogSource + 'static,
{
    pub fn new(source: Arc<L>, interval: Duration, on_logs: CallbackSlot<HookLogsFetched>) -> Self {
        Self {
            source,
            interval,
            on_logs,
            task: None,
        }
    }

    /// Start following. Returns `false` when already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.task = Some(tokio::spawn(follow_loop(
            self.source.clone(),
            self.interval,
            self.on_logs.clone(),
        )));
        debug!(interval_ms = self.interval.as_millis() as u64, "Hook log follower started");
        true
    }
}

impl<L> HookLogFollower<L> {
    /// Stop following. Logs emitted while stopped are never reported.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Hook log follower stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl<L> Drop for HookLogFollower<L> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn follow_loop<L>(source: Arc<L>, interval: Duration, on_logs: CallbackSlot<HookLogsFetched>)
where
    L: LogSource + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_block: Option<u64> = None;

    loop {
        ticker.tick().await;

        let from_block = match next_block {
            Some(block) => block,
            None => match source.block_number().await {
                Ok(head) => {
                    next_block = Some(head + 1);
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Could not read the head block, will retry");
                    continue;
                }
            },
        };

        match source.logs_since(from_block).await {
            Ok(batch) => {
                next_block = Some(batch.next_block);
                if batch.logs.is_empty() {
                    continue;
                }
                debug!(from_block, logs = batch.logs.len(), "New hook logs");
                on_logs.call(HookLogsFetched {
                    from_block,
                    logs: batch.logs,
                });
            }
            Err(e) => {
                warn!(from_block, error = %e, "Hook log query failed, will retry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, USER_1, settled_log, tx};
    use tokio::sync::mpsc;

    const INTERVAL: Duration = Duration::from_millis(2000);

    fn follower(
        chain: &Arc<MockChain>,
    ) -> (
        HookLogFollower<MockChain>,
        mpsc::UnboundedReceiver<HookLogsFetched>,
    ) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let slot = CallbackSlot::new(move |fetched| {
            let _ = sender.send(fetched);
        });
        (HookLogFollower::new(chain.clone(), INTERVAL, slot), receiver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_new_logs_once() {
        let chain = Arc::new(MockChain::new());
        let (mut follower, mut fetched) = follower(&chain);

        assert!(follower.start());
        assert!(!follower.start());
        tokio::time::sleep(INTERVAL).await;

        chain.push_hook_log(tx(1), settled_log(USER_1, 5));
        let batch = fetched.recv().await.unwrap();
        assert_eq!(batch.logs.len(), 1);
        assert_eq!(batch.logs[0].transaction_hash, tx(1));

        tokio::time::sleep(INTERVAL * 5).await;
        assert!(fetched.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_before_start_are_skipped() {
        let chain = Arc::new(MockChain::new());
        chain.push_hook_log(tx(1), settled_log(USER_1, 1));
        let (mut follower, mut fetched) = follower(&chain);

        follower.start();
        tokio::time::sleep(INTERVAL).await;
        chain.push_hook_log(tx(2), settled_log(USER_1, 2));

        let batch = fetched.recv().await.unwrap();
        let txs: Vec<_> = batch.logs.iter().map(|log| log.transaction_hash).collect();
        assert_eq!(txs, vec![tx(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_errors_do_not_skip_blocks() {
        let chain = Arc::new(MockChain::new());
        let (mut follower, mut fetched) = follower(&chain);

        follower.start();
        tokio::time::sleep(INTERVAL).await;
        chain.fail_log_queries(2);
        chain.push_hook_log(tx(3), settled_log(USER_1, 3));

        let batch = fetched.recv().await.unwrap();
        assert_eq!(batch.logs[0].transaction_hash, tx(3));
        assert!(chain.log_queries() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_queries() {
        let chain = Arc::new(MockChain::new());
        let (mut follower, mut fetched) = follower(&chain);

        follower.start();
        tokio::time::sleep(INTERVAL * 2).await;
        follower.stop();
        assert!(!follower.is_running());
        let queries = chain.log_queries();

        chain.push_hook_log(tx(4), settled_log(USER_1, 4));
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(chain.log_queries(), queries);
        assert!(fetched.try_recv().is_err());
    }
}
