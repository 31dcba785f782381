//! OrderLifecycleCoordinator.
//!
//! The coordinator is responsible for:
//! - Owning every `ReceiptWatcher` and `DecryptionPoller` of the tracked
//!   orders, plus the watchers of trigger transactions
//! - Feeding resolved receipts through the `SettlementCorrelator`
//! - Moving decrypted orders to `Queued`, after which they are only
//!   correlated by handle
//! - Reconciling its watchers and pollers with the store after every change,
//!   so orders that leave the tracked set release their timers
//! - Running the `HookLogFollower` while an executing order holds a handle
//! - Keeping released orders released until they are tracked again
//!
//! All bookkeeping happens on the coordinator task. Watchers and pollers
//! run on their own tasks and only report back through
//! [`LifecycleSignal`]s.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, TxHash};
use cipherbook_sdk::objects::TerminalStatus;
use kanau::processor::Processor;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::decryption_poller::DecryptionPoller;
use super::hook_log_follower::HookLogFollower;
use super::receipt_watcher::ReceiptWatcher;
use super::settlement_correlator::{CorrelateHookLogs, CorrelateReceipt, SettlementCorrelator};
use crate::chain::{ChainClient, EventDecoder};
use crate::config::PollerConfig;
use crate::entities::{Handle, LifecycleEvent, NewOrder, Order, OrderId, Stage};
use crate::events::{
    CoordinatorCommand, CoordinatorCommandReceiver, CoordinatorCommandSender, DecryptionPoll,
    HookLogsFetched, LifecycleSignal, LifecycleSignalSender, ReceiptResolved, WatchBinding,
    lifecycle_signal_channel,
};
use crate::store::{OrderBook, OrderStore, OrderWatcher, StoreError, StoreUpdate};
use crate::utils::CallbackSlot;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The coordinator task is gone; commands can no longer be delivered.
    #[error("order lifecycle coordinator is not running")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub poll_interval: Duration,
    /// Only events emitted by this contract are decoded, when set.
    pub market_order_hook: Option<Address>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            poll_interval: PollerConfig::DEFAULT_INTERVAL,
            market_order_hook: None,
        }
    }
}

/// The operations exposed to the presentation layer.
///
/// Reads and status updates go straight to the store; anything that starts
/// or stops a watcher is sent to the coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    store: OrderStore,
    commands: CoordinatorCommandSender,
}

impl CoordinatorHandle {
    pub fn new(store: OrderStore, commands: CoordinatorCommandSender) -> Self {
        Self { store, commands }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Whether the coordinator task still accepts commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Register a new order as `executing`.
    pub fn add_async_order(&self, order: NewOrder) -> Result<Arc<Order>, CoordinatorError> {
        let order = self.store.add(order.into_order())?;
        info!(order_id = %order.id, amount = %order.amount, "Order registered");
        Ok(order)
    }

    /// Resume tracking an order known only by its handle, e.g. from a
    /// previous session.
    ///
    /// A handle not yet decrypted gets a poller; a decrypted one goes
    /// straight to `Queued`.
    pub fn adopt_order(
        &self,
        order: NewOrder,
        handle: Handle,
        decrypted: bool,
    ) -> Result<Arc<Order>, CoordinatorError> {
        let order = self.store.add(Order {
            handle: Some(handle),
            stage: if decrypted {
                Stage::Queued
            } else {
                Stage::Confirmed
            },
            ..order.into_order()
        })?;
        info!(order_id = %order.id, handle = %handle, stage = ?order.stage, "Order adopted by handle");
        Ok(order)
    }

    /// Bind the order to its placement transaction and watch it.
    pub async fn track_submission(
        &self,
        id: &OrderId,
        tx: TxHash,
    ) -> Result<Arc<Order>, CoordinatorError> {
        let update = self.store.record_submission(id, tx)?;
        let order = update
            .order()
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.send(CoordinatorCommand::TrackSubmission {
            order_id: id.clone(),
            tx,
        })
        .await?;
        Ok(order)
    }

    /// Watch a transaction submitted by anyone for settlement and failure
    /// events.
    pub async fn watch_trigger(&self, tx: TxHash) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::WatchTrigger { tx }).await
    }

    /// Stop every watcher and poller of the order. The order stays in the
    /// store and is not picked up again until its next submission is
    /// tracked.
    pub async fn release(&self, id: &OrderId) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Release {
            order_id: id.clone(),
        })
        .await
    }

    pub fn update_order_status(
        &self,
        id: &OrderId,
        status: TerminalStatus,
    ) -> Result<StoreUpdate, CoordinatorError> {
        Ok(self.store.update_status_by_id(id, status)?)
    }

    pub fn update_order_status_by_handle(&self, handle: Handle, status: TerminalStatus) -> StoreUpdate {
        self.store.update_status_by_handle(handle, status)
    }

    pub fn get_order(&self, id: &OrderId) -> Option<Arc<Order>> {
        self.store.get(id)
    }

    pub fn list_orders(&self) -> Vec<Arc<Order>> {
        self.store.list()
    }

    pub fn list_executing_orders(&self) -> Vec<Arc<Order>> {
        self.store.list_executing()
    }

    pub fn subscribe(&self) -> OrderWatcher {
        self.store.subscribe()
    }

    async fn send(&self, command: CoordinatorCommand) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoordinatorError::Stopped)
    }
}

pub struct OrderLifecycleCoordinator<C> {
    chain: Arc<C>,
    store: OrderStore,
    settings: CoordinatorSettings,
}

impl<C> OrderLifecycleCoordinator<C>
where
    C: ChainClient + 'static,
{
    pub fn new(chain: Arc<C>, store: OrderStore, settings: CoordinatorSettings) -> Self {
        Self {
            chain,
            store,
            settings,
        }
    }

    /// Run the coordinator until shutdown is signaled.
    ///
    /// Connects the chain client first if nobody did. Every watcher and
    /// poller is released before this returns.
    pub async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut command_rx: CoordinatorCommandReceiver,
    ) {
        let account = match self.chain.snapshot() {
            Some(snapshot) => snapshot.account,
            None => match self.chain.connect().await {
                Ok(snapshot) => snapshot.account,
                Err(e) => {
                    error!(error = %e, "OrderLifecycleCoordinator could not connect to the chain");
                    return;
                }
            },
        };

        let correlator = SettlementCorrelator::new(
            self.store.clone(),
            EventDecoder::new(self.settings.market_order_hook),
            account,
        );
        let (signal_tx, mut signal_rx) = lifecycle_signal_channel();
        let spawner = Spawner {
            chain: self.chain,
            poll_interval: self.settings.poll_interval,
            signals: signal_tx,
        };
        let mut runtime = Runtime {
            follower: spawner.follower(),
            spawner,
            store: self.store.clone(),
            tracked: HashMap::new(),
            triggers: HashMap::new(),
            released: HashSet::new(),
        };

        let mut store_watcher = self.store.subscribe();
        runtime.reconcile(&store_watcher.latest());
        info!(account = %account, "OrderLifecycleCoordinator started");

        loop {
            tokio::select! {
                biased;

                // Shutdown has highest priority.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("OrderLifecycleCoordinator received shutdown signal");
                        break;
                    }
                }

                Some(command) = command_rx.recv() => {
                    runtime.handle_command(command);
                }

                Some(signal) = signal_rx.recv() => {
                    runtime.handle_signal(signal, &correlator).await;
                }

                Ok(()) = store_watcher.changed() => {
                    let book = store_watcher.latest();
                    runtime.reconcile(&book);
                }

                else => {
                    info!("Coordinator channels closed");
                    break;
                }
            }
        }

        runtime.release_all();
        info!("OrderLifecycleCoordinator shutdown complete");
    }
}

/// Watchers and pollers of one order.
struct Tracked<C> {
    submission: Option<ReceiptWatcher<C>>,
    poller: Option<DecryptionPoller<C>>,
}

impl<C> Default for Tracked<C> {
    fn default() -> Self {
        Self {
            submission: None,
            poller: None,
        }
    }
}

/// Builds watchers and pollers whose callbacks report to the coordinator.
struct Spawner<C> {
    chain: Arc<C>,
    poll_interval: Duration,
    signals: LifecycleSignalSender,
}

impl<C> Spawner<C>
where
    C: ChainClient + 'static,
{
    fn watcher(&self, binding: WatchBinding) -> ReceiptWatcher<C> {
        let signals = self.signals.clone();
        let on_receipt = CallbackSlot::new(move |resolved: ReceiptResolved| {
            let _ = signals.send(LifecycleSignal::Receipt {
                binding: binding.clone(),
                resolved,
            });
        });
        ReceiptWatcher::new(self.chain.clone(), on_receipt)
    }

    fn poller(&self, order_id: OrderId) -> DecryptionPoller<C> {
        let signals = self.signals.clone();
        let on_poll = CallbackSlot::new(move |poll: DecryptionPoll| {
            let _ = signals.send(LifecycleSignal::Poll {
                order_id: order_id.clone(),
                poll,
            });
        });
        DecryptionPoller::new(self.chain.clone(), self.poll_interval, on_poll)
    }

    fn follower(&self) -> HookLogFollower<C> {
        let signals = self.signals.clone();
        let on_logs = CallbackSlot::new(move |fetched: HookLogsFetched| {
            let _ = signals.send(LifecycleSignal::HookLogs(fetched));
        });
        HookLogFollower::new(self.chain.clone(), self.poll_interval, on_logs)
    }
}

struct Runtime<C> {
    spawner: Spawner<C>,
    store: OrderStore,
    tracked: HashMap<OrderId, Tracked<C>>,
    triggers: HashMap<TxHash, ReceiptWatcher<C>>,
    follower: HookLogFollower<C>,
    /// Non-terminal orders whose watchers were released on request.
    released: HashSet<OrderId>,
}

impl<C> Runtime<C>
where
    C: ChainClient + 'static,
{
    fn handle_command(&mut self, command: CoordinatorCommand) {
        match command {
            CoordinatorCommand::TrackSubmission { order_id, tx } => {
                let Some(order) = self.store.get(&order_id) else {
                    warn!(order_id = %order_id, "Cannot track submission of unknown order");
                    return;
                };
                if order.submission_tx != Some(tx) || order.stage != Stage::AwaitingConfirmation {
                    debug!(
                        order_id = %order_id,
                        tx = %tx,
                        stage = ?order.stage,
                        "Order no longer waits on this transaction"
                    );
                    return;
                }

                if self.released.remove(&order_id) {
                    debug!(order_id = %order_id, "Released order is tracked again");
                }
                let binding = WatchBinding::Submission {
                    order_id: order_id.clone(),
                };
                let tracked = self.tracked.entry(order_id).or_default();
                tracked
                    .submission
                    .get_or_insert_with(|| self.spawner.watcher(binding))
                    .watch(Some(tx));
            }
            CoordinatorCommand::WatchTrigger { tx } => {
                if self.triggers.contains_key(&tx) {
                    debug!(tx = %tx, "Trigger transaction already watched");
                    return;
                }
                let mut watcher = self.spawner.watcher(WatchBinding::Trigger);
                watcher.watch(Some(tx));
                self.triggers.insert(tx, watcher);
                info!(tx = %tx, "Watching trigger transaction");
            }
            CoordinatorCommand::Release { order_id } => {
                let releasable = self
                    .store
                    .get(&order_id)
                    .is_some_and(|order| !order.is_terminal());
                if !releasable {
                    debug!(order_id = %order_id, "Nothing to release for unknown or terminal order");
                    return;
                }
                self.tracked.remove(&order_id);
                self.released.insert(order_id.clone());
                info!(order_id = %order_id, "Released order watchers");
            }
        }
    }

    async fn handle_signal(&mut self, signal: LifecycleSignal, correlator: &SettlementCorrelator) {
        match signal {
            LifecycleSignal::Receipt { binding, resolved } => {
                let tx = resolved.tx;
                let report = match correlator
                    .process(CorrelateReceipt {
                        binding: binding.clone(),
                        receipt: resolved.receipt,
                    })
                    .await
                {
                    Ok(report) => report,
                    Err(never) => match never {},
                };
                debug!(
                    tx = %tx,
                    binding = %binding,
                    confirmed = report.confirmed.is_some(),
                    resolved = report.resolved.len(),
                    unmatched = report.unmatched.len(),
                    parked = report.parked,
                    "Receipt correlated"
                );

                if binding == WatchBinding::Trigger {
                    self.triggers.remove(&tx);
                }
            }
            LifecycleSignal::Poll { order_id, poll } => {
                if self.released.contains(&order_id) {
                    debug!(order_id = %order_id, handle = %poll.handle, "Dropping decryption result of released order");
                    return;
                }
                if !poll.decrypted {
                    debug!(order_id = %order_id, handle = %poll.handle, attempt = poll.attempt, "Handle not decrypted yet");
                    return;
                }
                self.queue(&order_id);
            }
            LifecycleSignal::HookLogs(fetched) => {
                let logs = fetched.logs.len();
                let report = match correlator
                    .process(CorrelateHookLogs { logs: fetched.logs })
                    .await
                {
                    Ok(report) => report,
                    Err(never) => match never {},
                };
                debug!(
                    from_block = fetched.from_block,
                    logs,
                    resolved = report.resolved.len(),
                    unmatched = report.unmatched.len(),
                    "Hook logs correlated"
                );
            }
        }
    }

    /// `Decrypted` then `Queued`: from here on the order is only reached
    /// through settlement events matched by handle.
    fn queue(&mut self, order_id: &OrderId) {
        let result = self
            .store
            .apply(order_id, LifecycleEvent::Decrypted)
            .and_then(|_| self.store.apply(order_id, LifecycleEvent::Queued));
        match result {
            Ok(update) if update.is_changed() => {
                info!(order_id = %order_id, "Order decrypted, moved to async settlement tracking");
            }
            Ok(_) => {
                debug!(order_id = %order_id, "Decryption result did not change the order");
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Could not queue decrypted order");
            }
        }
        self.tracked.remove(order_id);
    }

    /// Bring watchers and pollers in line with `book`.
    ///
    /// - Orders that are gone, decrypted or terminal release everything.
    /// - Confirmed orders holding a handle get a running poller, unless
    ///   they were released.
    /// - The hook log follower runs while an executing order that was not
    ///   released holds a handle.
    fn reconcile(&mut self, book: &OrderBook) {
        self.released
            .retain(|id| book.get(id).is_some_and(|order| !order.is_terminal()));

        self.tracked.retain(|id, _| {
            let keep = book
                .get(id)
                .is_some_and(|order| order.stage < Stage::Decrypted);
            if !keep {
                debug!(order_id = %id, "Releasing watchers of settled or queued order");
            }
            keep
        });

        let mut started = Vec::new();
        for order in book.iter() {
            let Some(handle) = order.handle else {
                continue;
            };
            if !matches!(order.stage, Stage::Confirmed | Stage::AwaitingDecryption)
                || self.released.contains(&order.id)
            {
                continue;
            }
            let tracked = self.tracked.entry(order.id.clone()).or_default();
            let poller = tracked
                .poller
                .get_or_insert_with(|| self.spawner.poller(order.id.clone()));
            if poller.start(handle) && order.stage == Stage::Confirmed {
                started.push(order.id.clone());
            }
        }

        for id in started {
            if let Err(e) = self.store.apply(&id, LifecycleEvent::DecryptionStarted) {
                warn!(order_id = %id, error = %e, "Could not mark decryption as started");
            }
        }

        let awaiting_outcome = book
            .executing()
            .any(|order| order.handle.is_some() && !self.released.contains(&order.id));
        if awaiting_outcome {
            if self.follower.start() {
                info!("Following hook settlement logs");
            }
        } else if self.follower.is_running() {
            self.follower.stop();
            info!("No executing order holds a handle, hook log follower stopped");
        }
    }

    fn release_all(&mut self) {
        let orders = self.tracked.len();
        let triggers = self.triggers.len();
        self.tracked.clear();
        self.triggers.clear();
        self.follower.stop();
        info!(orders, triggers, "Released all watchers and pollers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::coordinator_command_channel;
    use crate::testing::{
        HOOK, MockChain, USER_1, USER_2, failed_log, placed_log, receipt, settled_log, tx,
    };
    use alloy_primitives::U256;
    use tokio::task::JoinHandle;

    const INTERVAL: Duration = Duration::from_millis(2000);

    struct Harness {
        chain: Arc<MockChain>,
        handle: CoordinatorHandle,
        shutdown: watch::Sender<bool>,
        task: JoinHandle<()>,
    }

    fn spawn() -> Harness {
        let chain = Arc::new(MockChain::new());
        let store = OrderStore::new();
        let (command_tx, command_rx) = coordinator_command_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let coordinator = OrderLifecycleCoordinator::new(
            chain.clone(),
            store.clone(),
            CoordinatorSettings {
                poll_interval: INTERVAL,
                market_order_hook: Some(HOOK),
            },
        );
        let task = tokio::spawn(coordinator.run(shutdown_rx, command_rx));
        Harness {
            chain,
            handle: CoordinatorHandle::new(store, command_tx),
            shutdown,
            task,
        }
    }

    fn new_order(id: &str) -> NewOrder {
        NewOrder {
            id: Some(id.into()),
            amount: "10".into(),
            from_token: "CPH".into(),
            to_token: "MSK".into(),
        }
    }

    async fn wait_for(handle: &CoordinatorHandle, id: &str, stage: Stage) {
        let id = OrderId::from(id);
        let mut watcher = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(600), async {
            loop {
                if handle.get_order(&id).is_some_and(|o| o.stage == stage) {
                    return;
                }
                watcher.changed().await.unwrap();
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "order {id} stuck at {:?}, expected {stage:?}",
                handle.get_order(&id).map(|o| o.stage)
            )
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_by_unrelated_transaction() {
        let h = spawn();
        h.chain
            .script_decrypt(12345, vec![Ok(false), Ok(false), Ok(true)]);

        h.handle.add_async_order(new_order("o1")).unwrap();
        h.handle.track_submission(&"o1".into(), tx(1)).await.unwrap();
        h.chain
            .push_receipt(receipt(tx(1), vec![placed_log(USER_1, 12345)]));

        wait_for(&h.handle, "o1", Stage::Queued).await;
        let order = h.handle.get_order(&"o1".into()).unwrap();
        assert_eq!(order.handle, Some(U256::from(12345)));
        assert_eq!(h.chain.decrypt_reads(12345), 3);

        h.handle.watch_trigger(tx(2)).await.unwrap();
        h.chain
            .push_receipt(receipt(tx(2), vec![settled_log(USER_1, 12345)]));

        wait_for(&h.handle, "o1", Stage::Settled).await;
        assert!(h.handle.list_executing_orders().is_empty());

        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(h.chain.decrypt_reads(12345), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_receipt_settles_and_fails_two_orders() {
        let h = spawn();
        h.handle
            .adopt_order(new_order("o1"), U256::from(10), true)
            .unwrap();
        h.handle
            .adopt_order(new_order("o2"), U256::from(20), true)
            .unwrap();

        h.handle.watch_trigger(tx(7)).await.unwrap();
        h.chain.push_receipt(receipt(
            tx(7),
            vec![settled_log(USER_2, 10), failed_log(USER_1, 20)],
        ));

        wait_for(&h.handle, "o1", Stage::Settled).await;
        wait_for(&h.handle, "o2", Stage::Failed).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_for_other_user_leaves_order_pending() {
        let h = spawn();
        h.handle.add_async_order(new_order("o1")).unwrap();
        h.handle.track_submission(&"o1".into(), tx(1)).await.unwrap();
        h.chain
            .push_receipt(receipt(tx(1), vec![placed_log(USER_2, 55)]));

        tokio::time::sleep(INTERVAL * 5).await;
        let order = h.handle.get_order(&"o1".into()).unwrap();
        assert_eq!(order.stage, Stage::AwaitingConfirmation);
        assert_eq!(order.handle, None);
        assert_eq!(h.chain.decrypt_reads(55), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmission_ignores_stale_transaction() {
        let h = spawn();
        h.handle.add_async_order(new_order("o1")).unwrap();
        h.handle.track_submission(&"o1".into(), tx(1)).await.unwrap();
        h.handle.track_submission(&"o1".into(), tx(2)).await.unwrap();

        h.chain.push_receipt(receipt(tx(1), vec![placed_log(USER_1, 5)]));
        tokio::time::sleep(INTERVAL).await;
        assert_eq!(h.handle.get_order(&"o1".into()).unwrap().handle, None);

        h.chain.push_receipt(receipt(tx(2), vec![placed_log(USER_1, 6)]));
        wait_for(&h.handle, "o1", Stage::AwaitingDecryption).await;
        assert_eq!(
            h.handle.get_order(&"o1".into()).unwrap().handle,
            Some(U256::from(6))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_order_releases_its_poller() {
        let h = spawn();
        h.handle.add_async_order(new_order("o1")).unwrap();
        h.handle.track_submission(&"o1".into(), tx(1)).await.unwrap();
        h.chain.push_receipt(receipt(tx(1), vec![placed_log(USER_1, 3)]));
        wait_for(&h.handle, "o1", Stage::AwaitingDecryption).await;

        tokio::time::sleep(INTERVAL * 2).await;
        h.handle
            .update_order_status(&"o1".into(), TerminalStatus::Failed)
            .unwrap();
        tokio::time::sleep(INTERVAL).await;
        let reads = h.chain.decrypt_reads(3);

        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(h.chain.decrypt_reads(3), reads);
        assert_eq!(h.handle.get_order(&"o1".into()).unwrap().stage, Stage::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adopted_order_is_polled_by_handle() {
        let h = spawn();
        h.chain.script_decrypt(77, vec![Err("rpc down"), Ok(true)]);
        h.handle
            .adopt_order(new_order("old"), U256::from(77), false)
            .unwrap();

        wait_for(&h.handle, "old", Stage::Queued).await;
        assert_eq!(h.chain.decrypt_reads(77), 2);

        let update = h
            .handle
            .update_order_status_by_handle(U256::from(77), TerminalStatus::Completed);
        assert!(update.is_changed());
        assert_eq!(h.handle.get_order(&"old".into()).unwrap().stage, Stage::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_stops_polling() {
        let h = spawn();
        h.handle
            .adopt_order(new_order("o1"), U256::from(4), false)
            .unwrap();
        wait_for(&h.handle, "o1", Stage::AwaitingDecryption).await;

        h.handle.release(&"o1".into()).await.unwrap();
        tokio::time::sleep(INTERVAL).await;
        let reads = h.chain.decrypt_reads(4);
        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(h.chain.decrypt_reads(4), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_survives_unrelated_store_changes() {
        let h = spawn();
        h.handle
            .adopt_order(new_order("o1"), U256::from(4), false)
            .unwrap();
        wait_for(&h.handle, "o1", Stage::AwaitingDecryption).await;

        h.handle.release(&"o1".into()).await.unwrap();
        tokio::time::sleep(INTERVAL).await;
        let reads = h.chain.decrypt_reads(4);

        h.handle.add_async_order(new_order("o2")).unwrap();
        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(h.chain.decrypt_reads(4), reads);
        assert_eq!(
            h.handle.get_order(&"o1".into()).unwrap().stage,
            Stage::AwaitingDecryption
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracking_again_lifts_release() {
        let h = spawn();
        h.handle.add_async_order(new_order("o1")).unwrap();
        h.handle.track_submission(&"o1".into(), tx(1)).await.unwrap();
        h.handle.release(&"o1".into()).await.unwrap();

        h.handle.track_submission(&"o1".into(), tx(2)).await.unwrap();
        h.chain.script_decrypt(6, vec![Ok(true)]);
        h.chain.push_receipt(receipt(tx(2), vec![placed_log(USER_1, 6)]));

        wait_for(&h.handle, "o1", Stage::Queued).await;
        assert_eq!(h.chain.decrypt_reads(6), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_log_settles_queued_order() {
        let h = spawn();
        h.handle
            .adopt_order(new_order("o1"), U256::from(10), true)
            .unwrap();
        tokio::time::sleep(INTERVAL).await;

        h.chain.push_hook_log(tx(5), settled_log(USER_1, 10));
        wait_for(&h.handle, "o1", Stage::Settled).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_log_of_other_user_is_ignored() {
        let h = spawn();
        h.handle
            .adopt_order(new_order("o1"), U256::from(10), true)
            .unwrap();
        tokio::time::sleep(INTERVAL).await;

        h.chain.push_hook_log(tx(5), failed_log(USER_2, 10));
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(h.handle.get_order(&"o1".into()).unwrap().stage, Stage::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_logs_followed_only_while_outcomes_pending() {
        let h = spawn();
        h.handle.add_async_order(new_order("o1")).unwrap();
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(h.chain.log_queries(), 0);

        h.handle
            .adopt_order(new_order("o2"), U256::from(10), true)
            .unwrap();
        tokio::time::sleep(INTERVAL * 3).await;
        assert!(h.chain.log_queries() > 0);

        h.handle
            .update_order_status(&"o2".into(), TerminalStatus::Completed)
            .unwrap();
        tokio::time::sleep(INTERVAL).await;
        let queries = h.chain.log_queries();
        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(h.chain.log_queries(), queries);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_everything() {
        let h = spawn();
        h.handle
            .adopt_order(new_order("o1"), U256::from(4), false)
            .unwrap();
        wait_for(&h.handle, "o1", Stage::AwaitingDecryption).await;

        assert!(h.handle.is_running());
        h.shutdown.send(true).unwrap();
        h.task.await.unwrap();
        assert!(!h.handle.is_running());
        let reads = h.chain.decrypt_reads(4);
        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(h.chain.decrypt_reads(4), reads);

        assert!(matches!(
            h.handle.watch_trigger(tx(9)).await,
            Err(CoordinatorError::Stopped)
        ));
    }
}
