//! SettlementCorrelator processor.
//!
//! The SettlementCorrelator is responsible for:
//! - Receiving resolved receipts together with what they were watched for
//! - Confirming an order from the placement event of its own submission
//!   transaction
//! - Routing every settlement and failure event of a receipt to the store
//!   by handle, whichever transaction emitted it
//! - Ignoring a receipt it has already processed for the same binding,
//!   within a bounded history of recent receipts
//! - Routing the local wallet's outcomes found by the hook log follower

use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;

use alloy_primitives::{Address, TxHash};
use cipherbook_sdk::objects::TerminalStatus;
use itertools::Itertools;
use kanau::processor::Processor;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::chain::{DecodedReceipt, EventDecoder, HookLog, LogEntry, TransactionReceipt};
use crate::entities::{Handle, OrderId, Stage};
use crate::events::WatchBinding;
use crate::store::{OrderStore, StoreError, StoreUpdate};

/// A resolved receipt and what it was watched for.
#[derive(Debug, Clone)]
pub struct CorrelateReceipt {
    pub binding: WatchBinding,
    pub receipt: TransactionReceipt,
}

/// Hook logs found by the follower, in block order.
#[derive(Debug, Clone)]
pub struct CorrelateHookLogs {
    pub logs: Vec<HookLog>,
}

/// One settlement or failure applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub handle: Handle,
    pub status: TerminalStatus,
    pub order_id: OrderId,
    /// `false` when the order was already terminal.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationReport {
    pub tx: TxHash,
    pub binding: WatchBinding,
    /// The receipt was already processed for this binding; nothing was done.
    pub duplicate: bool,
    /// Set when this receipt confirmed the bound order.
    pub confirmed: Option<(OrderId, Handle)>,
    pub resolved: Vec<ResolvedOrder>,
    /// Handles with an outcome in this receipt but no local order.
    pub unmatched: Vec<Handle>,
    /// The bound order is still waiting for confirmation after its own
    /// submission receipt, e.g. because the transaction reverted.
    pub parked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookLogReport {
    pub resolved: Vec<ResolvedOrder>,
    pub unmatched: Vec<Handle>,
}

/// How many `(tx, binding)` pairs are remembered for duplicate detection.
pub const PROCESSED_RECEIPTS_CAPACITY: usize = 4096;

type ProcessedKey = (TxHash, WatchBinding);

/// Recently processed receipts. The oldest key is forgotten once
/// `capacity` is reached.
#[derive(Debug)]
struct ProcessedReceipts {
    capacity: usize,
    order: VecDeque<ProcessedKey>,
    seen: HashSet<ProcessedKey>,
}

impl ProcessedReceipts {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// `false` when `key` is already remembered.
    fn insert(&mut self, key: ProcessedKey) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back(key);
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

impl CorrelationReport {
    fn new(tx: TxHash, binding: WatchBinding) -> Self {
        Self {
            tx,
            binding,
            duplicate: false,
            confirmed: None,
            resolved: Vec::new(),
            unmatched: Vec::new(),
            parked: false,
        }
    }
}

pub struct SettlementCorrelator {
    store: OrderStore,
    decoder: EventDecoder,
    /// The local wallet; only its placement events confirm orders.
    account: Address,
    processed: Mutex<ProcessedReceipts>,
}

impl SettlementCorrelator {
    pub fn new(store: OrderStore, decoder: EventDecoder, account: Address) -> Self {
        Self {
            store,
            decoder,
            account,
            processed: Mutex::new(ProcessedReceipts::new(PROCESSED_RECEIPTS_CAPACITY)),
        }
    }

    /// Assign the handle from the first placement event of the local wallet.
    ///
    /// Returns whether the order is confirmed after this call.
    fn confirm(
        &self,
        order_id: &OrderId,
        receipt: &TransactionReceipt,
        report: &mut CorrelationReport,
    ) -> bool {
        let decoded = self.decoder.decode(receipt, Some(self.account));
        let Some(placed) = decoded.placed.first() else {
            return false;
        };

        match self
            .store
            .assign_handle(order_id, receipt.transaction_hash, placed.handle)
        {
            Ok(StoreUpdate::Changed { order, .. }) => {
                info!(
                    order_id = %order_id,
                    handle = %placed.handle,
                    tx = %receipt.transaction_hash,
                    "Order confirmed"
                );
                report.confirmed = order.handle.map(|handle| (order_id.clone(), handle));
                true
            }
            Ok(StoreUpdate::Unchanged(order)) => {
                debug!(order_id = %order_id, "Ignoring duplicate placement event");
                order.is_some_and(|order| order.stage > Stage::AwaitingConfirmation)
            }
            Err(e @ StoreError::HandleInUse { .. }) => {
                error!(
                    order_id = %order_id,
                    handle = %placed.handle,
                    error = %e,
                    "Placement event carries a handle held by another order"
                );
                false
            }
            Err(e) => {
                debug!(
                    order_id = %order_id,
                    tx = %receipt.transaction_hash,
                    error = %e,
                    "Placement event does not apply to the order"
                );
                false
            }
        }
    }

    /// Apply every settlement and failure of `decoded` by handle.
    fn resolve(&self, tx: TxHash, decoded: &DecodedReceipt) -> (Vec<ResolvedOrder>, Vec<Handle>) {
        let mut resolved = Vec::new();
        let mut unmatched = Vec::new();

        for resolution in decoded.resolutions() {
            match self
                .store
                .update_status_by_handle(resolution.handle, resolution.status)
            {
                StoreUpdate::Changed { from, order } => {
                    info!(
                        order_id = %order.id,
                        handle = %resolution.handle,
                        tx = %tx,
                        from = ?from,
                        status = ?resolution.status,
                        "Order resolved"
                    );
                    resolved.push(ResolvedOrder {
                        handle: resolution.handle,
                        status: resolution.status,
                        order_id: order.id.clone(),
                        changed: true,
                    });
                }
                StoreUpdate::Unchanged(Some(order)) => {
                    debug!(
                        order_id = %order.id,
                        handle = %resolution.handle,
                        stage = ?order.stage,
                        "Ignoring outcome for an order that is already terminal"
                    );
                    resolved.push(ResolvedOrder {
                        handle: resolution.handle,
                        status: resolution.status,
                        order_id: order.id.clone(),
                        changed: false,
                    });
                }
                StoreUpdate::Unchanged(None) => {
                    debug!(handle = %resolution.handle, tx = %tx, "No local order for handle");
                    unmatched.push(resolution.handle);
                }
            }
        }

        (resolved, unmatched)
    }
}

impl Processor<CorrelateReceipt> for SettlementCorrelator {
    type Output = CorrelationReport;
    type Error = Infallible;

    async fn process(&self, input: CorrelateReceipt) -> Result<CorrelationReport, Infallible> {
        let CorrelateReceipt { binding, receipt } = input;
        let tx = receipt.transaction_hash;
        let mut report = CorrelationReport::new(tx, binding.clone());

        if !self.processed.lock().insert((tx, binding.clone())) {
            debug!(tx = %tx, binding = %binding, "Receipt already processed");
            report.duplicate = true;
            return Ok(report);
        }

        let confirmed = match &binding {
            WatchBinding::Submission { order_id } => self.confirm(order_id, &receipt, &mut report),
            WatchBinding::Trigger => false,
        };

        let decoded = self.decoder.decode(&receipt, None);
        (report.resolved, report.unmatched) = self.resolve(tx, &decoded);

        if let WatchBinding::Submission { order_id } = &binding {
            let still_waiting = self
                .store
                .get(order_id)
                .is_some_and(|order| order.stage == Stage::AwaitingConfirmation);
            if !confirmed && still_waiting {
                report.parked = true;
                warn!(
                    order_id = %order_id,
                    tx = %tx,
                    outcome = ?receipt.outcome(),
                    "Submission receipt carries no placement event, order stays pending"
                );
            }
        }

        Ok(report)
    }
}

impl Processor<CorrelateHookLogs> for SettlementCorrelator {
    type Output = HookLogReport;
    type Error = Infallible;

    /// Only outcomes for the local wallet are applied: the log query sees
    /// every user of the hook.
    async fn process(&self, input: CorrelateHookLogs) -> Result<HookLogReport, Infallible> {
        let mut report = HookLogReport::default();

        for (tx, logs) in &input.logs.iter().chunk_by(|log| log.transaction_hash) {
            let entries: Vec<LogEntry> = logs.map(|log| log.entry.clone()).collect();
            let decoded = self.decoder.decode_logs(tx, &entries, Some(self.account));
            let (resolved, unmatched) = self.resolve(tx, &decoded);
            report.resolved.extend(resolved);
            report.unmatched.extend(unmatched);
        }

        Ok(report)
    }
}
