//! The order store.
//!
//! `OrderStore` is the single source of truth for tracked orders. Its state
//! is an immutable [`OrderBook`] snapshot behind a `watch` channel: every
//! mutation builds a new book and swaps it in, so readers holding an older
//! snapshot are never affected, and subscribers are woken only when a
//! mutation actually changed something.
//!
//! Every stage change goes through [`Stage::apply`], so duplicate and stale
//! events come back as [`StoreUpdate::Unchanged`] instead of errors.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::TxHash;
use cipherbook_sdk::objects::{OrderStatus, TerminalStatus};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::entities::{Handle, LifecycleEvent, Order, OrderId, Stage, Transition};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order {0} already exists")]
    DuplicateId(OrderId),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("handle {handle} is already held by order {holder}")]
    HandleInUse { handle: Handle, holder: OrderId },

    #[error("order {id} is not waiting on transaction {tx}")]
    TransactionMismatch { id: OrderId, tx: TxHash },
}

/// Outcome of a lifecycle-checked mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUpdate {
    /// The order moved from `from` to `order.stage`.
    Changed { from: Stage, order: Arc<Order> },
    /// Nothing changed. Carries the order when one was found.
    Unchanged(Option<Arc<Order>>),
}

impl StoreUpdate {
    pub fn is_changed(&self) -> bool {
        matches!(self, StoreUpdate::Changed { .. })
    }

    pub fn order(&self) -> Option<&Arc<Order>> {
        match self {
            StoreUpdate::Changed { order, .. } => Some(order),
            StoreUpdate::Unchanged(order) => order.as_ref(),
        }
    }
}

/// An immutable snapshot of every tracked order.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    version: u64,
    orders: Vec<Arc<Order>>,
    by_id: HashMap<OrderId, usize>,
    by_handle: HashMap<Handle, usize>,
}

impl OrderBook {
    /// Incremented by every mutation that changed the book.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, id: &OrderId) -> Option<&Arc<Order>> {
        self.by_id.get(id).map(|&index| &self.orders[index])
    }

    pub fn get_by_handle(&self, handle: Handle) -> Option<&Arc<Order>> {
        self.by_handle.get(&handle).map(|&index| &self.orders[index])
    }

    /// Orders in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.iter()
    }

    pub fn executing(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders
            .iter()
            .filter(|order| order.status() == OrderStatus::Executing)
    }

    fn with_added(&self, order: Order) -> Result<(Self, Arc<Order>), StoreError> {
        if self.by_id.contains_key(&order.id) {
            return Err(StoreError::DuplicateId(order.id));
        }
        if let Some(handle) = order.handle {
            if let Some(holder) = self.get_by_handle(handle) {
                return Err(StoreError::HandleInUse {
                    handle,
                    holder: holder.id.clone(),
                });
            }
        }

        let mut next = self.clone();
        let index = next.orders.len();
        let order = Arc::new(order);
        next.by_id.insert(order.id.clone(), index);
        if let Some(handle) = order.handle {
            next.by_handle.insert(handle, index);
        }
        next.orders.push(order.clone());
        Ok((next, order))
    }

    fn with_replaced(&self, index: usize, order: Order) -> Result<(Self, Arc<Order>), StoreError> {
        let previous = &self.orders[index];
        let mut next = self.clone();

        if previous.handle != order.handle {
            if let Some(handle) = order.handle {
                if let Some(&holder) = self.by_handle.get(&handle) {
                    if holder != index {
                        return Err(StoreError::HandleInUse {
                            handle,
                            holder: self.orders[holder].id.clone(),
                        });
                    }
                }
                next.by_handle.insert(handle, index);
            }
            if let Some(old) = previous.handle {
                next.by_handle.remove(&old);
            }
        }

        let order = Arc::new(order);
        next.orders[index] = order.clone();
        Ok((next, order))
    }
}

/// Cloneable handle to the shared order book.
#[derive(Clone)]
pub struct OrderStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// Serializes writers; readers only touch the watch channel.
    write_lock: Mutex<()>,
    books: watch::Sender<Arc<OrderBook>>,
}

/// Receives a notification whenever the [`OrderStore`] changes.
pub struct OrderWatcher {
    rx: watch::Receiver<Arc<OrderBook>>,
}

impl OrderWatcher {
    /// Wait until the store is updated.
    ///
    /// Returns `Err` once every [`OrderStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }

    /// The latest book, marking it as seen.
    pub fn latest(&mut self) -> Arc<OrderBook> {
        self.rx.borrow_and_update().clone()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore {
    pub fn new() -> Self {
        let (books, _) = watch::channel(Arc::new(OrderBook::default()));
        Self {
            inner: Arc::new(StoreInner {
                write_lock: Mutex::new(()),
                books,
            }),
        }
    }

    /// Register a new order. Rejects duplicate ids and handles already held
    /// by another order.
    pub fn add(&self, order: Order) -> Result<Arc<Order>, StoreError> {
        self.commit(|book| {
            let (next, order) = book.with_added(order)?;
            Ok((Some(next), order))
        })
    }

    /// Bind the order to the transaction that submitted it.
    ///
    /// Moves `Created` to `AwaitingConfirmation`. An order still awaiting
    /// confirmation may switch to a new transaction (resubmission); once
    /// confirmed the submission transaction is fixed.
    pub fn record_submission(&self, id: &OrderId, tx: TxHash) -> Result<StoreUpdate, StoreError> {
        self.transition(id, |order| {
            let stage = match order.stage.apply(LifecycleEvent::Submitted) {
                Transition::Advanced { to, .. } => to,
                Transition::Ignored { stage, .. }
                    if stage == Stage::AwaitingConfirmation && order.submission_tx != Some(tx) =>
                {
                    stage
                }
                Transition::Ignored { .. } => return Ok(None),
            };
            Ok(Some(Order {
                submission_tx: Some(tx),
                stage,
                ..order.clone()
            }))
        })
    }

    /// Confirm the order with the handle from its placement event.
    ///
    /// `tx` must be the order's submission transaction. A second placement
    /// for an already confirmed order is ignored.
    pub fn assign_handle(
        &self,
        id: &OrderId,
        tx: TxHash,
        handle: Handle,
    ) -> Result<StoreUpdate, StoreError> {
        self.transition(id, |order| {
            if order.submission_tx != Some(tx) {
                return Err(StoreError::TransactionMismatch {
                    id: order.id.clone(),
                    tx,
                });
            }
            match order.stage.apply(LifecycleEvent::Placed) {
                Transition::Advanced { to, .. } => Ok(Some(Order {
                    handle: Some(handle),
                    stage: to,
                    ..order.clone()
                })),
                Transition::Ignored { .. } => Ok(None),
            }
        })
    }

    /// Apply a lifecycle event to the order with `id`.
    pub fn apply(&self, id: &OrderId, event: LifecycleEvent) -> Result<StoreUpdate, StoreError> {
        self.transition(id, |order| match order.stage.apply(event) {
            Transition::Advanced { to, .. } => Ok(Some(Order {
                stage: to,
                ..order.clone()
            })),
            Transition::Ignored { .. } => Ok(None),
        })
    }

    pub fn update_status_by_id(
        &self,
        id: &OrderId,
        status: TerminalStatus,
    ) -> Result<StoreUpdate, StoreError> {
        self.apply(id, status.into())
    }

    /// Resolve whichever order holds `handle`.
    ///
    /// A no-op when no order holds the handle or that order is already
    /// terminal.
    pub fn update_status_by_handle(&self, handle: Handle, status: TerminalStatus) -> StoreUpdate {
        let result = self.commit(|book| {
            let Some(&index) = book.by_handle.get(&handle) else {
                return Ok((None, StoreUpdate::Unchanged(None)));
            };
            let current = &book.orders[index];
            match current.stage.apply(status.into()) {
                Transition::Advanced { from, to } => {
                    let (next, order) = book.with_replaced(
                        index,
                        Order {
                            stage: to,
                            ..Order::clone(current)
                        },
                    )?;
                    Ok((Some(next), StoreUpdate::Changed { from, order }))
                }
                Transition::Ignored { .. } => {
                    Ok((None, StoreUpdate::Unchanged(Some(current.clone()))))
                }
            }
        });

        match result {
            Ok(update) => update,
            Err(e) => {
                error!(handle = %handle, error = %e, "Order book rejected a by-handle update");
                StoreUpdate::Unchanged(None)
            }
        }
    }

    pub fn get(&self, id: &OrderId) -> Option<Arc<Order>> {
        self.snapshot().get(id).cloned()
    }

    pub fn get_by_handle(&self, handle: Handle) -> Option<Arc<Order>> {
        self.snapshot().get_by_handle(handle).cloned()
    }

    pub fn list(&self) -> Vec<Arc<Order>> {
        self.snapshot().iter().cloned().collect()
    }

    pub fn list_executing(&self) -> Vec<Arc<Order>> {
        self.snapshot().executing().cloned().collect()
    }

    pub fn snapshot(&self) -> Arc<OrderBook> {
        self.inner.books.borrow().clone()
    }

    pub fn subscribe(&self) -> OrderWatcher {
        OrderWatcher {
            rx: self.inner.books.subscribe(),
        }
    }

    fn transition(
        &self,
        id: &OrderId,
        f: impl FnOnce(&Order) -> Result<Option<Order>, StoreError>,
    ) -> Result<StoreUpdate, StoreError> {
        self.commit(|book| {
            let index = *book
                .by_id
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let current = &book.orders[index];
            match f(current)? {
                None => Ok((None, StoreUpdate::Unchanged(Some(current.clone())))),
                Some(order) => {
                    let from = current.stage;
                    let (next, order) = book.with_replaced(index, order)?;
                    debug!(
                        order_id = %id,
                        from = ?from,
                        to = ?order.stage,
                        "Order updated"
                    );
                    Ok((Some(next), StoreUpdate::Changed { from, order }))
                }
            }
        })
    }

    /// Run one mutation against the current book and publish the result.
    ///
    /// `f` returns the replacement book, or `None` when nothing changed.
    fn commit<T>(
        &self,
        f: impl FnOnce(&OrderBook) -> Result<(Option<OrderBook>, T), StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.inner.write_lock.lock();
        let current = self.snapshot();
        let (next, output) = f(&current)?;
        if let Some(mut next) = next {
            next.version = current.version + 1;
            self.inner.books.send_replace(Arc::new(next));
        }
        Ok(output)
    }
}
