//! Application state shared across all request handlers.

use cipherbook_core::chain::JsonRpcClient;
use cipherbook_core::desk::OrderDesk;
use cipherbook_core::processors::CoordinatorHandle;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Reads, status updates and watch commands.
    pub coordinator: CoordinatorHandle,
    /// Write paths submitted from the configured account.
    pub desk: Arc<OrderDesk<JsonRpcClient>>,
}

impl AppState {
    pub fn new(coordinator: CoordinatorHandle, desk: OrderDesk<JsonRpcClient>) -> Self {
        Self {
            coordinator,
            desk: Arc::new(desk),
        }
    }
}
