//! Chain connection configuration.

use std::time::Duration;

use alloy_primitives::Address;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// The local wallet. Writes are sent from it and only placement events
    /// for it confirm an order.
    pub account: Address,
    /// The market order hook; emitter of the order events.
    pub market_order_hook: Address,
    /// Router used for swaps.
    pub swap_router: Address,
    /// Delay between `eth_getTransactionReceipt` lookups while a
    /// transaction is pending.
    pub receipt_poll_interval: Duration,
}
