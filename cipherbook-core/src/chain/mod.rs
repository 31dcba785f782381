//! Chain access for the lifecycle coordinator.
//!
//! The coordinator never talks to a node directly; it is handed something
//! implementing [`ChainClient`]. [`JsonRpcClient`] is the production
//! implementation on top of an alloy HTTP provider.

pub mod contracts;
pub mod decoder;
pub mod receipt;
pub mod rpc;

pub use decoder::{DecodedReceipt, EventDecoder, MarketOrderEventKind, ParsedEvent, Resolution};
pub use receipt::{HookLog, LogEntry, ReceiptOutcome, TransactionReceipt};
pub use rpc::JsonRpcClient;

use alloy_primitives::{Address, Bytes, TxHash};
use alloy_transport::TransportError;
use async_trait::async_trait;
use thiserror::Error;

use crate::chain::contracts::{InEuint128, PoolKey, SwapParams, TestSettings};
use crate::entities::Handle;

/// Errors that can occur while talking to the chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport failure or a response the provider could not interpret
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// ABI decoding of a call result failed
    #[error("abi decode error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    /// `connect` has not completed yet
    #[error("chain client is not connected")]
    NotConnected,
}

impl From<TransportError> for ChainError {
    fn from(error: TransportError) -> Self {
        match error.as_error_resp() {
            Some(payload) => ChainError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            None => ChainError::Transport(error),
        }
    }
}

/// What the coordinator needs to know about the connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub chain_id: u64,
    /// The local wallet; placement events are only accepted for it.
    pub account: Address,
}

/// Resolves transaction receipts.
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// Wait until `tx` is mined and return its receipt.
    ///
    /// Implementations may wait forever for a transaction that is dropped
    /// or replaced; callers that need a bound must impose their own.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TransactionReceipt, ChainError>;
}

/// Reads the hook's decryption status for a handle.
#[async_trait]
pub trait DecryptStatusReader: Send + Sync {
    /// `getOrderDecryptStatus(handle)`
    async fn order_decrypt_status(&self, handle: Handle) -> Result<bool, ChainError>;
}

/// Hook event logs found since a given block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBatch {
    /// In block order, then log order.
    pub logs: Vec<HookLog>,
    /// Where the next query should start.
    pub next_block: u64,
}

/// Queries the hook's `OrderSettled` / `OrderFailed` logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// The current head block.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Settlement and failure logs from `from_block` up to the current head.
    async fn logs_since(&self, from_block: u64) -> Result<LogBatch, ChainError>;
}

/// Submits the write calls of the market order flow.
#[async_trait]
pub trait MarketOrderWriter: Send + Sync {
    async fn place_market_order(
        &self,
        key: &PoolKey,
        zero_for_one: bool,
        input: &InEuint128,
    ) -> Result<TxHash, ChainError>;

    async fn flush_order(&self, key: &PoolKey) -> Result<TxHash, ChainError>;

    async fn swap(
        &self,
        key: &PoolKey,
        params: &SwapParams,
        settings: &TestSettings,
        hook_data: &Bytes,
    ) -> Result<TxHash, ChainError>;
}

/// A connected chain session, injected into every component that reads or
/// writes chain state.
#[async_trait]
pub trait ChainClient: ReceiptSource + DecryptStatusReader + LogSource + MarketOrderWriter {
    /// Establish the session and return its snapshot.
    async fn connect(&self) -> Result<ChainSnapshot, ChainError>;

    /// The snapshot taken by the last successful [`connect`](Self::connect).
    fn snapshot(&self) -> Option<ChainSnapshot>;
}
