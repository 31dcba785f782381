//! Receipts and logs in the shape the decoder works on, converted from the
//! RPC types returned by the provider.

use alloy_primitives::{Address, B256, Bytes, TxHash, U64};
use alloy_provider::network::ReceiptResponse;
use alloy_rpc_types_eth::Log;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<U64>,
    /// `0x1` on success, `0x0` on revert.
    pub status: Option<U64>,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: Option<U64>,
}

/// A hook event found by a log query rather than in a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookLog {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub entry: LogEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptOutcome {
    Success,
    Reverted,
    Unknown,
}

impl TransactionReceipt {
    pub fn outcome(&self) -> ReceiptOutcome {
        match self.status {
            Some(status) if status == U64::from(1) => ReceiptOutcome::Success,
            Some(_) => ReceiptOutcome::Reverted,
            None => ReceiptOutcome::Unknown,
        }
    }
}

impl From<&alloy_rpc_types_eth::TransactionReceipt> for TransactionReceipt {
    fn from(receipt: &alloy_rpc_types_eth::TransactionReceipt) -> Self {
        let success = ReceiptResponse::status(receipt);
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(U64::from),
            status: Some(U64::from(u8::from(success))),
            logs: receipt.inner.logs().iter().map(LogEntry::from).collect(),
        }
    }
}

impl From<&Log> for LogEntry {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            log_index: log.log_index.map(U64::from),
        }
    }
}

impl HookLog {
    /// `None` for pending logs and logs removed by a reorg.
    pub fn from_rpc(log: &Log) -> Option<Self> {
        if log.removed {
            return None;
        }
        Some(Self {
            transaction_hash: log.transaction_hash?,
            block_number: log.block_number?,
            entry: LogEntry::from(log),
        })
    }
}
