//! Fixtures shared by the unit tests: log builders and an in-memory chain.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloy_primitives::{Address, B256, Bytes, I256, TxHash, U64, U256, address};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::chain::contracts::{
    InEuint128, OrderFailed, OrderPlaced, OrderSettled, PoolKey, SwapParams, TestSettings,
};
use crate::chain::{
    ChainClient, ChainError, ChainSnapshot, DecryptStatusReader, HookLog, LogBatch, LogEntry,
    LogSource, MarketOrderWriter, ReceiptSource, TransactionReceipt,
};
use crate::entities::Handle;

pub const HOOK: Address = address!("0x00000000000000000000000000000000000000aa");
pub const USER_1: Address = address!("0x1111111111111111111111111111111111111111");
pub const USER_2: Address = address!("0x2222222222222222222222222222222222222222");

pub fn tx(n: u8) -> TxHash {
    B256::repeat_byte(n)
}

pub fn receipt(tx: TxHash, logs: Vec<LogEntry>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx,
        block_number: Some(U64::from(1)),
        status: Some(U64::from(1)),
        logs,
    }
}

pub fn reverted(tx: TxHash) -> TransactionReceipt {
    TransactionReceipt {
        status: Some(U64::ZERO),
        ..receipt(tx, vec![])
    }
}

fn log_entry(event: &impl SolEvent) -> LogEntry {
    let data = event.encode_log_data();
    LogEntry {
        address: HOOK,
        topics: data.topics().to_vec(),
        data: data.data,
        log_index: None,
    }
}

pub fn placed_log(user: Address, handle: u64) -> LogEntry {
    log_entry(&OrderPlaced {
        user,
        handle: U256::from(handle),
    })
}

pub fn settled_log(user: Address, handle: u64) -> LogEntry {
    log_entry(&OrderSettled {
        user,
        handle: U256::from(handle),
    })
}

pub fn failed_log(user: Address, handle: u64) -> LogEntry {
    log_entry(&OrderFailed {
        user,
        handle: U256::from(handle),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    PlaceMarketOrder { zero_for_one: bool, ct_hash: U256 },
    FlushOrder,
    Swap { zero_for_one: bool, amount_specified: I256 },
}

/// A scripted chain: receipts are pushed by the test, decryption status
/// reads pop from a per-handle script, hook logs are mined one per block,
/// writes are recorded.
pub struct MockChain {
    account: Address,
    snapshot: Mutex<Option<ChainSnapshot>>,
    receipts: Mutex<HashMap<TxHash, TransactionReceipt>>,
    receipt_ready: Notify,
    decrypt_script: Mutex<HashMap<Handle, VecDeque<Result<bool, String>>>>,
    decrypt_reads: Mutex<HashMap<Handle, u32>>,
    hook_logs: Mutex<Vec<HookLog>>,
    head: AtomicU64,
    log_queries: AtomicU64,
    failing_log_queries: AtomicU64,
    writes: Mutex<Vec<WriteCall>>,
    next_tx: AtomicU64,
    fail_writes: AtomicBool,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            account: USER_1,
            snapshot: Mutex::new(None),
            receipts: Mutex::new(HashMap::new()),
            receipt_ready: Notify::new(),
            decrypt_script: Mutex::new(HashMap::new()),
            decrypt_reads: Mutex::new(HashMap::new()),
            hook_logs: Mutex::new(Vec::new()),
            head: AtomicU64::new(0),
            log_queries: AtomicU64::new(0),
            failing_log_queries: AtomicU64::new(0),
            writes: Mutex::new(Vec::new()),
            next_tx: AtomicU64::new(0xf000),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make `receipt` available to current and future waiters.
    pub fn push_receipt(&self, receipt: TransactionReceipt) {
        self.receipts
            .lock()
            .insert(receipt.transaction_hash, receipt);
        self.receipt_ready.notify_waiters();
    }

    /// Results for successive status reads of `handle`. Once the script
    /// runs out every read reports `false`.
    pub fn script_decrypt(&self, handle: u64, results: Vec<Result<bool, &str>>) {
        let results = results
            .into_iter()
            .map(|r| r.map_err(str::to_owned))
            .collect();
        self.decrypt_script
            .lock()
            .insert(U256::from(handle), results);
    }

    pub fn decrypt_reads(&self, handle: u64) -> u32 {
        self.decrypt_reads
            .lock()
            .get(&U256::from(handle))
            .copied()
            .unwrap_or(0)
    }

    /// Mine a new block holding `entry`, emitted by `tx`.
    pub fn push_hook_log(&self, tx: TxHash, entry: LogEntry) {
        let mut logs = self.hook_logs.lock();
        let block_number = self.head.fetch_add(1, Ordering::SeqCst) + 1;
        logs.push(HookLog {
            transaction_hash: tx,
            block_number,
            entry,
        });
    }

    /// Number of `logs_since` calls, failed ones included.
    pub fn log_queries(&self) -> u64 {
        self.log_queries.load(Ordering::SeqCst)
    }

    /// Make the next `count` log queries fail.
    pub fn fail_log_queries(&self, count: u64) {
        self.failing_log_queries.store(count, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.lock().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record_write(&self, call: WriteCall) -> Result<TxHash, ChainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "insufficient funds".to_owned(),
            });
        }
        self.writes.lock().push(call);
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(B256::left_padding_from(&n.to_be_bytes()))
    }
}

#[async_trait]
impl ReceiptSource for MockChain {
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TransactionReceipt, ChainError> {
        loop {
            let notified = self.receipt_ready.notified();
            let ready = self.receipts.lock().get(&tx).cloned();
            if let Some(receipt) = ready {
                return Ok(receipt);
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DecryptStatusReader for MockChain {
    async fn order_decrypt_status(&self, handle: Handle) -> Result<bool, ChainError> {
        *self.decrypt_reads.lock().entry(handle).or_default() += 1;
        let next = self
            .decrypt_script
            .lock()
            .get_mut(&handle)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(decrypted)) => Ok(decrypted),
            Some(Err(message)) => Err(ChainError::Rpc {
                code: -32603,
                message,
            }),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LogSource for MockChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn logs_since(&self, from_block: u64) -> Result<LogBatch, ChainError> {
        self.log_queries.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_log_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ChainError::Rpc {
                code: -32005,
                message: "query timeout".to_owned(),
            });
        }

        let logs = self.hook_logs.lock();
        let head = self.head.load(Ordering::SeqCst);
        if from_block > head {
            return Ok(LogBatch {
                logs: Vec::new(),
                next_block: from_block,
            });
        }
        Ok(LogBatch {
            logs: logs
                .iter()
                .filter(|log| log.block_number >= from_block)
                .cloned()
                .collect(),
            next_block: head + 1,
        })
    }
}

#[async_trait]
impl MarketOrderWriter for MockChain {
    async fn place_market_order(
        &self,
        _key: &PoolKey,
        zero_for_one: bool,
        input: &InEuint128,
    ) -> Result<TxHash, ChainError> {
        self.record_write(WriteCall::PlaceMarketOrder {
            zero_for_one,
            ct_hash: input.ctHash,
        })
    }

    async fn flush_order(&self, _key: &PoolKey) -> Result<TxHash, ChainError> {
        self.record_write(WriteCall::FlushOrder)
    }

    async fn swap(
        &self,
        _key: &PoolKey,
        params: &SwapParams,
        _settings: &TestSettings,
        _hook_data: &Bytes,
    ) -> Result<TxHash, ChainError> {
        self.record_write(WriteCall::Swap {
            zero_for_one: params.zeroForOne,
            amount_specified: params.amountSpecified,
        })
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn connect(&self) -> Result<ChainSnapshot, ChainError> {
        let snapshot = ChainSnapshot {
            chain_id: 31337,
            account: self.account,
        };
        *self.snapshot.lock() = Some(snapshot);
        Ok(snapshot)
    }

    fn snapshot(&self) -> Option<ChainSnapshot> {
        *self.snapshot.lock()
    }
}
