//! alloy provider implementation of [`ChainClient`].
//!
//! Writes go through `eth_sendTransaction` from the configured account, so
//! the node (or a signing proxy in front of it) must hold that account
//! unlocked.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::network::TransactionBuilder;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{Filter, TransactionRequest};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::contracts::{
    InEuint128, OrderFailed, OrderSettled, PLACE_MARKET_ORDER_GAS, PoolKey, SwapParams,
    TestSettings, flushOrderCall, getOrderDecryptStatusCall, placeMarketOrderCall, swapCall,
};
use super::{
    ChainClient, ChainError, ChainSnapshot, DecryptStatusReader, HookLog, LogBatch, LogSource,
    MarketOrderWriter, ReceiptSource, TransactionReceipt,
};
use crate::config::ChainConfig;
use crate::entities::Handle;

pub struct JsonRpcClient {
    provider: DynProvider,
    endpoint: Url,
    account: Address,
    market_order_hook: Address,
    swap_router: Address,
    receipt_poll_interval: Duration,
    snapshot: RwLock<Option<ChainSnapshot>>,
}

impl JsonRpcClient {
    pub fn new(config: &ChainConfig) -> Self {
        let provider = ProviderBuilder::new()
            .connect_http(config.rpc_url.clone())
            .erased();
        Self {
            provider,
            endpoint: config.rpc_url.clone(),
            account: config.account,
            market_order_hook: config.market_order_hook,
            swap_router: config.swap_router,
            receipt_poll_interval: config.receipt_poll_interval,
            snapshot: RwLock::new(None),
        }
    }

    async fn send_transaction(
        &self,
        to: Address,
        data: Vec<u8>,
        gas: Option<u64>,
    ) -> Result<TxHash, ChainError> {
        let mut request = TransactionRequest::default()
            .with_from(self.account)
            .with_to(to)
            .with_input(data);
        if let Some(gas) = gas {
            request.set_gas_limit(gas);
        }

        let pending = self.provider.send_transaction(request).await?;
        let hash = *pending.tx_hash();
        debug!(tx = %hash, to = %to, "Transaction submitted");
        Ok(hash)
    }
}

#[async_trait]
impl ReceiptSource for JsonRpcClient {
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TransactionReceipt, ChainError> {
        loop {
            match self.provider.get_transaction_receipt(tx).await {
                Ok(Some(receipt)) => return Ok(TransactionReceipt::from(&receipt)),
                Ok(None) => {}
                Err(e) => {
                    warn!(tx = %tx, error = %e, "Receipt lookup failed, retrying");
                }
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl DecryptStatusReader for JsonRpcClient {
    async fn order_decrypt_status(&self, handle: Handle) -> Result<bool, ChainError> {
        let request = TransactionRequest::default()
            .with_to(self.market_order_hook)
            .with_input(getOrderDecryptStatusCall { handle }.abi_encode());
        let output: Bytes = self.provider.call(request).await?;
        Ok(getOrderDecryptStatusCall::abi_decode_returns(&output)?)
    }
}

#[async_trait]
impl LogSource for JsonRpcClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn logs_since(&self, from_block: u64) -> Result<LogBatch, ChainError> {
        let head = self.provider.get_block_number().await?;
        if from_block > head {
            return Ok(LogBatch {
                logs: Vec::new(),
                next_block: from_block,
            });
        }

        let filter = Filter::new()
            .address(self.market_order_hook)
            .event_signature(vec![OrderSettled::SIGNATURE_HASH, OrderFailed::SIGNATURE_HASH])
            .from_block(from_block)
            .to_block(head);
        let logs = self.provider.get_logs(&filter).await?;
        debug!(from_block, to_block = head, logs = logs.len(), "Hook logs fetched");

        Ok(LogBatch {
            logs: logs.iter().filter_map(HookLog::from_rpc).collect(),
            next_block: head + 1,
        })
    }
}

#[async_trait]
impl MarketOrderWriter for JsonRpcClient {
    async fn place_market_order(
        &self,
        key: &PoolKey,
        zero_for_one: bool,
        input: &InEuint128,
    ) -> Result<TxHash, ChainError> {
        let data = placeMarketOrderCall {
            key: key.clone(),
            zeroForOne: zero_for_one,
            liquidity: input.clone(),
        }
        .abi_encode();
        self.send_transaction(self.market_order_hook, data, Some(PLACE_MARKET_ORDER_GAS))
            .await
    }

    async fn flush_order(&self, key: &PoolKey) -> Result<TxHash, ChainError> {
        let data = flushOrderCall { key: key.clone() }.abi_encode();
        self.send_transaction(self.market_order_hook, data, None).await
    }

    async fn swap(
        &self,
        key: &PoolKey,
        params: &SwapParams,
        settings: &TestSettings,
        hook_data: &Bytes,
    ) -> Result<TxHash, ChainError> {
        let data = swapCall {
            key: key.clone(),
            params: params.clone(),
            testSettings: settings.clone(),
            hookData: hook_data.clone(),
        }
        .abi_encode();
        self.send_transaction(self.swap_router, data, None).await
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn connect(&self) -> Result<ChainSnapshot, ChainError> {
        let chain_id = self.provider.get_chain_id().await?;
        let snapshot = ChainSnapshot {
            chain_id,
            account: self.account,
        };
        *self.snapshot.write() = Some(snapshot);
        info!(
            chain_id = snapshot.chain_id,
            account = %snapshot.account,
            endpoint = %self.endpoint,
            "Connected to chain"
        );
        Ok(snapshot)
    }

    fn snapshot(&self) -> Option<ChainSnapshot> {
        *self.snapshot.read()
    }
}
