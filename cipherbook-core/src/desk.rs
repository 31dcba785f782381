//! Write paths of the market order flow.
//!
//! [`OrderDesk`] submits transactions on behalf of the configured account
//! and hands every resulting hash to the coordinator: placements are
//! tracked as submissions, swaps and flushes as triggers.

use std::sync::Arc;

use alloy_primitives::{I256, TxHash, U256};
use cipherbook_sdk::objects::{EncryptedInput, TerminalStatus};
use thiserror::Error;
use tracing::{error, info};

use crate::chain::contracts::{InEuint128, PoolKey, SwapParams, TestSettings, sqrt_price_limit};
use crate::chain::{ChainClient, ChainError};
use crate::config::SwapConfig;
use crate::entities::{NewOrder, Order};
use crate::processors::{CoordinatorError, CoordinatorHandle};

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("chain write failed: {0}")]
    Chain(#[from] ChainError),

    /// `amount_in` does not fit a signed 256 bit amount.
    #[error("swap amount {0} is out of range")]
    AmountOutOfRange(U256),
}

impl From<&EncryptedInput> for InEuint128 {
    fn from(input: &EncryptedInput) -> Self {
        Self {
            ctHash: input.ct_hash,
            securityZone: input.security_zone,
            utype: input.utype,
            signature: input.signature.clone(),
        }
    }
}

/// A market order accepted by the node, with its placement transaction.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub tx: TxHash,
    pub order: Arc<Order>,
}

pub struct OrderDesk<C> {
    chain: Arc<C>,
    coordinator: CoordinatorHandle,
    pool_key: PoolKey,
    swap: SwapConfig,
}

impl<C> OrderDesk<C>
where
    C: ChainClient,
{
    pub fn new(
        chain: Arc<C>,
        coordinator: CoordinatorHandle,
        pool_key: PoolKey,
        swap: SwapConfig,
    ) -> Self {
        Self {
            chain,
            coordinator,
            pool_key,
            swap,
        }
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    /// Register `order`, submit `placeMarketOrder` and track the returned
    /// transaction.
    ///
    /// A rejected write leaves the order registered as `failed`.
    pub async fn place_market_order(
        &self,
        order: NewOrder,
        zero_for_one: bool,
        input: &InEuint128,
    ) -> Result<PlacedOrder, DeskError> {
        let order = self.coordinator.add_async_order(order)?;

        let tx = match self
            .chain
            .place_market_order(&self.pool_key, zero_for_one, input)
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                error!(order_id = %order.id, error = %e, "placeMarketOrder submission failed");
                self.coordinator
                    .update_order_status(&order.id, TerminalStatus::Failed)?;
                return Err(e.into());
            }
        };

        info!(order_id = %order.id, tx = %tx, zero_for_one, "Market order submitted");
        let order = self.coordinator.track_submission(&order.id, tx).await?;
        Ok(PlacedOrder { tx, order })
    }

    /// Exact input swap through the router. The swap transaction is
    /// watched as a trigger since it may execute queued orders.
    pub async fn swap(&self, zero_for_one: bool, amount_in: U256) -> Result<TxHash, DeskError> {
        let amount =
            I256::try_from(amount_in).map_err(|_| DeskError::AmountOutOfRange(amount_in))?;
        let params = SwapParams {
            zeroForOne: zero_for_one,
            amountSpecified: -amount,
            sqrtPriceLimitX96: sqrt_price_limit(zero_for_one),
        };
        let settings = TestSettings {
            takeClaims: self.swap.take_claims,
            settleUsingBurn: self.swap.settle_using_burn,
        };

        let tx = self
            .chain
            .swap(&self.pool_key, &params, &settings, &self.swap.hook_data)
            .await?;
        info!(tx = %tx, zero_for_one, amount_in = %amount_in, "Swap submitted");
        self.coordinator.watch_trigger(tx).await?;
        Ok(tx)
    }

    /// `flushOrder(poolKey)`, watched as a trigger.
    pub async fn flush_order(&self) -> Result<TxHash, DeskError> {
        let tx = self.chain.flush_order(&self.pool_key).await?;
        info!(tx = %tx, "Flush submitted");
        self.coordinator.watch_trigger(tx).await?;
        Ok(tx)
    }
}
