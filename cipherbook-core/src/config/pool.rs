//! Pool configuration.

use alloy_primitives::Address;
use alloy_primitives::aliases::{I24, U24};

use crate::chain::contracts::PoolKey;

/// The pool market orders are placed on. The hook is always the configured
/// market order hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub currency0: Address,
    pub currency1: Address,
    /// Fee in hundredths of a bip.
    pub fee: U24,
    pub tick_spacing: I24,
}

impl PoolConfig {
    pub fn pool_key(&self, hooks: Address) -> PoolKey {
        PoolKey {
            currency0: self.currency0,
            currency1: self.currency1,
            fee: self.fee,
            tickSpacing: self.tick_spacing,
            hooks,
        }
    }
}
