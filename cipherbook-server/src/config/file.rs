//! TOML file configuration structures.
//!
//! These structs directly map to the `cipherbook.toml` file format.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub pool: PoolConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub swap: SwapConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Chain connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint. Overridden by `CIPHERBOOK_RPC_URL`.
    pub rpc_url: Url,
    /// Unlocked account the node signs writes with.
    pub account: Address,
    pub market_order_hook: Address,
    pub swap_router: Address,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

/// Pool section. `fee` must fit a uint24 and `tick_spacing` an int24.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub currency0: Address,
    pub currency1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

/// Router test settings and hook data sent with every swap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default)]
    pub take_claims: bool,
    #[serde(default)]
    pub settle_using_burn: bool,
    #[serde(default)]
    pub hook_data: Bytes,
}
