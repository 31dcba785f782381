//! Runtime configuration types.
//!
//! The coordinator's config types are defined in `cipherbook-core::config`.
//! This module re-exports them next to the server's own section.

use std::net::SocketAddr;

pub use cipherbook_core::config::{ChainConfig, PollerConfig, PoolConfig, SwapConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}
