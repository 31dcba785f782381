//! Configuration module for cipherbook-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments and
//! environment variables, then validates it into the runtime types.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{ChainConfig, PollerConfig, PoolConfig, ServerConfig, SwapConfig};
use alloy_primitives::aliases::{I24, U24};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub pool: PoolConfig,
    pub poller: PollerConfig,
    pub swap: SwapConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
    rpc_url_override: Option<Url>,
}

impl ConfigLoader {
    pub fn new(
        config_path: impl AsRef<Path>,
        listen_override: Option<SocketAddr>,
        rpc_url_override: Option<Url>,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
            rpc_url_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI and environment overrides
    /// 3. Validate and convert into the runtime types
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }
        if let Some(rpc_url) = &self.rpc_url_override {
            file_config.chain.rpc_url = rpc_url.clone();
        }

        build_loaded_config(file_config)
    }
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let FileConfig {
        server,
        chain,
        pool,
        poller,
        swap,
    } = file_config;

    let fee = U24::try_from(pool.fee).map_err(|_| {
        ConfigError::Validation(format!("pool fee {} does not fit uint24", pool.fee))
    })?;
    let tick_spacing = I24::try_from(pool.tick_spacing).map_err(|_| {
        ConfigError::Validation(format!(
            "pool tick_spacing {} does not fit int24",
            pool.tick_spacing
        ))
    })?;

    Ok(LoadedConfig {
        server: ServerConfig {
            listen: server.listen,
        },
        chain: ChainConfig {
            rpc_url: chain.rpc_url,
            account: chain.account,
            market_order_hook: chain.market_order_hook,
            swap_router: chain.swap_router,
            receipt_poll_interval: non_zero_millis(
                "chain.receipt_poll_interval_ms",
                chain.receipt_poll_interval_ms,
            )?,
        },
        pool: PoolConfig {
            currency0: pool.currency0,
            currency1: pool.currency1,
            fee,
            tick_spacing,
        },
        poller: PollerConfig {
            interval: non_zero_millis("poller.interval_ms", poller.interval_ms)?,
        },
        swap: SwapConfig {
            take_claims: swap.take_claims,
            settle_using_burn: swap.settle_using_burn,
            hook_data: swap.hook_data,
        },
    })
}

fn non_zero_millis(field: &str, millis: u64) -> Result<Duration, ConfigError> {
    if millis == 0 {
        return Err(ConfigError::Validation(format!("{field} must be non-zero")));
    }
    Ok(Duration::from_millis(millis))
}
