//! Configuration types for the cipherbook coordinator.
//!
//! These types represent the validated runtime configuration used by the
//! server and can be shared across crates. The actual config loading/parsing
//! is handled by the server crate.

mod chain;
mod pool;
mod poller;
mod swap;

pub use chain::ChainConfig;
pub use pool::PoolConfig;
pub use poller::PollerConfig;
pub use swap::SwapConfig;
