use std::time::Duration;

/// Decryption polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
}

impl PollerConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}
