use alloy_primitives::Bytes;

/// Settings passed to the swap router with every swap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapConfig {
    pub take_claims: bool,
    pub settle_using_burn: bool,
    pub hook_data: Bytes,
}
