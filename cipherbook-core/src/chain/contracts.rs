//! Contract surface of the market order hook and the swap router.
//!
//! Only the calls and events the lifecycle coordinator needs are declared.

use alloy_primitives::aliases::U160;
use alloy_primitives::uint;
use alloy_sol_types::sol;

sol! {
    /// Emitted by `placeMarketOrder` once the encrypted order is accepted.
    #[derive(Debug, PartialEq, Eq)]
    event OrderPlaced(address indexed user, uint256 handle);

    /// Emitted by whichever transaction executed a queued order.
    #[derive(Debug, PartialEq, Eq)]
    event OrderSettled(address indexed user, uint256 handle);

    /// Emitted by whichever transaction could not execute a queued order.
    #[derive(Debug, PartialEq, Eq)]
    event OrderFailed(address indexed user, uint256 handle);

    #[derive(Debug, PartialEq, Eq)]
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct InEuint128 {
        uint256 ctHash;
        uint8 securityZone;
        uint8 utype;
        bytes signature;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SwapParams {
        bool zeroForOne;
        int256 amountSpecified;
        uint160 sqrtPriceLimitX96;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct TestSettings {
        bool takeClaims;
        bool settleUsingBurn;
    }

    function placeMarketOrder(PoolKey key, bool zeroForOne, InEuint128 liquidity) external;
    function flushOrder(PoolKey key) external;
    function getOrderDecryptStatus(uint256 handle) external view returns (bool);
    function swap(PoolKey key, SwapParams params, TestSettings testSettings, bytes hookData) external payable returns (int256 delta);
}

/// Lowest price limit accepted by the pool, plus one.
pub const MIN_SQRT_PRICE_LIMIT: U160 = uint!(4295128740_U160);

/// Highest price limit accepted by the pool, minus one.
pub const MAX_SQRT_PRICE_LIMIT: U160 =
    uint!(1461446703485210103287273052203988822378723970341_U160);

/// Price limit for an unbounded swap in the given direction.
pub fn sqrt_price_limit(zero_for_one: bool) -> U160 {
    if zero_for_one {
        MIN_SQRT_PRICE_LIMIT
    } else {
        MAX_SQRT_PRICE_LIMIT
    }
}

/// Gas limit sent with `placeMarketOrder`; FHE input verification makes
/// node-side estimation unreliable.
pub const PLACE_MARKET_ORDER_GAS: u64 = 1_000_000;
