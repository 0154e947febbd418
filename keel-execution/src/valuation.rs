//! Token amount <-> USD conversion.
//!
//! Both directions floor, so `token_amount_from_usd(usd_value(x))` may come back
//! short of `x` by the truncation of the two divisions. That loss is expected.

use crate::registry::AssetRegistry;
use keel_types::constants::{FEED_SCALE, PRECISION};
use keel_types::{AssetId, EngineError, EngineResult, U256};

/// Current 8-decimal price of `asset`, rejecting stale or non-positive answers.
pub fn price_of(registry: &AssetRegistry, asset: &AssetId) -> EngineResult<U256> {
    let reading = registry.oracle(asset)?.latest_price(asset);
    if reading.is_stale {
        return Err(EngineError::StalePrice(asset.clone()));
    }
    if reading.price <= 0 {
        return Err(EngineError::InvalidPrice {
            asset: asset.clone(),
            answer: reading.price,
        });
    }
    Ok(U256::from(reading.price as u128))
}

/// `price * FEED_SCALE * amount / PRECISION`
pub fn usd_value(registry: &AssetRegistry, asset: &AssetId, amount: U256) -> EngineResult<U256> {
    let price = price_of(registry, asset)?;
    let scaled = price
        .checked_mul(FEED_SCALE)
        .and_then(|p| p.checked_mul(amount))
        .ok_or(EngineError::Overflow)?;
    Ok(scaled / PRECISION)
}

/// `usd * PRECISION / (price * FEED_SCALE)`
pub fn token_amount_from_usd(
    registry: &AssetRegistry,
    asset: &AssetId,
    usd: U256,
) -> EngineResult<U256> {
    let price = price_of(registry, asset)?;
    let numerator = usd.checked_mul(PRECISION).ok_or(EngineError::Overflow)?;
    let denominator = price.checked_mul(FEED_SCALE).ok_or(EngineError::Overflow)?;
    Ok(numerator / denominator)
}
