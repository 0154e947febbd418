//! Fixed-point parameters of the engine.
//!
//! Token amounts, USD values and health factors are 18-decimal fixed point.
//! Price feeds answer with 8 decimals and are lifted by [`FEED_SCALE`].

use alloy_primitives::U256;

/// 1.0 in 18-decimal fixed point.
pub const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Lifts an 8-decimal feed answer to 18 decimals.
pub const FEED_SCALE: U256 = U256::from_limbs([10_000_000_000, 0, 0, 0]);

pub const FEED_DECIMALS: u8 = 8;

/// Share of nominal collateral value (out of [`LIQUIDATION_PRECISION`]) that counts towards solvency.
pub const LIQUIDATION_THRESHOLD: U256 = U256::from_limbs([50, 0, 0, 0]);

pub const LIQUIDATION_PRECISION: U256 = U256::from_limbs([100, 0, 0, 0]);

/// Liquidator incentive, out of [`LIQUIDATION_PRECISION`].
pub const LIQUIDATION_BONUS: U256 = U256::from_limbs([10, 0, 0, 0]);

pub const MIN_HEALTH_FACTOR: U256 = PRECISION;

/// Returned by the risk engine for positions without debt.
pub const MAX_HEALTH_FACTOR: U256 = U256::MAX;

/// Feeds older than this are treated as stale.
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 3 * 60 * 60;

/// Rounds kept per feed.
pub const FEED_HISTORY_LEN: usize = 64;
