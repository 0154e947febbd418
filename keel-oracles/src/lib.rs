pub mod clock;
pub mod price_feed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use price_feed::{PriceFeed, RoundData};

use keel_types::AssetId;

/// One point-in-time reading from a feed: an 8-decimal answer plus a staleness verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceReading {
    pub price: i128,
    pub is_stale: bool,
}

/// Source of USD prices for collateral assets.
pub trait PriceOracle: Send + Sync {
    fn latest_price(&self, asset: &AssetId) -> PriceReading;
}
