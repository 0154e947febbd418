//! keel-oracles/src/price_feed.rs
//! Round-based USD price feed with an 8-decimal answer and a staleness timeout.

use crate::clock::Clock;
use crate::{PriceOracle, PriceReading};
use keel_types::constants::{DEFAULT_FEED_TIMEOUT_SECS, FEED_DECIMALS, FEED_HISTORY_LEN};
use keel_types::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

pub struct PriceFeed {
    symbol: String,
    timeout_secs: u64,
    clock: Arc<dyn Clock>,
    rounds: RwLock<VecDeque<RoundData>>, // oldest first, bounded by FEED_HISTORY_LEN
}

impl PriceFeed {
    /// Opens the feed with `initial_answer` as round 1.
    pub fn new(symbol: &str, initial_answer: i128, clock: Arc<dyn Clock>) -> Self {
        let feed = Self {
            symbol: symbol.to_string(),
            timeout_secs: DEFAULT_FEED_TIMEOUT_SECS,
            clock,
            rounds: RwLock::new(VecDeque::with_capacity(FEED_HISTORY_LEN)),
        };
        feed.update_answer(initial_answer);
        feed
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        FEED_DECIMALS
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Publishes a new round stamped with the clock's current time.
    pub fn update_answer(&self, answer: i128) {
        let now = self.clock.now();
        let mut rounds = self.rounds.write().unwrap_or_else(PoisonError::into_inner);
        let round_id = rounds.back().map(|r| r.round_id + 1).unwrap_or(1);
        rounds.push_back(RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        });
        if rounds.len() > FEED_HISTORY_LEN {
            rounds.pop_front();
        }
        debug!(symbol = %self.symbol, round_id, %answer, "feed answer updated");
    }

    /// Appends `round` as the latest round, timestamps included.
    pub fn update_round_data(&self, round: RoundData) {
        let mut rounds = self.rounds.write().unwrap_or_else(PoisonError::into_inner);
        rounds.push_back(round);
        if rounds.len() > FEED_HISTORY_LEN {
            rounds.pop_front();
        }
    }

    pub fn latest_round_data(&self) -> Option<RoundData> {
        self.rounds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .copied()
    }

    pub fn round_data(&self, round_id: u64) -> Option<RoundData> {
        self.rounds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.round_id == round_id)
            .copied()
    }

    fn is_round_fresh(&self, round: &RoundData) -> bool {
        if round.updated_at == 0 || round.answered_in_round < round.round_id {
            return false;
        }
        self.clock.now().saturating_sub(round.updated_at) <= self.timeout_secs
    }
}

impl PriceOracle for PriceFeed {
    fn latest_price(&self, asset: &AssetId) -> PriceReading {
        match self.latest_round_data() {
            Some(round) => {
                let is_stale = !self.is_round_fresh(&round);
                if is_stale {
                    warn!(symbol = %self.symbol, %asset, updated_at = round.updated_at, "stale price round");
                }
                PriceReading {
                    price: round.answer,
                    is_stale,
                }
            }
            None => PriceReading {
                price: 0,
                is_stale: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn feed(clock: &ManualClock) -> PriceFeed {
        PriceFeed::new("WETH", 2_000_00000000, Arc::new(clock.clone()))
    }

    #[test]
    fn fresh_round_is_not_stale() {
        let clock = ManualClock::new(1_700_000_000);
        let feed = feed(&clock);
        let reading = feed.latest_price(&AssetId::new("WETH"));
        assert_eq!(reading.price, 2_000_00000000);
        assert!(!reading.is_stale);
    }

    #[test]
    fn round_goes_stale_after_timeout() {
        let clock = ManualClock::new(1_700_000_000);
        let feed = feed(&clock);

        clock.advance(DEFAULT_FEED_TIMEOUT_SECS);
        assert!(!feed.latest_price(&AssetId::new("WETH")).is_stale);

        clock.advance(1);
        assert!(feed.latest_price(&AssetId::new("WETH")).is_stale);

        feed.update_answer(1_900_00000000);
        let reading = feed.latest_price(&AssetId::new("WETH"));
        assert!(!reading.is_stale);
        assert_eq!(reading.price, 1_900_00000000);
    }

    #[test]
    fn reports_feed_metadata() {
        let feed = feed(&ManualClock::new(1)).with_timeout(60);
        assert_eq!(feed.symbol(), "WETH");
        assert_eq!(feed.decimals(), FEED_DECIMALS);
        assert_eq!(feed.timeout_secs(), 60);
    }

    #[test]
    fn clock_set_back_to_round_time_is_fresh_again() {
        let clock = ManualClock::new(1_000);
        let feed = feed(&clock).with_timeout(60);
        clock.set(1_061);
        assert!(feed.latest_price(&AssetId::new("WETH")).is_stale);
        clock.set(1_060);
        assert!(!feed.latest_price(&AssetId::new("WETH")).is_stale);
    }

    #[test]
    fn never_updated_round_is_stale() {
        let clock = ManualClock::new(100);
        let feed = feed(&clock);
        feed.update_round_data(RoundData {
            round_id: 2,
            answer: 1,
            started_at: 0,
            updated_at: 0,
            answered_in_round: 2,
        });
        assert!(feed.latest_price(&AssetId::new("WETH")).is_stale);
    }

    #[test]
    fn incomplete_round_is_stale() {
        let clock = ManualClock::new(100);
        let feed = feed(&clock);
        feed.update_round_data(RoundData {
            round_id: 5,
            answer: 1,
            started_at: 100,
            updated_at: 100,
            answered_in_round: 4,
        });
        assert!(feed.latest_price(&AssetId::new("WETH")).is_stale);
    }

    #[test]
    fn history_is_bounded() {
        let clock = ManualClock::new(1);
        let feed = feed(&clock);
        for i in 0..(FEED_HISTORY_LEN as i128 + 10) {
            feed.update_answer(i + 1);
        }
        assert!(feed.round_data(1).is_none());
        let latest = feed.latest_round_data().unwrap();
        assert_eq!(latest.round_id, FEED_HISTORY_LEN as u64 + 11);
        assert!(feed.round_data(latest.round_id - 1).is_some());
    }
}
