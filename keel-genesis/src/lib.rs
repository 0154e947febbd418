//! Engine configuration: the collateral set, initial feed answers and the
//! custody account, loaded from JSON and turned into a ready [`Engine`].

use anyhow::{bail, Context, Result};
use keel_execution::{AssetRegistry, Engine, TokenBank};
use keel_oracles::{Clock, PriceFeed, PriceOracle};
use keel_types::constants::DEFAULT_FEED_TIMEOUT_SECS;
use keel_types::{Address, AssetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CollateralConfig {
    pub symbol: String,
    /// USD price with 8 decimals.
    pub initial_answer: i128,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenesisConfig {
    /// Hex-encoded 32-byte engine account.
    pub custody: String,
    #[serde(default = "default_debt_symbol")]
    pub debt_symbol: String,
    #[serde(default = "default_timeout")]
    pub feed_timeout_secs: u64,
    pub collateral: Vec<CollateralConfig>,
}

fn default_debt_symbol() -> String {
    "KUSD".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_FEED_TIMEOUT_SECS
}

impl Default for GenesisConfig {
    /// WETH at $2000 and WBTC at $1000.
    fn default() -> Self {
        Self {
            custody: hex::encode([0xeeu8; 32]),
            debt_symbol: default_debt_symbol(),
            feed_timeout_secs: DEFAULT_FEED_TIMEOUT_SECS,
            collateral: vec![
                CollateralConfig {
                    symbol: "WETH".to_string(),
                    initial_answer: 2_000_00000000,
                },
                CollateralConfig {
                    symbol: "WBTC".to_string(),
                    initial_answer: 1_000_00000000,
                },
            ],
        }
    }
}

impl GenesisConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read genesis file {}", path.display()))?;
        let config: GenesisConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse genesis file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.custody_address()?;
        if self.collateral.is_empty() {
            bail!("Genesis lists no collateral assets");
        }
        for entry in &self.collateral {
            if entry.initial_answer <= 0 {
                bail!("Initial answer for {} must be positive", entry.symbol);
            }
        }
        Ok(())
    }

    pub fn custody_address(&self) -> Result<Address> {
        let bytes = hex::decode(&self.custody).context("Custody address is not hex")?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| anyhow::anyhow!("Custody address must be 32 bytes, got {}", b.len()))
    }

    pub fn assets(&self) -> Vec<AssetId> {
        self.collateral.iter().map(|c| AssetId::new(&c.symbol)).collect()
    }
}

/// A freshly built engine plus handles to its feeds, for driving prices.
pub struct Bootstrapped {
    pub engine: Engine<TokenBank, TokenBank>,
    pub feeds: BTreeMap<AssetId, Arc<PriceFeed>>,
}

pub fn bootstrap(config: &GenesisConfig, clock: Arc<dyn Clock>) -> Result<Bootstrapped> {
    config.validate()?;
    let custody = config.custody_address()?;

    let mut feeds = BTreeMap::new();
    let mut oracles: Vec<Arc<dyn PriceOracle>> = Vec::with_capacity(config.collateral.len());
    for entry in &config.collateral {
        let feed = Arc::new(
            PriceFeed::new(&entry.symbol, entry.initial_answer, clock.clone())
                .with_timeout(config.feed_timeout_secs),
        );
        feeds.insert(AssetId::new(&entry.symbol), feed.clone());
        oracles.push(feed);
    }

    let registry = AssetRegistry::new(config.assets(), oracles).context("Failed to register collateral")?;
    let debt_asset = AssetId::new(&config.debt_symbol);
    let engine = Engine::new(
        registry,
        custody,
        TokenBank::new(custody, debt_asset.clone()),
        TokenBank::new(custody, debt_asset),
    );
    info!(assets = config.collateral.len(), "Genesis engine bootstrapped");

    Ok(Bootstrapped { engine, feeds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_oracles::ManualClock;
    use keel_types::U256;

    #[test]
    fn default_genesis_bootstraps() {
        let clock = Arc::new(ManualClock::new(10));
        let boot = bootstrap(&GenesisConfig::default(), clock).unwrap();
        assert_eq!(
            boot.engine.collateral_assets(),
            &[AssetId::new("WETH"), AssetId::new("WBTC")]
        );
        assert_eq!(
            boot.engine.usd_value(&AssetId::new("WETH"), U256::from(1)).unwrap(),
            U256::from(2_000)
        );
        assert_eq!(boot.feeds.len(), 2);
    }

    #[test]
    fn parses_json_with_defaults() {
        let raw = r#"{
            "custody": "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
            "collateral": [{ "symbol": "WETH", "initial_answer": 200000000000 }]
        }"#;
        let config: GenesisConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.debt_symbol, "KUSD");
        assert_eq!(config.feed_timeout_secs, DEFAULT_FEED_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn feeds_carry_configured_timeout() {
        let config = GenesisConfig {
            feed_timeout_secs: 60,
            ..GenesisConfig::default()
        };
        let boot = bootstrap(&config, Arc::new(ManualClock::new(10))).unwrap();
        let feed = &boot.feeds[&AssetId::new("WBTC")];
        assert_eq!(feed.symbol(), "WBTC");
        assert_eq!(feed.timeout_secs(), 60);
        assert_eq!(boot.engine.custody(), [0xee; 32]);
    }

    #[test]
    fn rejects_short_custody() {
        let config = GenesisConfig {
            custody: "ee".to_string(),
            ..GenesisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_answers() {
        let mut config = GenesisConfig::default();
        config.collateral[0].initial_answer = 0;
        assert!(config.validate().is_err());
    }
}
