use keel_oracles::PriceOracle;
use keel_types::{AssetId, EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Collateral assets and their price oracles, fixed at construction.
#[derive(Clone)]
pub struct AssetRegistry {
    assets: Vec<AssetId>,
    oracles: HashMap<AssetId, Arc<dyn PriceOracle>>,
}

impl AssetRegistry {
    /// Pairs `assets[i]` with `oracles[i]`.
    ///
    /// Only the lengths are validated. Registering an asset twice lists it twice
    /// (its collateral is then counted twice) and keeps the last oracle.
    pub fn new(assets: Vec<AssetId>, oracles: Vec<Arc<dyn PriceOracle>>) -> EngineResult<Self> {
        if assets.len() != oracles.len() {
            return Err(EngineError::LengthMismatch {
                assets: assets.len(),
                oracles: oracles.len(),
            });
        }
        let oracles = assets.iter().cloned().zip(oracles).collect();
        Ok(Self { assets, oracles })
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.oracles.contains_key(asset)
    }

    pub fn oracle(&self, asset: &AssetId) -> EngineResult<&Arc<dyn PriceOracle>> {
        self.oracles
            .get(asset)
            .ok_or_else(|| EngineError::UnknownAsset(asset.clone()))
    }

    pub fn ensure_registered(&self, asset: &AssetId) -> EngineResult<()> {
        if self.contains(asset) {
            Ok(())
        } else {
            Err(EngineError::UnknownAsset(asset.clone()))
        }
    }
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}
