use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Address = [u8; 32];

/// Short hex rendering of an address for logs.
pub fn short_address(addr: &Address) -> String {
    hex::encode(&addr[..4])
}

/// Identity of a collateral token, e.g. `WETH`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

/// Collateral and debt held by one user.
///
/// Zero balances are pruned, so a fully unwound position is indistinguishable
/// from one that was never touched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub collateral: BTreeMap<AssetId, U256>,
    pub debt_minted: U256,
}

impl Position {
    pub fn collateral_of(&self, asset: &AssetId) -> U256 {
        self.collateral.get(asset).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.collateral.is_empty() && self.debt_minted.is_zero()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    pub positions: BTreeMap<Address, Position>,
    /// Sum of `debt_minted` over all positions.
    pub total_debt_minted: U256,
    /// Sum of collateral held per asset over all positions.
    pub total_collateral: BTreeMap<AssetId, U256>,
}

impl EngineState {
    pub fn position(&self, user: &Address) -> Option<&Position> {
        self.positions.get(user)
    }

    /// Digest of the whole ledger. Maps are ordered, so equal states hash equally.
    pub fn root(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        // bincode only fails on unsupported serde features or writer errors, and neither applies here.
        hasher.update(&bincode::serialize(self).expect("engine state serialization"));
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_position_reads_as_zero() {
        let position = Position::default();
        assert!(position.is_empty());
        assert_eq!(position.collateral_of(&AssetId::new("WETH")), U256::ZERO);
    }

    #[test]
    fn root_tracks_content() {
        let mut a = EngineState::default();
        let b = EngineState::default();
        assert_eq!(a.root(), b.root());

        a.positions.entry([1u8; 32]).or_default().debt_minted = U256::from(5);
        assert_ne!(a.root(), b.root());
    }
}
