use crate::host::Transactional;
use crate::registry::AssetRegistry;
use crate::valuation;
use keel_types::state::short_address;
use keel_types::{Address, AssetId, EngineError, EngineResult, EngineState, Position, U256};
use tracing::debug;

/// Per-user collateral and debt balances. Bookkeeping only: no prices, no policy,
/// no external calls.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    state: EngineState,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn deposit(&mut self, user: &Address, asset: &AssetId, amount: U256) -> EngineResult<()> {
        let position = self.state.positions.entry(*user).or_default();
        let balance = position.collateral.entry(asset.clone()).or_default();
        *balance = balance.checked_add(amount).ok_or(EngineError::Overflow)?;

        let total = self.state.total_collateral.entry(asset.clone()).or_default();
        *total = total.checked_add(amount).ok_or(EngineError::Overflow)?;

        debug!(user = %short_address(user), %asset, %amount, "collateral credited");
        Ok(())
    }

    pub fn withdraw(&mut self, user: &Address, asset: &AssetId, amount: U256) -> EngineResult<()> {
        let available = self.collateral_of(user, asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| EngineError::InsufficientCollateral {
                asset: asset.clone(),
                requested: amount,
                available,
            })?;

        if let Some(position) = self.state.positions.get_mut(user) {
            if remaining.is_zero() {
                position.collateral.remove(asset);
            } else {
                position.collateral.insert(asset.clone(), remaining);
            }
        }
        if let Some(total) = self.state.total_collateral.get_mut(asset) {
            *total = total.saturating_sub(amount);
            if total.is_zero() {
                self.state.total_collateral.remove(asset);
            }
        }
        self.prune(user);

        debug!(user = %short_address(user), %asset, %amount, "collateral debited");
        Ok(())
    }

    pub fn mint_debt(&mut self, user: &Address, amount: U256) -> EngineResult<()> {
        let position = self.state.positions.entry(*user).or_default();
        position.debt_minted = position
            .debt_minted
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        self.state.total_debt_minted = self
            .state
            .total_debt_minted
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;

        debug!(user = %short_address(user), %amount, "debt credited");
        Ok(())
    }

    pub fn burn_debt(&mut self, user: &Address, amount: U256) -> EngineResult<()> {
        let available = self.debt_of(user);
        let remaining = available
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientDebt {
                requested: amount,
                available,
            })?;

        if let Some(position) = self.state.positions.get_mut(user) {
            position.debt_minted = remaining;
        }
        self.state.total_debt_minted = self.state.total_debt_minted.saturating_sub(amount);
        self.prune(user);

        debug!(user = %short_address(user), %amount, "debt debited");
        Ok(())
    }

    pub fn collateral_of(&self, user: &Address, asset: &AssetId) -> U256 {
        self.state
            .position(user)
            .map(|p| p.collateral_of(asset))
            .unwrap_or_default()
    }

    pub fn debt_of(&self, user: &Address) -> U256 {
        self.state
            .position(user)
            .map(|p| p.debt_minted)
            .unwrap_or_default()
    }

    pub fn position(&self, user: &Address) -> Position {
        self.state.position(user).cloned().unwrap_or_default()
    }

    /// USD value of everything `user` has deposited. Prices every registered
    /// asset, held or not, so any stale feed fails the call.
    pub fn total_collateral_usd(&self, registry: &AssetRegistry, user: &Address) -> EngineResult<U256> {
        let mut total = U256::ZERO;
        for asset in registry.assets() {
            let amount = self.collateral_of(user, asset);
            let value = valuation::usd_value(registry, asset, amount)?;
            total = total.checked_add(value).ok_or(EngineError::Overflow)?;
        }
        Ok(total)
    }

    fn prune(&mut self, user: &Address) {
        if self.state.positions.get(user).is_some_and(Position::is_empty) {
            self.state.positions.remove(user);
        }
    }
}

impl Transactional for Ledger {
    type Checkpoint = EngineState;

    fn checkpoint(&self) -> EngineState {
        self.state.clone()
    }

    fn rollback(&mut self, checkpoint: EngineState) {
        self.state = checkpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = [1u8; 32];

    fn weth() -> AssetId {
        AssetId::new("WETH")
    }

    #[test]
    fn deposit_and_withdraw_track_totals() {
        let mut ledger = Ledger::new();
        ledger.deposit(&ALICE, &weth(), U256::from(10)).unwrap();
        ledger.withdraw(&ALICE, &weth(), U256::from(4)).unwrap();

        assert_eq!(ledger.collateral_of(&ALICE, &weth()), U256::from(6));
        assert_eq!(ledger.state().total_collateral[&weth()], U256::from(6));
    }

    #[test]
    fn withdraw_beyond_balance_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.deposit(&ALICE, &weth(), U256::from(3)).unwrap();

        let err = ledger.withdraw(&ALICE, &weth(), U256::from(4)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientCollateral {
                asset: weth(),
                requested: U256::from(4),
                available: U256::from(3),
            }
        );
        assert_eq!(ledger.collateral_of(&ALICE, &weth()), U256::from(3));
    }

    #[test]
    fn burn_beyond_debt_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.mint_debt(&ALICE, U256::from(7)).unwrap();
        assert!(matches!(
            ledger.burn_debt(&ALICE, U256::from(8)),
            Err(EngineError::InsufficientDebt { .. })
        ));
        ledger.burn_debt(&ALICE, U256::from(7)).unwrap();
        assert_eq!(ledger.state().total_debt_minted, U256::ZERO);
    }

    #[test]
    fn unwound_position_is_pruned() {
        let mut ledger = Ledger::new();
        ledger.deposit(&ALICE, &weth(), U256::from(5)).unwrap();
        ledger.mint_debt(&ALICE, U256::from(1)).unwrap();
        ledger.burn_debt(&ALICE, U256::from(1)).unwrap();
        ledger.withdraw(&ALICE, &weth(), U256::from(5)).unwrap();

        assert_eq!(ledger.state(), &EngineState::default());
    }
}
