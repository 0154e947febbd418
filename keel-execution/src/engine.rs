use crate::host::{CollateralTransfer, DebtToken, Transactional};
use crate::ledger::Ledger;
use crate::liquidation::{self, LiquidationOutcome};
use crate::positions::{self, ExecutionContext};
use crate::registry::AssetRegistry;
use crate::{risk, valuation};
use keel_oracles::PriceOracle;
use keel_types::constants::{
    FEED_SCALE, LIQUIDATION_BONUS, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD, MIN_HEALTH_FACTOR,
    PRECISION,
};
use keel_types::state::short_address;
use keel_types::{
    Address, AssetId, EngineEvent, EngineInstruction, EngineResult, EngineState, Position, U256,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Overcollateralized debt engine.
///
/// Each public mutating method is one unit of work: the ledger and both hosts are
/// checkpointed first and restored if any step fails, and the operation's events
/// are published only on success.
pub struct Engine<C, D> {
    registry: AssetRegistry,
    custody: Address,
    ledger: Ledger,
    collateral: C,
    debt_token: D,
    events: Vec<EngineEvent>,
}

impl<C, D> Engine<C, D>
where
    C: CollateralTransfer + Transactional,
    D: DebtToken + Transactional,
{
    pub fn new(registry: AssetRegistry, custody: Address, collateral: C, debt_token: D) -> Self {
        info!(
            assets = registry.assets().len(),
            custody = %short_address(&custody),
            "engine initialised"
        );
        Self {
            registry,
            custody,
            ledger: Ledger::new(),
            collateral,
            debt_token,
            events: Vec::new(),
        }
    }

    fn transact<T>(
        &mut self,
        op: &'static str,
        sender: &Address,
        f: impl FnOnce(&mut ExecutionContext<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let ledger_checkpoint = self.ledger.checkpoint();
        let collateral_checkpoint = self.collateral.checkpoint();
        let debt_checkpoint = self.debt_token.checkpoint();

        let mut pending = Vec::new();
        let result = {
            let mut ctx = ExecutionContext {
                ledger: &mut self.ledger,
                registry: &self.registry,
                collateral: &mut self.collateral,
                debt_token: &mut self.debt_token,
                custody: self.custody,
                events: &mut pending,
            };
            f(&mut ctx)
        };

        match result {
            Ok(value) => {
                info!(op, sender = %short_address(sender), events = pending.len(), "operation committed");
                self.events.append(&mut pending);
                Ok(value)
            }
            Err(e) => {
                self.ledger.rollback(ledger_checkpoint);
                self.collateral.rollback(collateral_checkpoint);
                self.debt_token.rollback(debt_checkpoint);
                warn!(op, sender = %short_address(sender), error = %e, "operation rolled back");
                Err(e)
            }
        }
    }

    // === Entry points ===

    pub fn deposit_collateral(&mut self, sender: &Address, asset: &AssetId, amount: U256) -> EngineResult<()> {
        self.transact("deposit_collateral", sender, |ctx| {
            positions::deposit_collateral(ctx, sender, asset, amount)
        })
    }

    pub fn mint_debt(&mut self, sender: &Address, amount: U256) -> EngineResult<()> {
        self.transact("mint_debt", sender, |ctx| positions::mint_debt(ctx, sender, amount))
    }

    pub fn redeem_collateral(&mut self, sender: &Address, asset: &AssetId, amount: U256) -> EngineResult<()> {
        self.transact("redeem_collateral", sender, |ctx| {
            positions::redeem_collateral(ctx, sender, asset, amount)
        })
    }

    pub fn burn_debt(&mut self, sender: &Address, amount: U256) -> EngineResult<()> {
        self.transact("burn_debt", sender, |ctx| positions::burn_debt(ctx, sender, amount))
    }

    pub fn deposit_and_mint(
        &mut self,
        sender: &Address,
        asset: &AssetId,
        collateral_amount: U256,
        debt_amount: U256,
    ) -> EngineResult<()> {
        self.transact("deposit_and_mint", sender, |ctx| {
            positions::deposit_and_mint(ctx, sender, asset, collateral_amount, debt_amount)
        })
    }

    pub fn redeem_and_burn(
        &mut self,
        sender: &Address,
        asset: &AssetId,
        collateral_amount: U256,
        debt_amount: U256,
    ) -> EngineResult<()> {
        self.transact("redeem_and_burn", sender, |ctx| {
            positions::redeem_and_burn(ctx, sender, asset, collateral_amount, debt_amount)
        })
    }

    /// `caller` repays `debt_to_cover` of `user`'s debt and seizes `asset` collateral.
    pub fn liquidate(
        &mut self,
        caller: &Address,
        asset: &AssetId,
        user: &Address,
        debt_to_cover: U256,
    ) -> EngineResult<LiquidationOutcome> {
        self.transact("liquidate", caller, |ctx| {
            liquidation::liquidate(ctx, caller, asset, user, debt_to_cover)
        })
    }

    /// Routes an instruction to its entry point.
    pub fn execute(&mut self, sender: &Address, instruction: &EngineInstruction) -> EngineResult<()> {
        match instruction {
            EngineInstruction::DepositCollateral { asset, amount } => {
                self.deposit_collateral(sender, asset, *amount)
            }
            EngineInstruction::MintDebt { amount } => self.mint_debt(sender, *amount),
            EngineInstruction::RedeemCollateral { asset, amount } => {
                self.redeem_collateral(sender, asset, *amount)
            }
            EngineInstruction::BurnDebt { amount } => self.burn_debt(sender, *amount),
            EngineInstruction::DepositAndMint {
                asset,
                collateral_amount,
                debt_amount,
            } => self.deposit_and_mint(sender, asset, *collateral_amount, *debt_amount),
            EngineInstruction::RedeemAndBurn {
                asset,
                collateral_amount,
                debt_amount,
            } => self.redeem_and_burn(sender, asset, *collateral_amount, *debt_amount),
            EngineInstruction::Liquidate {
                asset,
                user,
                debt_to_cover,
            } => self.liquidate(sender, asset, user, *debt_to_cover).map(|_| ()),
        }
    }

    /// Drains the events of committed operations, oldest first.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // === Queries ===

    pub fn health_factor_of(&self, user: &Address) -> EngineResult<U256> {
        risk::health_factor(&self.ledger, &self.registry, user)
    }

    /// `(debt_minted, collateral_value_usd)`
    pub fn account_info(&self, user: &Address) -> EngineResult<(U256, U256)> {
        risk::account_info(&self.ledger, &self.registry, user)
    }

    pub fn calculate_health_factor(&self, debt_minted: U256, collateral_usd: U256) -> EngineResult<U256> {
        risk::calculate_health_factor(debt_minted, collateral_usd)
    }

    pub fn collateral_balance(&self, user: &Address, asset: &AssetId) -> U256 {
        self.ledger.collateral_of(user, asset)
    }

    pub fn debt_of(&self, user: &Address) -> U256 {
        self.ledger.debt_of(user)
    }

    pub fn position(&self, user: &Address) -> Position {
        self.ledger.position(user)
    }

    pub fn total_collateral_value_usd(&self, user: &Address) -> EngineResult<U256> {
        self.ledger.total_collateral_usd(&self.registry, user)
    }

    pub fn usd_value(&self, asset: &AssetId, amount: U256) -> EngineResult<U256> {
        valuation::usd_value(&self.registry, asset, amount)
    }

    pub fn token_amount_from_usd(&self, asset: &AssetId, usd: U256) -> EngineResult<U256> {
        valuation::token_amount_from_usd(&self.registry, asset, usd)
    }

    pub fn collateral_assets(&self) -> &[AssetId] {
        self.registry.assets()
    }

    pub fn price_oracle(&self, asset: &AssetId) -> EngineResult<Arc<dyn PriceOracle>> {
        self.registry.oracle(asset).cloned()
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn state(&self) -> &EngineState {
        self.ledger.state()
    }

    pub fn state_root(&self) -> [u8; 32] {
        self.ledger.state().root()
    }

    pub fn collateral_host(&self) -> &C {
        &self.collateral
    }

    pub fn collateral_host_mut(&mut self) -> &mut C {
        &mut self.collateral
    }

    pub fn debt_host(&self) -> &D {
        &self.debt_token
    }

    pub fn debt_host_mut(&mut self) -> &mut D {
        &mut self.debt_token
    }

    // === Constants ===

    pub fn precision(&self) -> U256 {
        PRECISION
    }

    pub fn feed_scale(&self) -> U256 {
        FEED_SCALE
    }

    pub fn liquidation_threshold(&self) -> U256 {
        LIQUIDATION_THRESHOLD
    }

    pub fn liquidation_precision(&self) -> U256 {
        LIQUIDATION_PRECISION
    }

    pub fn liquidation_bonus(&self) -> U256 {
        LIQUIDATION_BONUS
    }

    pub fn min_health_factor(&self) -> U256 {
        MIN_HEALTH_FACTOR
    }
}
