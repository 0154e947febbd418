//! Position manager: deposit, mint, redeem and burn as ordered steps over the
//! ledger and the host capabilities.
//!
//! Every step mutates the ledger before calling out to the host, so a host that
//! calls back into the engine only ever observes the post-mutation balances.

use crate::host::{CollateralTransfer, DebtToken};
use crate::ledger::Ledger;
use crate::registry::AssetRegistry;
use crate::risk;
use keel_types::state::short_address;
use keel_types::{Address, AssetId, EngineError, EngineEvent, EngineResult, U256};
use tracing::debug;

/// Everything one operation may touch. Built by [`crate::Engine`] per unit of work.
pub struct ExecutionContext<'a> {
    pub ledger: &'a mut Ledger,
    pub registry: &'a AssetRegistry,
    pub collateral: &'a mut dyn CollateralTransfer,
    pub debt_token: &'a mut dyn DebtToken,
    pub custody: Address,
    pub events: &'a mut Vec<EngineEvent>,
}

impl ExecutionContext<'_> {
    pub fn health_factor(&self, user: &Address) -> EngineResult<U256> {
        risk::health_factor(&*self.ledger, self.registry, user)
    }

    pub fn assert_solvent(&self, user: &Address) -> EngineResult<()> {
        risk::assert_solvent(&*self.ledger, self.registry, user)
    }
}

pub fn require_nonzero(amount: U256) -> EngineResult<()> {
    if amount.is_zero() {
        return Err(EngineError::ZeroAmount);
    }
    Ok(())
}

pub fn deposit_collateral(
    ctx: &mut ExecutionContext<'_>,
    user: &Address,
    asset: &AssetId,
    amount: U256,
) -> EngineResult<()> {
    require_nonzero(amount)?;
    ctx.registry.ensure_registered(asset)?;

    ctx.ledger.deposit(user, asset, amount)?;
    ctx.events.push(EngineEvent::CollateralDeposited {
        user: *user,
        asset: asset.clone(),
        amount,
    });

    let custody = ctx.custody;
    if !ctx.collateral.transfer_from(asset, user, &custody, amount) {
        return Err(EngineError::TransferFailed);
    }
    Ok(())
}

/// Fails with `HealthFactorBroken` before anything is minted.
pub fn mint_debt(ctx: &mut ExecutionContext<'_>, user: &Address, amount: U256) -> EngineResult<()> {
    require_nonzero(amount)?;

    ctx.ledger.mint_debt(user, amount)?;
    ctx.assert_solvent(user)?;

    if !ctx.debt_token.mint(user, amount) {
        return Err(EngineError::MintFailed);
    }
    ctx.events.push(EngineEvent::DebtMinted {
        user: *user,
        amount,
    });
    Ok(())
}

/// Moves collateral from `from`'s position to `to`'s wallet. No solvency check:
/// callers decide when the position must be healthy again.
pub fn redeem(
    ctx: &mut ExecutionContext<'_>,
    asset: &AssetId,
    amount: U256,
    from: &Address,
    to: &Address,
) -> EngineResult<()> {
    ctx.ledger.withdraw(from, asset, amount)?;
    ctx.events.push(EngineEvent::CollateralRedeemed {
        from: *from,
        to: *to,
        asset: asset.clone(),
        amount,
    });

    if !ctx.collateral.transfer(asset, to, amount) {
        return Err(EngineError::TransferFailed);
    }
    debug!(from = %short_address(from), to = %short_address(to), %asset, %amount, "collateral released");
    Ok(())
}

/// Clears `amount` of `on_behalf_of`'s debt using debt tokens pulled from `payer`.
pub fn burn(
    ctx: &mut ExecutionContext<'_>,
    amount: U256,
    on_behalf_of: &Address,
    payer: &Address,
) -> EngineResult<()> {
    ctx.ledger.burn_debt(on_behalf_of, amount)?;

    let custody = ctx.custody;
    if !ctx.debt_token.transfer_from(payer, &custody, amount) {
        return Err(EngineError::TransferFailed);
    }
    if !ctx.debt_token.burn(amount) {
        return Err(EngineError::BurnFailed);
    }
    ctx.events.push(EngineEvent::DebtBurned {
        on_behalf_of: *on_behalf_of,
        payer: *payer,
        amount,
    });
    Ok(())
}

pub fn redeem_collateral(
    ctx: &mut ExecutionContext<'_>,
    user: &Address,
    asset: &AssetId,
    amount: U256,
) -> EngineResult<()> {
    require_nonzero(amount)?;
    ctx.registry.ensure_registered(asset)?;

    redeem(ctx, asset, amount, user, user)?;
    ctx.assert_solvent(user)
}

/// Burning can only raise the health factor, so no solvency check follows.
pub fn burn_debt(ctx: &mut ExecutionContext<'_>, user: &Address, amount: U256) -> EngineResult<()> {
    require_nonzero(amount)?;
    burn(ctx, amount, user, user)
}

pub fn deposit_and_mint(
    ctx: &mut ExecutionContext<'_>,
    user: &Address,
    asset: &AssetId,
    collateral_amount: U256,
    debt_amount: U256,
) -> EngineResult<()> {
    deposit_collateral(ctx, user, asset, collateral_amount)?;
    mint_debt(ctx, user, debt_amount)
}

/// Burns first so the trailing solvency check sees the net effect.
pub fn redeem_and_burn(
    ctx: &mut ExecutionContext<'_>,
    user: &Address,
    asset: &AssetId,
    collateral_amount: U256,
    debt_amount: U256,
) -> EngineResult<()> {
    require_nonzero(collateral_amount)?;
    require_nonzero(debt_amount)?;
    ctx.registry.ensure_registered(asset)?;

    burn(ctx, debt_amount, user, user)?;
    redeem(ctx, asset, collateral_amount, user, user)?;
    ctx.assert_solvent(user)
}
