//! Third-party liquidation of unhealthy positions.
//!
//! The liquidator repays `debt_to_cover` of the user's debt with their own debt
//! tokens and receives the equivalent collateral plus [`LIQUIDATION_BONUS`].
//! Only a single collateral asset is seized per call. When the user does not
//! hold enough of it (typically once collateral is worth less than ~110% of the
//! covered debt) the call fails with `InsufficientCollateral`.

use crate::positions::{self, ExecutionContext};
use crate::risk;
use crate::valuation;
use keel_types::constants::{LIQUIDATION_BONUS, LIQUIDATION_PRECISION};
use keel_types::state::short_address;
use keel_types::{Address, AssetId, EngineError, EngineEvent, EngineResult, U256};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub debt_covered: U256,
    pub collateral_seized: U256,
    pub bonus: U256,
    pub start_health_factor: U256,
    pub end_health_factor: U256,
}

impl LiquidationOutcome {
    /// Collateral handed to the liquidator.
    pub fn total_paid(&self) -> U256 {
        self.collateral_seized.saturating_add(self.bonus)
    }
}

/// `(seized, bonus)` for covering `debt_to_cover` USD with `asset`.
pub fn seizure_for(
    ctx: &ExecutionContext<'_>,
    asset: &AssetId,
    debt_to_cover: U256,
) -> EngineResult<(U256, U256)> {
    let seized = valuation::token_amount_from_usd(ctx.registry, asset, debt_to_cover)?;
    let bonus = seized
        .checked_mul(LIQUIDATION_BONUS)
        .ok_or(EngineError::Overflow)?
        / LIQUIDATION_PRECISION;
    Ok((seized, bonus))
}

pub fn liquidate(
    ctx: &mut ExecutionContext<'_>,
    caller: &Address,
    asset: &AssetId,
    user: &Address,
    debt_to_cover: U256,
) -> EngineResult<LiquidationOutcome> {
    positions::require_nonzero(debt_to_cover)?;
    ctx.registry.ensure_registered(asset)?;

    let start_hf = ctx.health_factor(user)?;
    if risk::is_healthy(start_hf) {
        return Err(EngineError::HealthFactorOk(start_hf));
    }

    let (seized, bonus) = seizure_for(ctx, asset, debt_to_cover)?;
    let total = seized.checked_add(bonus).ok_or(EngineError::Overflow)?;

    positions::redeem(ctx, asset, total, user, caller)?;
    positions::burn(ctx, debt_to_cover, user, caller)?;

    let end_hf = ctx.health_factor(user)?;
    if end_hf <= start_hf {
        warn!(user = %short_address(user), start = %start_hf, end = %end_hf, "liquidation did not improve position");
        return Err(EngineError::HealthFactorNotImproved {
            start: start_hf,
            end: end_hf,
        });
    }
    ctx.assert_solvent(caller)?;

    ctx.events.push(EngineEvent::Liquidated {
        liquidator: *caller,
        user: *user,
        asset: asset.clone(),
        debt_covered: debt_to_cover,
        collateral_seized: seized,
        bonus,
    });
    info!(
        liquidator = %short_address(caller),
        user = %short_address(user),
        %asset,
        debt_covered = %debt_to_cover,
        seized = %total,
        "position liquidated"
    );

    Ok(LiquidationOutcome {
        debt_covered: debt_to_cover,
        collateral_seized: seized,
        bonus,
        start_health_factor: start_hf,
        end_health_factor: end_hf,
    })
}
