//! Health factor derivation and solvency checks.

use crate::ledger::Ledger;
use crate::registry::AssetRegistry;
use keel_types::constants::{
    LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD, MAX_HEALTH_FACTOR, MIN_HEALTH_FACTOR, PRECISION,
};
use keel_types::state::short_address;
use keel_types::{Address, EngineError, EngineResult, U256};
use tracing::debug;

/// `(collateral_usd * THRESHOLD / LIQUIDATION_PRECISION) * PRECISION / debt`,
/// or [`MAX_HEALTH_FACTOR`] without debt.
///
/// Independent of any ledger, so it can be used for what-if simulation.
pub fn calculate_health_factor(debt_minted: U256, collateral_usd: U256) -> EngineResult<U256> {
    if debt_minted.is_zero() {
        return Ok(MAX_HEALTH_FACTOR);
    }
    let adjusted = collateral_usd
        .checked_mul(LIQUIDATION_THRESHOLD)
        .ok_or(EngineError::Overflow)?
        / LIQUIDATION_PRECISION;
    let scaled = adjusted.checked_mul(PRECISION).ok_or(EngineError::Overflow)?;
    Ok(scaled / debt_minted)
}

/// `(debt_minted, collateral_usd)` for `user`.
pub fn account_info(
    ledger: &Ledger,
    registry: &AssetRegistry,
    user: &Address,
) -> EngineResult<(U256, U256)> {
    let debt = ledger.debt_of(user);
    let collateral_usd = ledger.total_collateral_usd(registry, user)?;
    Ok((debt, collateral_usd))
}

/// Debt-free users are reported as [`MAX_HEALTH_FACTOR`] without touching the oracles.
pub fn health_factor(ledger: &Ledger, registry: &AssetRegistry, user: &Address) -> EngineResult<U256> {
    let debt = ledger.debt_of(user);
    if debt.is_zero() {
        return Ok(MAX_HEALTH_FACTOR);
    }
    let collateral_usd = ledger.total_collateral_usd(registry, user)?;
    let hf = calculate_health_factor(debt, collateral_usd)?;
    debug!(user = %short_address(user), %debt, %collateral_usd, health_factor = %hf, "health factor");
    Ok(hf)
}

pub fn is_healthy(health_factor: U256) -> bool {
    health_factor >= MIN_HEALTH_FACTOR
}

pub fn assert_solvent(ledger: &Ledger, registry: &AssetRegistry, user: &Address) -> EngineResult<()> {
    let hf = health_factor(ledger, registry, user)?;
    if !is_healthy(hf) {
        return Err(EngineError::HealthFactorBroken(hf));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u64) -> U256 {
        U256::from(n) * PRECISION
    }

    #[test]
    fn no_debt_is_max() {
        assert_eq!(
            calculate_health_factor(U256::ZERO, units(1)).unwrap(),
            MAX_HEALTH_FACTOR
        );
    }

    #[test]
    fn half_of_collateral_counts() {
        // $20k of collateral backs at most $10k of debt.
        assert_eq!(
            calculate_health_factor(units(10_000), units(20_000)).unwrap(),
            MIN_HEALTH_FACTOR
        );
        assert_eq!(
            calculate_health_factor(units(5_000), units(20_000)).unwrap(),
            units(2)
        );
        assert!(!is_healthy(
            calculate_health_factor(units(10_000) + U256::from(1), units(20_000)).unwrap()
        ));
    }
}
