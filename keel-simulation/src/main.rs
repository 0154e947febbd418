use anyhow::{Context, Result};
use clap::Parser;
use keel_execution::{Engine, TokenBank};
use keel_genesis::{bootstrap, GenesisConfig};
use keel_oracles::{ManualClock, PriceFeed};
use keel_types::constants::{MIN_HEALTH_FACTOR, PRECISION};
use keel_types::{Address, AssetId, EngineError, U256};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about = "Keel engine price-crash simulation")]
struct Args {
    /// Number of borrowers opening positions.
    #[arg(long, default_value_t = 200)]
    users: usize,
    /// Whole collateral tokens each borrower deposits.
    #[arg(long, default_value_t = 10)]
    deposit: u64,
    /// Price drop applied to every collateral asset, in percent.
    #[arg(long, default_value_t = 40)]
    crash_pct: u8,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Genesis JSON; the built-in WETH/WBTC setup when omitted.
    #[arg(long)]
    genesis: Option<PathBuf>,
    /// Write the final report as JSON here.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize, Debug, Default, PartialEq)]
struct Report {
    positions_opened: u64,
    open_failures: u64,
    unhealthy_after_crash: u64,
    liquidations: u64,
    liquidation_failures: u64,
    insufficient_collateral: u64,
    debt_outstanding: String,
    collateral_seized: String,
    elapsed_ms: u128,
}

fn user_address(i: usize) -> Address {
    let mut address = [0u8; 32];
    address[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
    address
}

fn units(n: u64) -> U256 {
    U256::from(n) * PRECISION
}

/// Each borrower picks an asset and mints between 20% and 95% of what the
/// position supports.
fn open_positions(
    engine: &mut Engine<TokenBank, TokenBank>,
    rng: &mut StdRng,
    users: &[Address],
    deposit: u64,
    report: &mut Report,
) -> Result<()> {
    let assets = engine.collateral_assets().to_vec();
    for user in users {
        let asset = &assets[rng.gen_range(0..assets.len())];
        let amount = units(deposit);
        engine.collateral_host_mut().credit(asset, user, amount);

        let value = engine.usd_value(asset, amount)?;
        let max_debt = value * engine.liquidation_threshold() / engine.liquidation_precision();
        let debt = max_debt * U256::from(rng.gen_range(20u64..=95)) / U256::from(100);

        match engine.deposit_and_mint(user, asset, amount, debt) {
            Ok(()) => report.positions_opened += 1,
            Err(e) => {
                warn!(error = %e, "position open failed");
                report.open_failures += 1;
            }
        }
    }
    Ok(())
}

fn crash_prices(feeds: &BTreeMap<AssetId, Arc<PriceFeed>>, initial: &[(AssetId, i128)], crash_pct: u8) {
    for (asset, answer) in initial {
        if let Some(feed) = feeds.get(asset) {
            let crashed = answer * i128::from(100 - crash_pct.min(99)) / 100;
            feed.update_answer(crashed);
            info!(%asset, from = %answer, to = %crashed, "price crashed");
        }
    }
}

/// Liquidator covers half of each unhealthy position's debt against the
/// position's largest collateral holding.
fn liquidate_unhealthy(
    engine: &mut Engine<TokenBank, TokenBank>,
    liquidator: &Address,
    users: &[Address],
    report: &mut Report,
) -> Result<()> {
    let mut seized_total = U256::ZERO;
    for user in users {
        let hf = engine.health_factor_of(user)?;
        if hf >= MIN_HEALTH_FACTOR {
            continue;
        }
        report.unhealthy_after_crash += 1;

        let position = engine.position(user);
        let Some((asset, _)) = position.collateral.iter().max_by_key(|(_, amount)| **amount) else {
            continue;
        };
        let cover = position.debt_minted / U256::from(2);
        if cover.is_zero() {
            continue;
        }

        match engine.liquidate(liquidator, asset, user, cover) {
            Ok(outcome) => {
                report.liquidations += 1;
                seized_total += outcome.total_paid();
            }
            Err(EngineError::InsufficientCollateral { .. }) => {
                report.insufficient_collateral += 1;
                report.liquidation_failures += 1;
            }
            Err(e) => {
                warn!(error = %e, "liquidation failed");
                report.liquidation_failures += 1;
            }
        }
    }
    report.collateral_seized = seized_total.to_string();
    Ok(())
}

/// The liquidator holds plenty of every collateral asset and borrows a float
/// of debt tokens at a conservative ratio before prices move.
fn fund_liquidator(engine: &mut Engine<TokenBank, TokenBank>, liquidator: &Address, users: usize) -> Result<()> {
    let assets = engine.collateral_assets().to_vec();
    let stake = units(1_000_000);
    for asset in &assets {
        engine.collateral_host_mut().credit(asset, liquidator, stake);
        let value = engine.usd_value(asset, stake)?;
        let float = (value / U256::from(10)).min(units(100_000) * U256::from(users.max(1) as u64));
        engine
            .deposit_and_mint(liquidator, asset, stake, float)
            .context("Failed to fund liquidator")?;
    }
    Ok(())
}

fn run_simulation(args: &Args) -> Result<Report> {
    let config = match &args.genesis {
        Some(path) => GenesisConfig::load(path)?,
        None => GenesisConfig::default(),
    };
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let mut boot = bootstrap(&config, clock)?;
    let initial: Vec<(AssetId, i128)> = config
        .collateral
        .iter()
        .map(|c| (AssetId::new(&c.symbol), c.initial_answer))
        .collect();

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut report = Report::default();

    let users: Vec<Address> = (0..args.users).map(user_address).collect();
    let liquidator = [0xaau8; 32];

    fund_liquidator(&mut boot.engine, &liquidator, args.users)?;
    open_positions(&mut boot.engine, &mut rng, &users, args.deposit, &mut report)?;
    crash_prices(&boot.feeds, &initial, args.crash_pct);
    liquidate_unhealthy(&mut boot.engine, &liquidator, &users, &mut report)?;

    report.debt_outstanding = boot.engine.state().total_debt_minted.to_string();
    report.elapsed_ms = start.elapsed().as_millis();
    Ok(report)
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = Args::parse();
    let report = run_simulation(&args)?;

    println!("=== Keel Simulation ===");
    println!("Borrowers: {}", args.users);
    println!("Positions opened: {}", report.positions_opened);
    println!("Open failures: {}", report.open_failures);
    println!("Crash: {}%", args.crash_pct);
    println!("Unhealthy after crash: {}", report.unhealthy_after_crash);
    println!("Liquidations: {}", report.liquidations);
    println!("Liquidation failures: {}", report.liquidation_failures);
    println!("  of which insufficient collateral: {}", report.insufficient_collateral);
    println!("Collateral seized (wei): {}", report.collateral_seized);
    println!("Debt outstanding (wei): {}", report.debt_outstanding);
    println!("Elapsed: {} ms", report.elapsed_ms);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(users: usize, crash_pct: u8) -> Args {
        Args {
            users,
            deposit: 10,
            crash_pct,
            seed: 1,
            genesis: None,
            report: None,
        }
    }

    #[test]
    fn no_crash_means_no_liquidations() {
        let report = run_simulation(&args(20, 0)).unwrap();
        assert_eq!(report.positions_opened, 20);
        assert_eq!(report.unhealthy_after_crash, 0);
        assert_eq!(report.liquidations, 0);
    }

    #[test]
    fn crash_leaves_unhealthy_positions() {
        let report = run_simulation(&args(50, 40)).unwrap();
        assert_eq!(report.positions_opened, 50);
        assert!(report.unhealthy_after_crash > 0);
        assert_eq!(
            report.liquidations + report.liquidation_failures,
            report.unhealthy_after_crash
        );
    }

    #[test]
    fn same_seed_same_report() {
        let mut a = run_simulation(&args(30, 30)).unwrap();
        let mut b = run_simulation(&args(30, 30)).unwrap();
        a.elapsed_ms = 0;
        b.elapsed_ms = 0;
        assert_eq!(a, b);
    }

    #[test]
    fn user_addresses_are_distinct() {
        assert_ne!(user_address(0), user_address(1));
    }
}
