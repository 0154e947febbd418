#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use keel_execution::{AssetRegistry, Engine, TokenBank};
use keel_oracles::{ManualClock, PriceFeed, PriceOracle};
use keel_types::constants::PRECISION;
use keel_types::{AssetId, EngineError, U256};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    collateral: u16,
    debt_bps: u16,
    crash_answer: u32,
    cover_bps: u16,
}

fuzz_target!(|data: FuzzInput| {
    let clock = Arc::new(ManualClock::new(1_000));
    let eth = Arc::new(PriceFeed::new("WETH", 2_000_00000000, clock));
    let oracles: Vec<Arc<dyn PriceOracle>> = vec![eth.clone()];
    let weth = AssetId::new("WETH");
    let Ok(registry) = AssetRegistry::new(vec![weth.clone()], oracles) else {
        return;
    };

    let (custody, user, liquidator) = ([0xee; 32], [1; 32], [2; 32]);
    let mut collateral = TokenBank::new(custody, AssetId::new("KUSD"));
    collateral.credit(&weth, &user, U256::from(100_000u64) * PRECISION);
    collateral.credit(&weth, &liquidator, U256::from(1_000_000u64) * PRECISION);
    let mut engine = Engine::new(registry, custody, collateral, TokenBank::new(custody, AssetId::new("KUSD")));

    let deposit = U256::from(u64::from(data.collateral) + 1) * PRECISION;
    // up to the full 50% threshold of $2000 per token
    let debt = deposit * U256::from(1_000u64) * U256::from(u64::from(data.debt_bps % 10_001)) / U256::from(10_000u64);
    if engine.deposit_and_mint(&user, &weth, deposit, debt).is_err() {
        return;
    }
    let float = U256::from(1_000_000u64) * PRECISION;
    if engine.deposit_and_mint(&liquidator, &weth, float, U256::from(50_000_000u64) * PRECISION).is_err() {
        return;
    }

    eth.update_answer(i128::from(data.crash_answer % 2_000_00000000) + 1);
    let Ok(start) = engine.health_factor_of(&user) else {
        return;
    };
    let cover = engine.debt_of(&user) * U256::from(u64::from(data.cover_bps % 10_001)) / U256::from(10_000u64);
    let before = engine.state_root();

    match engine.liquidate(&liquidator, &weth, &user, cover) {
        Ok(outcome) => {
            assert!(outcome.end_health_factor > start);
            assert_eq!(outcome.start_health_factor, start);
        }
        Err(EngineError::HealthFactorOk(hf)) => {
            assert_eq!(hf, start);
            assert_eq!(engine.state_root(), before);
        }
        Err(_) => assert_eq!(engine.state_root(), before),
    }
});
