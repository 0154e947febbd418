#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use keel_execution::{AssetRegistry, Engine, TokenBank};
use keel_oracles::{ManualClock, PriceFeed, PriceOracle};
use keel_types::constants::{MIN_HEALTH_FACTOR, PRECISION};
use keel_types::{AssetId, EngineInstruction, U256};

#[derive(Arbitrary, Debug)]
struct Step {
    user: u8,
    kind: u8,
    use_wbtc: bool,
    amount: u64,
    debt: u64,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    eth_answer: u32,
    steps: Vec<Step>,
}

fn amount(raw: u64) -> U256 {
    // milli-tokens keep amounts within plausible balances
    U256::from(raw % 100_000) * PRECISION / U256::from(1_000)
}

fuzz_target!(|data: FuzzInput| {
    let clock = Arc::new(ManualClock::new(1_000));
    let eth = Arc::new(PriceFeed::new("WETH", i128::from(data.eth_answer) + 1, clock.clone()));
    let btc = Arc::new(PriceFeed::new("WBTC", 1_000_00000000, clock));
    let oracles: Vec<Arc<dyn PriceOracle>> = vec![eth, btc];
    let (weth, wbtc) = (AssetId::new("WETH"), AssetId::new("WBTC"));
    let Ok(registry) = AssetRegistry::new(vec![weth.clone(), wbtc.clone()], oracles) else {
        return;
    };

    let custody = [0xee; 32];
    let users: [[u8; 32]; 4] = [[1; 32], [2; 32], [3; 32], [4; 32]];
    let mut collateral = TokenBank::new(custody, AssetId::new("KUSD"));
    for user in &users {
        collateral.credit(&weth, user, U256::from(200u64) * PRECISION);
        collateral.credit(&wbtc, user, U256::from(200u64) * PRECISION);
    }
    let mut engine = Engine::new(registry, custody, collateral, TokenBank::new(custody, AssetId::new("KUSD")));

    for step in data.steps.iter().take(64) {
        let sender = users[usize::from(step.user) % users.len()];
        let asset = if step.use_wbtc { wbtc.clone() } else { weth.clone() };
        let instruction = match step.kind % 6 {
            0 => EngineInstruction::DepositCollateral { asset, amount: amount(step.amount) },
            1 => EngineInstruction::MintDebt { amount: amount(step.debt) * U256::from(100) },
            2 => EngineInstruction::RedeemCollateral { asset, amount: amount(step.amount) },
            3 => EngineInstruction::BurnDebt { amount: amount(step.debt) * U256::from(100) },
            4 => EngineInstruction::DepositAndMint {
                asset,
                collateral_amount: amount(step.amount),
                debt_amount: amount(step.debt) * U256::from(100),
            },
            _ => EngineInstruction::RedeemAndBurn {
                asset,
                collateral_amount: amount(step.amount),
                debt_amount: amount(step.debt) * U256::from(100),
            },
        };

        let before = engine.state_root();
        if engine.execute(&sender, &instruction).is_err() {
            assert_eq!(engine.state_root(), before, "failed {} left state behind", instruction.name());
            continue;
        }
        // Prices never move here, so a committed operation cannot leave anyone insolvent.
        for user in &users {
            if let Ok(hf) = engine.health_factor_of(user) {
                assert!(hf >= MIN_HEALTH_FACTOR);
            }
        }
    }

    assert_eq!(
        engine.debt_host().total_supply(&AssetId::new("KUSD")),
        engine.state().total_debt_minted
    );
});
