use keel_execution::{AssetRegistry, Engine, TokenBank};
use keel_oracles::{ManualClock, PriceFeed, PriceOracle};
use keel_types::constants::{FEED_SCALE, MIN_HEALTH_FACTOR, PRECISION};
use keel_types::{Address, AssetId, EngineInstruction, U256};
use proptest::prelude::*;
use std::sync::Arc;

const ENGINE: Address = [0xee; 32];
const USERS: [Address; 3] = [[1u8; 32], [2u8; 32], [3u8; 32]];

fn weth() -> AssetId {
    AssetId::new("WETH")
}

fn wbtc() -> AssetId {
    AssetId::new("WBTC")
}

struct World {
    engine: Engine<TokenBank, TokenBank>,
    eth_feed: Arc<PriceFeed>,
    btc_feed: Arc<PriceFeed>,
}

fn world(eth: i128, btc: i128) -> World {
    let clock: Arc<ManualClock> = Arc::new(ManualClock::new(1_700_000_000));
    let eth_feed = Arc::new(PriceFeed::new("WETH", eth, clock.clone()));
    let btc_feed = Arc::new(PriceFeed::new("WBTC", btc, clock));
    let oracles: Vec<Arc<dyn PriceOracle>> = vec![eth_feed.clone(), btc_feed.clone()];
    let registry = AssetRegistry::new(vec![weth(), wbtc()], oracles).unwrap();

    let mut collateral = TokenBank::new(ENGINE, AssetId::new("KUSD"));
    for user in USERS {
        collateral.credit(&weth(), &user, U256::from(1_000u64) * PRECISION);
        collateral.credit(&wbtc(), &user, U256::from(1_000u64) * PRECISION);
    }
    World {
        engine: Engine::new(
            registry,
            ENGINE,
            collateral,
            TokenBank::new(ENGINE, AssetId::new("KUSD")),
        ),
        eth_feed,
        btc_feed,
    }
}

fn amount() -> impl Strategy<Value = U256> {
    // up to 50 whole tokens with 18 decimals, occasionally zero
    (0u64..=50_000u64).prop_map(|milli| U256::from(milli) * U256::from(1_000_000_000_000_000u64))
}

fn asset() -> impl Strategy<Value = AssetId> {
    prop_oneof![Just(weth()), Just(wbtc())]
}

fn user() -> impl Strategy<Value = usize> {
    0..USERS.len()
}

fn instruction() -> impl Strategy<Value = (usize, EngineInstruction)> {
    prop_oneof![
        (user(), asset(), amount())
            .prop_map(|(u, asset, amount)| (u, EngineInstruction::DepositCollateral { asset, amount })),
        (user(), amount()).prop_map(|(u, amount)| (u, EngineInstruction::MintDebt {
            amount: amount * U256::from(1_000)
        })),
        (user(), asset(), amount())
            .prop_map(|(u, asset, amount)| (u, EngineInstruction::RedeemCollateral { asset, amount })),
        (user(), amount()).prop_map(|(u, amount)| (u, EngineInstruction::BurnDebt {
            amount: amount * U256::from(100)
        })),
        (user(), asset(), amount(), amount()).prop_map(|(u, asset, c, d)| (
            u,
            EngineInstruction::DepositAndMint {
                asset,
                collateral_amount: c,
                debt_amount: d * U256::from(1_000),
            }
        )),
        (user(), asset(), amount(), amount()).prop_map(|(u, asset, c, d)| (
            u,
            EngineInstruction::RedeemAndBurn {
                asset,
                collateral_amount: c,
                debt_amount: d * U256::from(100),
            }
        )),
    ]
}

fn protocol_value(world: &World) -> U256 {
    let mut total = U256::ZERO;
    for (asset, held) in &world.engine.state().total_collateral {
        total += world.engine.usd_value(asset, *held).unwrap();
    }
    total
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn successful_operations_keep_every_user_solvent(
        ops in proptest::collection::vec(instruction(), 1..40),
    ) {
        let mut world = world(2_000_00000000, 1_000_00000000);
        for (u, op) in &ops {
            let before = world.engine.state_root();
            match world.engine.execute(&USERS[*u], op) {
                Ok(()) => {}
                Err(_) => prop_assert_eq!(world.engine.state_root(), before),
            }
            for user in &USERS {
                let hf = world.engine.health_factor_of(user).unwrap();
                prop_assert!(hf >= MIN_HEALTH_FACTOR || world.engine.debt_of(user).is_zero());
            }
        }

        // With prices unchanged the protocol holds at least twice its debt in value.
        let debt = world.engine.state().total_debt_minted;
        prop_assert!(protocol_value(&world) >= debt * U256::from(2));
        prop_assert_eq!(
            world.engine.debt_host().total_supply(&AssetId::new("KUSD")),
            debt
        );
    }

    #[test]
    fn round_trip_loses_at_most_one_unit(
        price in 1_00000000i128..=1_000_000_00000000i128,
        raw in 0u128..=u128::MAX / 2,
    ) {
        let world = world(price, 1_000_00000000);
        let amount = U256::from(raw);
        let usd = world.engine.usd_value(&weth(), amount).unwrap();
        let back = world.engine.token_amount_from_usd(&weth(), usd).unwrap();
        prop_assert!(back <= amount);
        prop_assert!(amount - back <= U256::from(1));
    }

    #[test]
    fn liquidation_requires_an_unhealthy_target_and_improves_it(
        crash_price in 100_00000000i128..2_000_00000000i128,
        cover in 1u64..5_000u64,
    ) {
        let mut world = world(2_000_00000000, 1_000_00000000);
        let (user, liquidator) = (USERS[0], USERS[1]);
        let units = |n: u64| U256::from(n) * PRECISION;

        world.engine.deposit_and_mint(&user, &weth(), units(10), units(5_000)).unwrap();
        world.engine.deposit_and_mint(&liquidator, &wbtc(), units(500), units(5_000)).unwrap();
        world.eth_feed.update_answer(crash_price);
        world.btc_feed.update_answer(1_000_00000000);

        let start = world.engine.health_factor_of(&user).unwrap();
        match world.engine.liquidate(&liquidator, &weth(), &user, units(cover)) {
            Ok(outcome) => {
                prop_assert!(start < MIN_HEALTH_FACTOR);
                prop_assert!(outcome.end_health_factor > start);
                prop_assert_eq!(world.engine.health_factor_of(&user).unwrap(), outcome.end_health_factor);
                prop_assert!(world.engine.health_factor_of(&liquidator).unwrap() >= MIN_HEALTH_FACTOR);
                let price = U256::from(crash_price as u128) * FEED_SCALE;
                prop_assert_eq!(outcome.collateral_seized, units(cover) * PRECISION / price);
            }
            Err(e) => {
                if start >= MIN_HEALTH_FACTOR {
                    prop_assert_eq!(e, keel_types::EngineError::HealthFactorOk(start));
                }
                prop_assert_eq!(world.engine.debt_of(&user), units(5_000));
            }
        }
    }
}
