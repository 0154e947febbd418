use crate::state::{Address, AssetId};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// User-facing operations of the engine. The acting user is supplied separately.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum EngineInstruction {
    DepositCollateral { asset: AssetId, amount: U256 },
    MintDebt { amount: U256 },
    RedeemCollateral { asset: AssetId, amount: U256 },
    BurnDebt { amount: U256 },
    DepositAndMint { asset: AssetId, collateral_amount: U256, debt_amount: U256 },
    RedeemAndBurn { asset: AssetId, collateral_amount: U256, debt_amount: U256 },
    Liquidate { asset: AssetId, user: Address, debt_to_cover: U256 },
}

impl EngineInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DepositCollateral { .. } => "deposit_collateral",
            Self::MintDebt { .. } => "mint_debt",
            Self::RedeemCollateral { .. } => "redeem_collateral",
            Self::BurnDebt { .. } => "burn_debt",
            Self::DepositAndMint { .. } => "deposit_and_mint",
            Self::RedeemAndBurn { .. } => "redeem_and_burn",
            Self::Liquidate { .. } => "liquidate",
        }
    }
}
