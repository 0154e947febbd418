use crate::state::{Address, AssetId};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Published only when the enclosing operation commits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    CollateralDeposited {
        user: Address,
        asset: AssetId,
        amount: U256,
    },
    CollateralRedeemed {
        from: Address,
        to: Address,
        asset: AssetId,
        amount: U256,
    },
    DebtMinted {
        user: Address,
        amount: U256,
    },
    DebtBurned {
        on_behalf_of: Address,
        payer: Address,
        amount: U256,
    },
    Liquidated {
        liquidator: Address,
        user: Address,
        asset: AssetId,
        debt_covered: U256,
        collateral_seized: U256,
        bonus: U256,
    },
}
