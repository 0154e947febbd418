use crate::state::AssetId;
use alloy_primitives::U256;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse classification of [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    State,
    Oracle,
    Solvency,
    Liquidation,
    ExternalCall,
    Arithmetic,
}

/// Every variant aborts the enclosing operation and rolls it back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("asset {0} is not registered as collateral")]
    UnknownAsset(AssetId),
    #[error("{assets} collateral assets but {oracles} price oracles")]
    LengthMismatch { assets: usize, oracles: usize },

    #[error("insufficient {asset} collateral: requested {requested}, available {available}")]
    InsufficientCollateral {
        asset: AssetId,
        requested: U256,
        available: U256,
    },
    #[error("insufficient debt: requested {requested}, outstanding {available}")]
    InsufficientDebt { requested: U256, available: U256 },

    #[error("price feed for {0} is stale")]
    StalePrice(AssetId),
    #[error("price feed for {asset} answered {answer}")]
    InvalidPrice { asset: AssetId, answer: i128 },

    #[error("health factor {0} is below the minimum")]
    HealthFactorBroken(U256),

    #[error("health factor {0} is not below the minimum, position cannot be liquidated")]
    HealthFactorOk(U256),
    #[error("liquidation did not improve health factor ({start} -> {end})")]
    HealthFactorNotImproved { start: U256, end: U256 },

    #[error("collateral transfer failed")]
    TransferFailed,
    #[error("debt token mint failed")]
    MintFailed,
    #[error("debt token burn failed")]
    BurnFailed,

    #[error("arithmetic overflow")]
    Overflow,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount | Self::UnknownAsset(_) | Self::LengthMismatch { .. } => {
                ErrorKind::Input
            }
            Self::InsufficientCollateral { .. } | Self::InsufficientDebt { .. } => ErrorKind::State,
            Self::StalePrice(_) | Self::InvalidPrice { .. } => ErrorKind::Oracle,
            Self::HealthFactorBroken(_) => ErrorKind::Solvency,
            Self::HealthFactorOk(_) | Self::HealthFactorNotImproved { .. } => {
                ErrorKind::Liquidation
            }
            Self::TransferFailed | Self::MintFailed | Self::BurnFailed => ErrorKind::ExternalCall,
            Self::Overflow => ErrorKind::Arithmetic,
        }
    }
}
