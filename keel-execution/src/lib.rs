//! Collateral/debt accounting and liquidation for the Keel engine.
//!
//! Layers, leaf first: [`valuation`] prices collateral through the registered
//! oracles, [`ledger`] holds balances, [`risk`] derives health factors,
//! [`positions`] and [`liquidation`] orchestrate ledger mutations with the host
//! capabilities in [`host`], and [`engine::Engine`] wraps every entry point in an
//! all-or-nothing unit of work.

pub mod engine;
pub mod host;
pub mod ledger;
pub mod liquidation;
pub mod positions;
pub mod registry;
pub mod risk;
pub mod valuation;

pub use engine::Engine;
pub use host::{CollateralTransfer, DebtToken, TokenBank, Transactional};
pub use ledger::Ledger;
pub use liquidation::LiquidationOutcome;
pub use positions::ExecutionContext;
pub use registry::AssetRegistry;
