//! Capabilities the engine consumes from its host: moving collateral tokens and
//! minting/burning the debt token. Each reports failure by returning `false`.
//!
//! Hosts also implement [`Transactional`] so the engine can undo their effects
//! when a later step of the same operation fails.

use keel_types::{Address, AssetId, U256};
use std::collections::BTreeMap;

/// State that can be checkpointed before an operation and restored if it fails.
pub trait Transactional {
    type Checkpoint;

    fn checkpoint(&self) -> Self::Checkpoint;
    fn rollback(&mut self, checkpoint: Self::Checkpoint);
}

pub trait CollateralTransfer {
    /// Moves `amount` of `asset` from `owner` to `recipient`.
    fn transfer_from(&mut self, asset: &AssetId, owner: &Address, recipient: &Address, amount: U256) -> bool;
    /// Moves `amount` of `asset` out of the engine's custody.
    fn transfer(&mut self, asset: &AssetId, recipient: &Address, amount: U256) -> bool;
}

pub trait DebtToken {
    fn mint(&mut self, to: &Address, amount: U256) -> bool;
    fn transfer_from(&mut self, owner: &Address, recipient: &Address, amount: U256) -> bool;
    /// Destroys `amount` held in the engine's custody.
    fn burn(&mut self, amount: U256) -> bool;
}

/// In-memory multi-token balance book.
///
/// Serves as the collateral host (any asset) and as the debt token host (the
/// `minted` asset). `custody` is the engine's own account.
#[derive(Debug, Clone)]
pub struct TokenBank {
    custody: Address,
    minted: AssetId,
    balances: BTreeMap<AssetId, BTreeMap<Address, U256>>,
    supply: BTreeMap<AssetId, U256>,
}

impl TokenBank {
    pub fn new(custody: Address, minted: AssetId) -> Self {
        Self {
            custody,
            minted,
            balances: BTreeMap::new(),
            supply: BTreeMap::new(),
        }
    }

    /// Faucet: creates `amount` of `asset` in `owner`'s wallet.
    pub fn credit(&mut self, asset: &AssetId, owner: &Address, amount: U256) {
        let balance = self
            .balances
            .entry(asset.clone())
            .or_default()
            .entry(*owner)
            .or_default();
        *balance = balance.saturating_add(amount);
        let supply = self.supply.entry(asset.clone()).or_default();
        *supply = supply.saturating_add(amount);
    }

    pub fn balance_of(&self, asset: &AssetId, owner: &Address) -> U256 {
        self.balances
            .get(asset)
            .and_then(|book| book.get(owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply(&self, asset: &AssetId) -> U256 {
        self.supply.get(asset).copied().unwrap_or_default()
    }

    /// Balance of the minted asset.
    pub fn debt_balance_of(&self, owner: &Address) -> U256 {
        self.balance_of(&self.minted, owner)
    }

    fn move_funds(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: U256) -> bool {
        let book = self.balances.entry(asset.clone()).or_default();
        let available = book.get(from).copied().unwrap_or_default();
        let Some(remaining) = available.checked_sub(amount) else {
            return false;
        };
        book.insert(*from, remaining);
        let credited = book.entry(*to).or_default();
        *credited = credited.saturating_add(amount);
        true
    }
}

impl CollateralTransfer for TokenBank {
    fn transfer_from(&mut self, asset: &AssetId, owner: &Address, recipient: &Address, amount: U256) -> bool {
        self.move_funds(asset, owner, recipient, amount)
    }

    fn transfer(&mut self, asset: &AssetId, recipient: &Address, amount: U256) -> bool {
        let custody = self.custody;
        self.move_funds(asset, &custody, recipient, amount)
    }
}

impl DebtToken for TokenBank {
    fn mint(&mut self, to: &Address, amount: U256) -> bool {
        if amount.is_zero() {
            return false;
        }
        let minted = self.minted.clone();
        self.credit(&minted, to, amount);
        true
    }

    fn transfer_from(&mut self, owner: &Address, recipient: &Address, amount: U256) -> bool {
        let minted = self.minted.clone();
        self.move_funds(&minted, owner, recipient, amount)
    }

    fn burn(&mut self, amount: U256) -> bool {
        if amount.is_zero() {
            return false;
        }
        let (minted, custody) = (self.minted.clone(), self.custody);
        let book = self.balances.entry(minted.clone()).or_default();
        let held = book.get(&custody).copied().unwrap_or_default();
        let Some(remaining) = held.checked_sub(amount) else {
            return false;
        };
        book.insert(custody, remaining);
        let supply = self.supply.entry(minted).or_default();
        *supply = supply.saturating_sub(amount);
        true
    }
}

impl Transactional for TokenBank {
    type Checkpoint = TokenBank;

    fn checkpoint(&self) -> TokenBank {
        self.clone()
    }

    fn rollback(&mut self, checkpoint: TokenBank) {
        *self = checkpoint;
    }
}
