//! Token collaborators.
//!
//! The engine never keeps token balances itself. It talks to two kinds of
//! token through these traits:
//! - [`TokenLedger`]: a transferable balance ledger (each collateral asset)
//! - [`SyntheticToken`]: the pegged DSC token, which the engine alone mints and burns
//!
//! [`InMemoryToken`] and [`StableToken`] are reference implementations used by
//! the scenario runner and the tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::AMOUNT_DECIMALS;

// ═══════════════════════════════════════════════════════════════════════════════
// TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// A transferable token ledger
pub trait TokenLedger: Send + Sync {
    /// Move `amount` from `from` to `to` on behalf of a third party (the engine).
    ///
    /// `Ok(false)` means the ledger declined the transfer.
    fn transfer_from(&self, from: &Address, to: &Address, amount: u128) -> Result<bool>;

    /// Move `amount` held by `from` to `to`
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<bool>;

    /// Balance held by `owner`
    fn balance_of(&self, owner: &Address) -> u128;
}

/// The synthetic unit: a token ledger that can also be minted and burned
pub trait SyntheticToken: TokenLedger {
    /// Mint `amount` to `to`. Only the token owner may call this.
    fn mint(&self, caller: &Address, to: &Address, amount: u128) -> Result<bool>;

    /// Burn `amount` held by `caller`. Only the token owner may call this.
    fn burn(&self, caller: &Address, amount: u128) -> Result<()>;

    /// Total units in circulation
    fn total_supply(&self) -> u128;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Balances {
    total_supply: u128,
    holders: BTreeMap<Address, u128>,
}

impl Balances {
    fn balance_of(&self, owner: &Address) -> u128 {
        self.holders.get(owner).copied().unwrap_or(0)
    }

    fn credit(&mut self, owner: &Address, amount: u128) -> Result<()> {
        let updated = self
            .balance_of(owner)
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "token balance".into(),
            })?;
        self.holders.insert(*owner, updated);
        Ok(())
    }

    /// Returns `false` without touching anything if `owner` holds less than `amount`
    fn debit(&mut self, owner: &Address, amount: u128) -> bool {
        let current = self.balance_of(owner);
        if current < amount {
            return false;
        }
        let updated = current - amount;
        if updated == 0 {
            self.holders.remove(owner);
        } else {
            self.holders.insert(*owner, updated);
        }
        true
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<bool> {
        if from == to {
            return Ok(self.balance_of(from) >= amount);
        }
        if !self.debit(from, amount) {
            return Ok(false);
        }
        self.credit(to, amount)?;
        Ok(true)
    }
}

/// Mutex-protected balance ledger for a collateral asset
#[derive(Debug, Default)]
pub struct InMemoryToken {
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u32,
    state: Mutex<Balances>,
}

impl InMemoryToken {
    /// Create an empty ledger
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: AMOUNT_DECIMALS,
            state: Mutex::new(Balances::default()),
        }
    }

    /// Create new supply for `to` (seeding balances in scenarios and tests)
    pub fn mint_to(&self, to: &Address, amount: u128) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| Error::Lock)?;
        let supply = state.total_supply.checked_add(amount).ok_or(Error::Overflow {
            operation: format!("{} total supply", self.symbol),
        })?;
        state.credit(to, amount)?;
        state.total_supply = supply;
        debug!(token = %self.symbol, %to, amount, "seeded balance");
        Ok(())
    }

    /// Destroy `amount` held by `from`
    fn burn_from(&self, from: &Address, amount: u128) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| Error::Lock)?;
        let available = state.balance_of(from);
        if !state.debit(from, amount) {
            return Err(Error::Token(format!(
                "{}: burn amount {} exceeds balance {}",
                self.symbol, amount, available
            )));
        }
        state.total_supply -= amount;
        Ok(())
    }

    /// Total units in existence
    pub fn supply(&self) -> u128 {
        self.state.lock().map(|s| s.total_supply).unwrap_or(0)
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.state.lock().map(|s| s.holders.len()).unwrap_or(0)
    }

    /// Verify supply invariant (total supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        match self.state.lock() {
            Ok(state) => {
                let sum = state
                    .holders
                    .values()
                    .try_fold(0u128, |acc, balance| acc.checked_add(*balance));
                sum == Some(state.total_supply)
            }
            Err(_) => false,
        }
    }
}

impl TokenLedger for InMemoryToken {
    fn transfer_from(&self, from: &Address, to: &Address, amount: u128) -> Result<bool> {
        let mut state = self.state.lock().map_err(|_| Error::Lock)?;
        state.move_balance(from, to, amount)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<bool> {
        let mut state = self.state.lock().map_err(|_| Error::Lock)?;
        state.move_balance(from, to, amount)
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.state.lock().map(|s| s.balance_of(owner)).unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STABLE TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// The pegged synthetic token. Mint and burn are restricted to its owner.
#[derive(Debug)]
pub struct StableToken {
    owner: Address,
    ledger: InMemoryToken,
}

impl StableToken {
    /// Create a token owned (mintable) by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            ledger: InMemoryToken::new("DSC"),
        }
    }

    /// The only address allowed to mint and burn
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Verify supply invariant
    pub fn verify_supply_invariant(&self) -> bool {
        self.ledger.verify_supply_invariant()
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the owner of DSC",
                caller
            )));
        }
        Ok(())
    }
}

impl TokenLedger for StableToken {
    fn transfer_from(&self, from: &Address, to: &Address, amount: u128) -> Result<bool> {
        self.ledger.transfer_from(from, to, amount)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<bool> {
        self.ledger.transfer(from, to, amount)
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.ledger.balance_of(owner)
    }
}

impl SyntheticToken for StableToken {
    fn mint(&self, caller: &Address, to: &Address, amount: u128) -> Result<bool> {
        self.ensure_owner(caller)?;
        if to.is_zero() {
            return Err(Error::Token("cannot mint to the zero address".into()));
        }
        if amount == 0 {
            return Err(Error::MustBeMoreThanZero);
        }
        self.ledger.mint_to(to, amount)?;
        Ok(true)
    }

    fn burn(&self, caller: &Address, amount: u128) -> Result<()> {
        self.ensure_owner(caller)?;
        if amount == 0 {
            return Err(Error::MustBeMoreThanZero);
        }
        self.ledger.burn_from(caller, amount)
    }

    fn total_supply(&self) -> u128 {
        self.ledger.supply()
    }
}
