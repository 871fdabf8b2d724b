//! Per-user collateral and debt ledger.
//!
//! This module holds the authoritative bookkeeping of the engine:
//! - Collateral deposited per user and per asset
//! - Synthetic units minted per user (debt)
//!
//! The ledger only enforces arithmetic bounds. Business rules (approved
//! assets, positive amounts, solvency) are enforced by the engine before and
//! after each mutation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::{safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Position of one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Collateral per asset; a missing entry means zero
    pub collateral: BTreeMap<Address, u128>,
    /// Synthetic units minted and not yet burned
    pub debt_minted: u128,
}

impl Account {
    /// Collateral held for `asset`
    pub fn collateral_of(&self, asset: &Address) -> u128 {
        self.collateral.get(asset).copied().unwrap_or(0)
    }

    /// Check if the account has any debt
    pub fn has_debt(&self) -> bool {
        self.debt_minted > 0
    }

    /// Check if the account holds no collateral and no debt
    pub fn is_empty(&self) -> bool {
        self.debt_minted == 0 && self.collateral.values().all(|amount| *amount == 0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral and debt ledger for every user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDebtLedger {
    accounts: BTreeMap<Address, Account>,
}

impl CollateralDebtLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit `amount` of `asset` collateral to `user`
    pub fn increase_collateral(&mut self, user: &Address, asset: &Address, amount: u128) -> Result<()> {
        let current = self.collateral_of(user, asset);
        let updated = safe_add(current, amount).map_err(|_| Error::Overflow {
            operation: format!("collateral of {} in {}", user, asset),
        })?;

        self.accounts
            .entry(*user)
            .or_default()
            .collateral
            .insert(*asset, updated);
        Ok(())
    }

    /// Debit `amount` of `asset` collateral from `user`
    pub fn decrease_collateral(&mut self, user: &Address, asset: &Address, amount: u128) -> Result<()> {
        let current = self.collateral_of(user, asset);
        let updated = safe_sub(current, amount).map_err(|_| Error::Underflow {
            operation: format!("collateral of {} in {}: {} - {}", user, asset, current, amount),
        })?;

        if let Some(account) = self.accounts.get_mut(user) {
            if updated == 0 {
                account.collateral.remove(asset);
            } else {
                account.collateral.insert(*asset, updated);
            }
        }
        self.prune(user);
        Ok(())
    }

    /// Record `amount` of newly minted debt for `user`
    pub fn increase_debt(&mut self, user: &Address, amount: u128) -> Result<()> {
        let current = self.debt_of(user);
        let updated = safe_add(current, amount).map_err(|_| Error::Overflow {
            operation: format!("debt of {}", user),
        })?;

        self.accounts.entry(*user).or_default().debt_minted = updated;
        Ok(())
    }

    /// Remove `amount` of debt from `user`
    pub fn decrease_debt(&mut self, user: &Address, amount: u128) -> Result<()> {
        let current = self.debt_of(user);
        let updated = safe_sub(current, amount).map_err(|_| Error::Underflow {
            operation: format!("debt of {}: {} - {}", user, current, amount),
        })?;

        if let Some(account) = self.accounts.get_mut(user) {
            account.debt_minted = updated;
        }
        self.prune(user);
        Ok(())
    }

    /// Overwrite `user`'s position, removing it if empty
    pub fn replace_account(&mut self, user: &Address, account: Account) {
        if account.is_empty() {
            self.accounts.remove(user);
        } else {
            self.accounts.insert(*user, account);
        }
    }

    fn prune(&mut self, user: &Address) {
        if self.accounts.get(user).map_or(false, Account::is_empty) {
            self.accounts.remove(user);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Position of `user` (empty if the user never interacted)
    pub fn account(&self, user: &Address) -> Account {
        self.accounts.get(user).cloned().unwrap_or_default()
    }

    /// Collateral of `user` in `asset`
    pub fn collateral_of(&self, user: &Address, asset: &Address) -> u128 {
        self.accounts
            .get(user)
            .map_or(0, |account| account.collateral_of(asset))
    }

    /// Debt minted by `user`
    pub fn debt_of(&self, user: &Address) -> u128 {
        self.accounts.get(user).map_or(0, |account| account.debt_minted)
    }

    /// Sum of debt across all users
    pub fn total_debt(&self) -> u128 {
        self.accounts
            .values()
            .fold(0u128, |acc, account| acc.saturating_add(account.debt_minted))
    }

    /// Sum of `asset` collateral across all users
    pub fn total_collateral(&self, asset: &Address) -> u128 {
        self.accounts
            .values()
            .fold(0u128, |acc, account| acc.saturating_add(account.collateral_of(asset)))
    }

    /// Every user with a non-empty position
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    /// Number of users with a non-empty position
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if no user has a position
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
