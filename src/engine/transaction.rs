//! All-or-nothing execution of engine operations.
//!
//! Each mutating entry point runs inside [`DscEngine::transact`]:
//! - the reentrancy guard is taken, waiting for any other thread's operation
//! - accounts the operation touches are staged in a [`Journal`]
//! - completed token interactions and pending events are recorded alongside
//!
//! On success the staged accounts replace the committed ones and the events
//! are published. On failure the staged accounts are dropped and the recorded
//! interactions are undone in reverse order. Queries only ever see committed
//! accounts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tracing::{debug, error, info, warn};

use crate::core::ledger::{Account, CollateralDebtLedger};
use crate::engine::DscEngine;
use crate::error::{Error, Result};
use crate::protocol::events::EngineEvent;
use crate::utils::address::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// INTERACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// A completed call into a token collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interaction {
    /// Collateral moved from `from` into engine custody
    CollateralPulled {
        /// Collateral asset
        asset: Address,
        /// Previous holder
        from: Address,
        /// Amount moved
        amount: u128,
    },
    /// Collateral moved from engine custody to `to`
    CollateralPushed {
        /// Collateral asset
        asset: Address,
        /// Recipient
        to: Address,
        /// Amount moved
        amount: u128,
    },
    /// DSC minted to `to`
    DscMinted {
        /// Recipient
        to: Address,
        /// Amount minted
        amount: u128,
    },
    /// DSC moved from `from` into the engine
    DscPulled {
        /// Previous holder
        from: Address,
        /// Amount moved
        amount: u128,
    },
    /// DSC held by the engine was burned
    DscBurned {
        /// Amount burned
        amount: u128,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// JOURNAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Staged accounts and undo information for one in-flight operation
#[derive(Debug)]
pub struct Journal {
    operation: &'static str,
    staged: CollateralDebtLedger,
    touched: BTreeSet<Address>,
    interactions: Vec<Interaction>,
    events: Vec<EngineEvent>,
}

impl Journal {
    /// Start an empty journal for `operation`
    pub fn begin(operation: &'static str) -> Self {
        Self {
            operation,
            staged: CollateralDebtLedger::new(),
            touched: BTreeSet::new(),
            interactions: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Record a completed collaborator call
    pub fn record(&mut self, interaction: Interaction) {
        debug!(operation = self.operation, ?interaction, "interaction completed");
        self.interactions.push(interaction);
    }

    /// Queue an event for publication on commit
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Operation name
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Interactions completed so far
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Events queued so far
    pub fn pending_events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Users whose accounts have been staged
    pub fn touched(&self) -> impl Iterator<Item = &Address> {
        self.touched.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION
// ═══════════════════════════════════════════════════════════════════════════════

impl DscEngine {
    /// Run `body` as one guarded, all-or-nothing operation
    pub(crate) fn transact<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut Journal) -> Result<T>,
    ) -> Result<T> {
        let _token = self.guard().enter()?;
        let mut journal = Journal::begin(operation);

        match body(&mut journal) {
            Ok(value) => {
                self.commit(journal)?;
                Ok(value)
            }
            Err(cause) => Err(self.rollback(journal, cause)),
        }
    }

    /// Staged ledger with `user`'s committed account loaded on first touch
    pub(crate) fn stage<'j>(
        &self,
        journal: &'j mut Journal,
        user: &Address,
    ) -> Result<&'j mut CollateralDebtLedger> {
        if !journal.touched.contains(user) {
            let account = self.read_ledger()?.account(user);
            journal.staged.replace_account(user, account);
            journal.touched.insert(*user);
        }
        Ok(&mut journal.staged)
    }

    /// Account of `user` as the in-flight operation sees it
    pub(crate) fn pending_account(&self, journal: &Journal, user: &Address) -> Result<Account> {
        if journal.touched.contains(user) {
            return Ok(journal.staged.account(user));
        }
        Ok(self.read_ledger()?.account(user))
    }

    /// Swap the staged accounts into the ledger and publish events
    fn commit(&self, journal: Journal) -> Result<()> {
        let mut ledger = match self.write_ledger() {
            Ok(ledger) => ledger,
            Err(cause) => return Err(self.rollback(journal, cause)),
        };
        for user in &journal.touched {
            ledger.replace_account(user, journal.staged.account(user));
        }
        drop(ledger);

        info!(
            operation = journal.operation,
            accounts = journal.touched.len(),
            interactions = journal.interactions.len(),
            events = journal.events.len(),
            "operation committed"
        );
        self.publish(journal.events);
        Ok(())
    }

    /// Undo recorded interactions; returns the error to surface
    fn rollback(&self, journal: Journal, cause: Error) -> Error {
        warn!(
            operation = journal.operation,
            error = %cause,
            interactions = journal.interactions.len(),
            "rolling back operation"
        );

        let mut failure = None;
        for interaction in journal.interactions.iter().rev() {
            if let Err(reason) = self.compensate(interaction) {
                error!(
                    operation = journal.operation,
                    ?interaction,
                    %reason,
                    "compensation failed"
                );
                failure.get_or_insert(reason);
            }
        }

        match failure {
            Some(reason) => Error::RollbackFailed {
                operation: journal.operation.into(),
                reason: format!("{} (after: {})", reason, cause),
            },
            None => cause,
        }
    }

    fn compensate(&self, interaction: &Interaction) -> Result<()> {
        let engine = self.engine_address();
        let dsc = self.dsc();

        let ok = match interaction {
            Interaction::CollateralPulled { asset, from, amount } => {
                self.token(asset)?.transfer(&engine, from, *amount)?
            }
            Interaction::CollateralPushed { asset, to, amount } => {
                self.token(asset)?.transfer_from(to, &engine, *amount)?
            }
            Interaction::DscMinted { to, amount } => {
                dsc.transfer_from(to, &engine, *amount)? && {
                    dsc.burn(&engine, *amount)?;
                    true
                }
            }
            Interaction::DscPulled { from, amount } => dsc.transfer(&engine, from, *amount)?,
            Interaction::DscBurned { amount } => dsc.mint(&engine, &engine, *amount)?,
        };

        if !ok {
            return Err(Error::TransferFailed);
        }
        debug!(?interaction, "interaction compensated");
        Ok(())
    }
}
