//! Position entry points: deposit, redeem, mint, burn.
//!
//! Every entry point follows the same order:
//! 1. amount and asset validation
//! 2. reentrancy guard
//! 3. ledger mutation
//! 4. token interaction
//! 5. solvency check
//!
//! The staged ledger is updated before any collaborator is called, and no
//! ledger lock is held across a collaborator call. Any failure rolls the
//! whole operation back.

use tracing::debug;

use crate::engine::transaction::{Interaction, Journal};
use crate::engine::DscEngine;
use crate::error::{Error, Result};
use crate::protocol::events::{
    CollateralDepositedEvent, CollateralRedeemedEvent, DscBurnedEvent, DscMintedEvent, EngineEvent,
};
use crate::utils::address::Address;
use crate::utils::validation::validate_more_than_zero;

/// Collapse a collaborator result into success or `failure`
fn require_success(result: Result<bool>, failure: Error) -> Result<()> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(failure),
        Err(err) => {
            debug!(error = %err, "collaborator call failed");
            Err(failure)
        }
    }
}

impl DscEngine {
    // ═══════════════════════════════════════════════════════════════════════════
    // ENTRY POINTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deposit `amount` of `asset` as collateral for `user`
    pub fn deposit_collateral(&self, user: &Address, asset: &Address, amount: u128) -> Result<()> {
        validate_more_than_zero(amount)?;
        self.registry().ensure_allowed(asset)?;

        self.transact("deposit_collateral", |journal| {
            self.deposit_step(journal, user, asset, amount)?;
            self.ensure_healthy(journal, user)
        })
    }

    /// Withdraw `amount` of `asset` collateral back to `user`
    pub fn redeem_collateral(&self, user: &Address, asset: &Address, amount: u128) -> Result<()> {
        validate_more_than_zero(amount)?;
        self.registry().ensure_allowed(asset)?;

        self.transact("redeem_collateral", |journal| {
            self.redeem_step(journal, asset, amount, user, user)?;
            self.ensure_healthy(journal, user)
        })
    }

    /// Mint `amount` DSC to `user` against their collateral
    pub fn mint_dsc(&self, user: &Address, amount: u128) -> Result<()> {
        validate_more_than_zero(amount)?;

        self.transact("mint_dsc", |journal| {
            self.mint_step(journal, user, amount)?;
            self.ensure_healthy(journal, user)
        })
    }

    /// Repay `amount` of `user`'s debt with DSC held by `user`
    pub fn burn_dsc(&self, user: &Address, amount: u128) -> Result<()> {
        validate_more_than_zero(amount)?;

        self.transact("burn_dsc", |journal| {
            self.burn_step(journal, amount, user, user)?;
            self.ensure_healthy(journal, user)
        })
    }

    /// Deposit collateral and mint DSC in one transaction
    pub fn deposit_collateral_and_mint_dsc(
        &self,
        user: &Address,
        asset: &Address,
        collateral_amount: u128,
        dsc_amount: u128,
    ) -> Result<()> {
        validate_more_than_zero(collateral_amount)?;
        validate_more_than_zero(dsc_amount)?;
        self.registry().ensure_allowed(asset)?;

        self.transact("deposit_collateral_and_mint_dsc", |journal| {
            self.deposit_step(journal, user, asset, collateral_amount)?;
            self.mint_step(journal, user, dsc_amount)?;
            self.ensure_healthy(journal, user)
        })
    }

    /// Burn DSC then redeem collateral in one transaction
    pub fn redeem_collateral_for_dsc(
        &self,
        user: &Address,
        asset: &Address,
        collateral_amount: u128,
        dsc_amount: u128,
    ) -> Result<()> {
        validate_more_than_zero(collateral_amount)?;
        validate_more_than_zero(dsc_amount)?;
        self.registry().ensure_allowed(asset)?;

        self.transact("redeem_collateral_for_dsc", |journal| {
            self.burn_step(journal, dsc_amount, user, user)?;
            self.redeem_step(journal, asset, collateral_amount, user, user)?;
            self.ensure_healthy(journal, user)
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STEPS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit collateral, then pull it from `user` into custody
    pub(crate) fn deposit_step(
        &self,
        journal: &mut Journal,
        user: &Address,
        asset: &Address,
        amount: u128,
    ) -> Result<()> {
        self.stage(journal, user)?.increase_collateral(user, asset, amount)?;
        journal.emit(EngineEvent::CollateralDeposited(CollateralDepositedEvent {
            user: *user,
            asset: *asset,
            amount,
            timestamp: self.now(),
        }));

        let engine = self.engine_address();
        require_success(
            self.token(asset)?.transfer_from(user, &engine, amount),
            Error::TransferFailed,
        )?;
        journal.record(Interaction::CollateralPulled {
            asset: *asset,
            from: *user,
            amount,
        });
        Ok(())
    }

    /// Debit `from`'s collateral, then push it out of custody to `to`
    pub(crate) fn redeem_step(
        &self,
        journal: &mut Journal,
        asset: &Address,
        amount: u128,
        from: &Address,
        to: &Address,
    ) -> Result<()> {
        self.stage(journal, from)?.decrease_collateral(from, asset, amount)?;
        journal.emit(EngineEvent::CollateralRedeemed(CollateralRedeemedEvent {
            from: *from,
            to: *to,
            asset: *asset,
            amount,
            timestamp: self.now(),
        }));

        let engine = self.engine_address();
        require_success(
            self.token(asset)?.transfer(&engine, to, amount),
            Error::TransferFailed,
        )?;
        journal.record(Interaction::CollateralPushed {
            asset: *asset,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Record new debt, then mint the units to `user`
    pub(crate) fn mint_step(&self, journal: &mut Journal, user: &Address, amount: u128) -> Result<()> {
        let new_debt = {
            let ledger = self.stage(journal, user)?;
            ledger.increase_debt(user, amount)?;
            ledger.debt_of(user)
        };

        let engine = self.engine_address();
        require_success(self.dsc().mint(&engine, user, amount), Error::MintFailed)?;
        journal.record(Interaction::DscMinted { to: *user, amount });
        journal.emit(EngineEvent::DscMinted(DscMintedEvent {
            user: *user,
            amount,
            new_debt,
            timestamp: self.now(),
        }));
        Ok(())
    }

    /// Reduce `on_behalf_of`'s debt, pull the units from `dsc_from` and burn them
    pub(crate) fn burn_step(
        &self,
        journal: &mut Journal,
        amount: u128,
        on_behalf_of: &Address,
        dsc_from: &Address,
    ) -> Result<()> {
        self.stage(journal, on_behalf_of)?.decrease_debt(on_behalf_of, amount)?;

        let engine = self.engine_address();
        require_success(
            self.dsc().transfer_from(dsc_from, &engine, amount),
            Error::TransferFailed,
        )?;
        journal.record(Interaction::DscPulled {
            from: *dsc_from,
            amount,
        });

        if let Err(err) = self.dsc().burn(&engine, amount) {
            debug!(error = %err, "burn rejected");
            return Err(Error::BurnFailed);
        }
        journal.record(Interaction::DscBurned { amount });
        journal.emit(EngineEvent::DscBurned(DscBurnedEvent {
            on_behalf_of: *on_behalf_of,
            dsc_from: *dsc_from,
            amount,
            timestamp: self.now(),
        }));
        Ok(())
    }

    /// Fail with `BreaksHealthFactor` if `user` has debt and is below the minimum.
    ///
    /// Prices are read even for debt-free accounts, so a stale feed blocks the
    /// operation either way.
    pub(crate) fn ensure_healthy(&self, journal: &Journal, user: &Address) -> Result<()> {
        let account = self.pending_account(journal, user)?;
        let health_factor = self.calculator().health_factor(&account)?;

        if account.has_debt() && health_factor < self.min_health_factor() {
            debug!(%user, health_factor, "health factor broken");
            return Err(Error::BreaksHealthFactor { health_factor });
        }
        Ok(())
    }
}
