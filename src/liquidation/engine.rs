//! Liquidation engine for the DSC protocol.
//!
//! This module handles closing under-collateralized positions:
//! - Detection and prioritization of liquidatable accounts
//! - Planning the collateral owed for a given debt (plus bonus)
//! - Execution on [`DscEngine`], guaranteeing the target's health improves
//! - Running statistics over successful liquidations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::core::config::EngineParams;
use crate::engine::health::HealthFactorCalculator;
use crate::engine::DscEngine;
use crate::error::{Error, Result};
use crate::protocol::events::{EngineEvent, LiquidatedEvent};
use crate::utils::address::Address;
use crate::utils::math::{mul_div, safe_add};
use crate::utils::validation::validate_more_than_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION PLAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral owed to a liquidator for covering some debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    /// Collateral worth exactly the covered debt
    pub token_amount: u128,
    /// Extra collateral paid as incentive
    pub bonus: u128,
    /// `token_amount + bonus`
    pub total: u128,
}

/// Result of a successful liquidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// DSC burned against the target's debt
    pub debt_covered: u128,
    /// Collateral moved to the liquidator, bonus included
    pub collateral_seized: u128,
    /// Bonus part of `collateral_seized`
    pub bonus: u128,
    /// Target health factor before
    pub starting_health_factor: u128,
    /// Target health factor after
    pub ending_health_factor: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION STATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Totals over all successful liquidations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationStats {
    /// Number of liquidations
    pub count: u64,
    /// DSC debt covered
    pub total_debt_covered: u128,
    /// Collateral seized per asset
    pub total_collateral_seized: BTreeMap<Address, u128>,
}

impl LiquidationStats {
    /// Account for one liquidation
    pub fn record(&mut self, asset: &Address, debt_covered: u128, collateral_seized: u128) {
        self.count += 1;
        self.total_debt_covered = self.total_debt_covered.saturating_add(debt_covered);
        let seized = self.total_collateral_seized.entry(*asset).or_insert(0);
        *seized = seized.saturating_add(collateral_seized);
    }

    /// Collateral seized so far in `asset`
    pub fn seized_of(&self, asset: &Address) -> u128 {
        self.total_collateral_seized.get(asset).copied().unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidation rules derived from the risk parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEngine {
    bonus: u128,
    precision: u128,
    min_health_factor: u128,
}

impl LiquidationEngine {
    /// Create from the engine's risk parameters
    pub fn new(params: &EngineParams) -> Self {
        Self {
            bonus: params.liquidation_bonus,
            precision: params.liquidation_precision,
            min_health_factor: params.min_health_factor,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DETECTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Whether an account with `debt` and `health_factor` may be liquidated
    pub fn is_liquidatable(&self, debt: u128, health_factor: u128) -> bool {
        debt > 0 && health_factor < self.min_health_factor
    }

    /// Sort candidates by priority for liquidation (lowest health factor first)
    pub fn prioritize(&self, mut candidates: Vec<(Address, u128)>) -> Vec<(Address, u128)> {
        candidates.sort_by_key(|(user, health_factor)| (*health_factor, *user));
        candidates
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INCENTIVE CALCULATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Bonus owed on `token_amount` of seized collateral
    pub fn bonus_for(&self, token_amount: u128) -> Result<u128> {
        mul_div(token_amount, self.bonus, self.precision)
    }

    /// Collateral owed for covering `debt_to_cover` USD of debt in `asset`
    pub fn plan(
        &self,
        calculator: &HealthFactorCalculator,
        asset: &Address,
        debt_to_cover: u128,
    ) -> Result<LiquidationPlan> {
        let token_amount = calculator.token_amount_for_usd(asset, debt_to_cover)?;
        let bonus = self.bonus_for(token_amount)?;
        Ok(LiquidationPlan {
            token_amount,
            bonus,
            total: safe_add(token_amount, bonus)?,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION
// ═══════════════════════════════════════════════════════════════════════════════

impl DscEngine {
    /// Cover `debt_to_cover` of `target`'s debt with the liquidator's DSC and
    /// seize the matching `asset` collateral plus bonus.
    ///
    /// Fails with `HealthFactorOk` if the target is not liquidatable,
    /// `HealthFactorNotImproved` if the target's health would not strictly
    /// increase, and `BreaksHealthFactor` if the liquidator ends up insolvent.
    pub fn liquidate(
        &self,
        liquidator: &Address,
        asset: &Address,
        target: &Address,
        debt_to_cover: u128,
    ) -> Result<LiquidationOutcome> {
        validate_more_than_zero(debt_to_cover)?;
        self.registry().ensure_allowed(asset)?;

        let outcome = self.transact("liquidate", |journal| {
            let account = self.pending_account(journal, target)?;
            let starting = self.calculator().health_factor(&account)?;
            if !self
                .liquidation_engine()
                .is_liquidatable(account.debt_minted, starting)
            {
                return Err(Error::HealthFactorOk(starting));
            }

            let plan = self
                .liquidation_engine()
                .plan(self.calculator(), asset, debt_to_cover)?;
            debug!(%target, %liquidator, ?plan, "liquidation planned");

            self.redeem_step(journal, asset, plan.total, target, liquidator)?;
            self.burn_step(journal, debt_to_cover, target, liquidator)?;

            let ending = self
                .calculator()
                .health_factor(&self.pending_account(journal, target)?)?;
            if ending <= starting {
                return Err(Error::HealthFactorNotImproved { starting, ending });
            }
            self.ensure_healthy(journal, liquidator)?;

            journal.emit(EngineEvent::Liquidated(LiquidatedEvent {
                user: *target,
                liquidator: *liquidator,
                asset: *asset,
                debt_covered: debt_to_cover,
                collateral_seized: plan.total,
                starting_health_factor: starting,
                ending_health_factor: ending,
                timestamp: self.now(),
            }));

            Ok(LiquidationOutcome {
                debt_covered: debt_to_cover,
                collateral_seized: plan.total,
                bonus: plan.bonus,
                starting_health_factor: starting,
                ending_health_factor: ending,
            })
        })?;

        self.record_liquidation(asset, outcome.debt_covered, outcome.collateral_seized);
        info!(
            %target,
            %liquidator,
            debt_covered = outcome.debt_covered,
            collateral_seized = outcome.collateral_seized,
            starting = outcome.starting_health_factor,
            ending = outcome.ending_health_factor,
            "position liquidated"
        );
        Ok(outcome)
    }

    /// Accounts below the minimum health factor, lowest first
    pub fn liquidatable_accounts(&self) -> Result<Vec<(Address, u128)>> {
        let ledger = self.ledger_snapshot()?;
        let engine = self.liquidation_engine();

        let mut candidates = Vec::new();
        for (user, account) in ledger.accounts() {
            if !account.has_debt() {
                continue;
            }
            let health_factor = self.calculator().health_factor(account)?;
            if engine.is_liquidatable(account.debt_minted, health_factor) {
                candidates.push((*user, health_factor));
            }
        }
        Ok(engine.prioritize(candidates))
    }
}
