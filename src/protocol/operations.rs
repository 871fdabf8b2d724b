//! Protocol operations - serializable requests for every mutating entry point.
//!
//! An [`Operation`] names its caller explicitly and carries amounts as
//! 18-decimal integers (decimal strings on the wire). [`DscEngine::execute`]
//! dispatches it to the matching entry point.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tracing::debug;

use crate::engine::DscEngine;
use crate::error::Result;
use crate::liquidation::engine::LiquidationOutcome;
use crate::utils::address::Address;
use crate::utils::math::units;

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Deposit collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCollateralOp {
    /// Depositor
    pub user: Address,
    /// Collateral asset
    pub asset: Address,
    /// Amount to deposit
    #[serde(with = "units")]
    pub amount: u128,
}

/// Redeem collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemCollateralOp {
    /// Owner of the collateral
    pub user: Address,
    /// Collateral asset
    pub asset: Address,
    /// Amount to withdraw
    #[serde(with = "units")]
    pub amount: u128,
}

/// Mint DSC against deposited collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintDscOp {
    /// Borrower
    pub user: Address,
    /// Amount to mint
    #[serde(with = "units")]
    pub amount: u128,
}

/// Burn DSC to repay debt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnDscOp {
    /// Borrower, also the DSC holder
    pub user: Address,
    /// Amount to burn
    #[serde(with = "units")]
    pub amount: u128,
}

/// Deposit collateral and mint in one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAndMintOp {
    /// Borrower
    pub user: Address,
    /// Collateral asset
    pub asset: Address,
    /// Collateral to deposit
    #[serde(with = "units")]
    pub collateral_amount: u128,
    /// DSC to mint
    #[serde(with = "units")]
    pub dsc_amount: u128,
}

/// Burn DSC and redeem collateral in one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemForDscOp {
    /// Borrower
    pub user: Address,
    /// Collateral asset
    pub asset: Address,
    /// Collateral to withdraw
    #[serde(with = "units")]
    pub collateral_amount: u128,
    /// DSC to burn
    #[serde(with = "units")]
    pub dsc_amount: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidate an unhealthy position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidateOp {
    /// Account paying the debt and receiving collateral
    pub liquidator: Address,
    /// Collateral asset to seize
    pub asset: Address,
    /// Account being liquidated
    pub target: Address,
    /// DSC debt to cover
    #[serde(with = "units")]
    pub debt_to_cover: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// All mutating engine operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Deposit collateral
    DepositCollateral(DepositCollateralOp),
    /// Redeem collateral
    RedeemCollateral(RedeemCollateralOp),
    /// Mint DSC
    MintDsc(MintDscOp),
    /// Burn DSC
    BurnDsc(BurnDscOp),
    /// Deposit and mint
    DepositCollateralAndMintDsc(DepositAndMintOp),
    /// Burn and redeem
    RedeemCollateralForDsc(RedeemForDscOp),
    /// Liquidate
    Liquidate(LiquidateOp),
}

impl Operation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::DepositCollateral(_) => "DepositCollateral",
            Self::RedeemCollateral(_) => "RedeemCollateral",
            Self::MintDsc(_) => "MintDsc",
            Self::BurnDsc(_) => "BurnDsc",
            Self::DepositCollateralAndMintDsc(_) => "DepositCollateralAndMintDsc",
            Self::RedeemCollateralForDsc(_) => "RedeemCollateralForDsc",
            Self::Liquidate(_) => "Liquidate",
        }
    }

    /// Account on whose authority the operation runs
    pub fn caller(&self) -> &Address {
        match self {
            Self::DepositCollateral(op) => &op.user,
            Self::RedeemCollateral(op) => &op.user,
            Self::MintDsc(op) => &op.user,
            Self::BurnDsc(op) => &op.user,
            Self::DepositCollateralAndMintDsc(op) => &op.user,
            Self::RedeemCollateralForDsc(op) => &op.user,
            Self::Liquidate(op) => &op.liquidator,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOME
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledger position of one account after an operation (no prices involved)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSummary {
    /// Account
    pub user: Address,
    /// Collateral per asset
    pub collateral: BTreeMap<Address, u128>,
    /// DSC debt
    pub dsc_minted: u128,
}

/// Result of an executed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutcome {
    /// Position operation; the caller's position afterwards
    Position(PositionSummary),
    /// Liquidation result
    Liquidation(LiquidationOutcome),
}

impl DscEngine {
    /// Execute an operation through the matching entry point
    pub fn execute(&self, op: &Operation) -> Result<OperationOutcome> {
        debug!(operation = op.operation_type(), caller = %op.caller(), "executing operation");

        match op {
            Operation::DepositCollateral(op) => {
                self.deposit_collateral(&op.user, &op.asset, op.amount)?
            }
            Operation::RedeemCollateral(op) => {
                self.redeem_collateral(&op.user, &op.asset, op.amount)?
            }
            Operation::MintDsc(op) => self.mint_dsc(&op.user, op.amount)?,
            Operation::BurnDsc(op) => self.burn_dsc(&op.user, op.amount)?,
            Operation::DepositCollateralAndMintDsc(op) => self.deposit_collateral_and_mint_dsc(
                &op.user,
                &op.asset,
                op.collateral_amount,
                op.dsc_amount,
            )?,
            Operation::RedeemCollateralForDsc(op) => self.redeem_collateral_for_dsc(
                &op.user,
                &op.asset,
                op.collateral_amount,
                op.dsc_amount,
            )?,
            Operation::Liquidate(op) => {
                let outcome =
                    self.liquidate(&op.liquidator, &op.asset, &op.target, op.debt_to_cover)?;
                return Ok(OperationOutcome::Liquidation(outcome));
            }
        }

        let user = *op.caller();
        let account = self.read_ledger()?.account(&user);
        Ok(OperationOutcome::Position(PositionSummary {
            user,
            collateral: account.collateral,
            dsc_minted: account.debt_minted,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
