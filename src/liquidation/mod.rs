//! Liquidation module for the DSC protocol.
//!
//! Third parties repay part of an unhealthy account's debt and receive the
//! matching collateral plus a bonus. A liquidation must strictly improve the
//! target's health factor and leave the liquidator solvent.

pub mod engine;

pub use engine::*;
