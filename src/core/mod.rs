//! Core modules for the DSC engine.
//!
//! This module contains the fundamental building blocks:
//! - Configuration and risk parameters
//! - Approved collateral registry
//! - Collateral and debt ledger
//! - Token collaborator traits and in-memory tokens

pub mod config;
pub mod ledger;
pub mod registry;
pub mod token;

pub use config::*;
pub use ledger::*;
pub use registry::*;
pub use token::*;
