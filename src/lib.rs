//! # DSC Engine
//!
//! An over-collateralized synthetic dollar. Users lock approved collateral
//! assets, mint DSC against them, and must keep every position at or above a
//! minimum health factor. Third parties may liquidate positions that fall
//! below it, earning a bonus from the target's collateral.
//!
//! ## Architecture
//!
//! - **Oracle**: price-source adapter with decimal normalization and a
//!   staleness check
//! - **Core**: configuration, asset registry, collateral/debt ledger and the
//!   token collaborator traits
//! - **Engine**: health factor, position entry points, reentrancy guard and
//!   all-or-nothing transactions
//! - **Liquidation**: planning and executing liquidations
//! - **Protocol**: serializable operations and committed events
//! - **CLI**: scenario files run against in-memory collaborators
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsc_engine::prelude::*;
//!
//! let engine = DscEngine::new(config, collaborators)?;
//! engine.deposit_collateral_and_mint_dsc(&alice, &weth, 10 * PRECISION, 100 * PRECISION)?;
//! assert!(engine.health_factor(&alice)? >= engine.min_health_factor());
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod engine;
pub mod error;
pub mod liquidation;
pub mod oracle;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{EngineConfig, EngineParams},
        ledger::{Account, CollateralDebtLedger},
        registry::AssetRegistry,
        token::{InMemoryToken, StableToken, SyntheticToken, TokenLedger},
    };
    pub use crate::engine::{AccountInformation, Collaborators, DscEngine};
    pub use crate::error::{Error, Result};
    pub use crate::liquidation::engine::{LiquidationOutcome, LiquidationStats};
    pub use crate::oracle::{
        adapter::PriceOracleAdapter,
        price_feed::{Clock, ManualClock, MockPriceFeed, PriceReading, PriceSource, SystemClock},
    };
    pub use crate::protocol::{
        events::EngineEvent,
        operations::{Operation, OperationOutcome},
    };
    pub use crate::utils::{address::Address, constants::PRECISION};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "DSC";
