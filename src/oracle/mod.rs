//! Oracle module for collateral prices.
//!
//! This module provides price access for the engine:
//! - Raw readings from price sources (`price_feed`)
//! - Staleness checks and decimal normalization (`adapter`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dsc_engine::oracle::{MockPriceFeed, ManualClock, PriceOracleAdapter};
//!
//! let adapter = PriceOracleAdapter::new(registry, prices, clock, &params);
//! let usd_per_unit = adapter.normalized_price(&weth)?;
//! ```

pub mod adapter;
pub mod price_feed;

pub use adapter::*;
pub use price_feed::*;
