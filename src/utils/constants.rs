//! Engine constants.
//!
//! All engine-wide constants are defined here for easy auditing. Runtime
//! overrides go through [`EngineParams`](crate::core::config::EngineParams),
//! whose defaults are exactly these values.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimals carried by every amount (collateral, DSC, USD value)
pub const AMOUNT_DECIMALS: u32 = 18;

/// Fixed-point scale: 1.0 == 1e18
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimals reported by price feeds
pub const FEED_DECIMALS: u32 = 8;

/// Multiplier lifting an 8-decimal feed answer to 18 decimals
pub const ADDITIONAL_FEED_PRECISION: u128 = 10_000_000_000;

/// Maximum age of a price reading before it is considered stale (3 hours)
pub const PRICE_TIMEOUT_SECS: u64 = 3 * 60 * 60;

// ═══════════════════════════════════════════════════════════════════════════════
// SOLVENCY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share of collateral value counted toward solvency - 50%
/// Equivalent to a 200% minimum collateralization ratio
pub const LIQUIDATION_THRESHOLD: u128 = 50;

/// Divisor for threshold and bonus percentages
pub const LIQUIDATION_PRECISION: u128 = 100;

/// Liquidator bonus on seized collateral - 10%
pub const LIQUIDATION_BONUS: u128 = 10;

/// Minimum health factor an account must keep (1.0)
pub const MIN_HEALTH_FACTOR: u128 = PRECISION;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account / asset / feed address in bytes
pub const ADDRESS_LENGTH: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// BOOKKEEPING CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of events kept in memory by the engine
pub const MAX_EVENTS: usize = 1000;
