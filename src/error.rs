//! Error types for the DSC engine.
//!
//! Every failure is propagated to the caller. Operations that fail leave no
//! partial ledger mutation behind, so the variant alone tells the caller what
//! was rejected.

use thiserror::Error;

use crate::utils::address::Address;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the DSC engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Input Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount must be strictly positive
    #[error("Amount must be more than zero")]
    MustBeMoreThanZero,

    /// Collateral asset is not in the registry
    #[error("Token not allowed as collateral: {0}")]
    TokenNotAllowed(Address),

    /// Construction lists differ in length
    #[error("Token addresses ({tokens}) and price feed addresses ({feeds}) must be the same length")]
    TokenAddressesAndPriceFeedAddressesMustBeTheSameLength {
        /// Number of token addresses supplied
        tokens: usize,
        /// Number of price feed addresses supplied
        feeds: usize,
    },

    /// Same collateral asset listed twice
    #[error("Collateral asset listed more than once: {0}")]
    DuplicateAsset(Address),

    /// No collaborator handle was supplied for a registered address
    #[error("Missing collaborator for {0}")]
    MissingCollaborator(Address),

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Solvency Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Operation would leave the account below the minimum health factor
    #[error("Breaks health factor: {health_factor}")]
    BreaksHealthFactor {
        /// Health factor the account would have been left with (1e18 = 1.0)
        health_factor: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Liquidation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Target is healthy and cannot be liquidated
    #[error("Health factor is ok: {0}")]
    HealthFactorOk(u128),

    /// Liquidation did not strictly improve the target's health factor
    #[error("Health factor not improved: started at {starting}, ended at {ending}")]
    HealthFactorNotImproved {
        /// Health factor before the liquidation
        starting: u128,
        /// Health factor after the liquidation
        ending: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Collaborator Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Token transfer rejected or failed
    #[error("Transfer failed")]
    TransferFailed,

    /// Synthetic token mint rejected or failed
    #[error("Mint failed")]
    MintFailed,

    /// Synthetic token burn rejected or failed
    #[error("Burn failed")]
    BurnFailed,

    /// Failure raised inside a token ledger
    #[error("Token error: {0}")]
    Token(String),

    /// Price source could not produce a reading
    #[error("Price unavailable for feed {0}")]
    PriceUnavailable(Address),

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Asset has no registered price feed
    #[error("Unknown asset: {0}")]
    UnknownAsset(Address),

    /// Price reading is older than the allowed window
    #[error("Price is stale: last update {elapsed}s ago, max allowed {timeout}s")]
    StalePrice {
        /// Seconds since last update
        elapsed: u64,
        /// Maximum allowed age in seconds
        timeout: u64,
    },

    /// Price answer is zero or negative
    #[error("Invalid price answer: {0}")]
    InvalidPrice(i128),

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller is not allowed to perform this action
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A mutating entry point was called while another one is in progress
    #[error("Reentrant call rejected")]
    Reentrancy,

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,

    /// Undoing a failed operation did not complete
    #[error("Rollback of {operation} failed: {reason}")]
    RollbackFailed {
        /// Operation being rolled back
        operation: String,
        /// What went wrong during compensation
        reason: String,
    },
}

impl Error {
    /// Returns true if retrying later (after prices or balances change) may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::BreaksHealthFactor { .. }
                | Error::StalePrice { .. }
                | Error::PriceUnavailable(_)
                | Error::TransferFailed
                | Error::HealthFactorOk(_)
                | Error::Reentrancy
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::RollbackFailed { .. } | Error::Lock | Error::Overflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Validation errors: 1xxx
            Error::MustBeMoreThanZero => 1001,
            Error::TokenNotAllowed(_) => 1002,
            Error::TokenAddressesAndPriceFeedAddressesMustBeTheSameLength { .. } => 1003,
            Error::DuplicateAsset(_) => 1004,
            Error::MissingCollaborator(_) => 1005,
            Error::InvalidParameter { .. } => 1006,

            // Solvency errors: 2xxx
            Error::BreaksHealthFactor { .. } => 2001,

            // Liquidation errors: 3xxx
            Error::HealthFactorOk(_) => 3001,
            Error::HealthFactorNotImproved { .. } => 3002,

            // Collaborator errors: 4xxx
            Error::TransferFailed => 4001,
            Error::MintFailed => 4002,
            Error::BurnFailed => 4003,
            Error::Token(_) => 4004,
            Error::PriceUnavailable(_) => 4005,

            // Oracle errors: 5xxx
            Error::UnknownAsset(_) => 5001,
            Error::StalePrice { .. } => 5002,
            Error::InvalidPrice(_) => 5003,

            // Arithmetic errors: 6xxx
            Error::Overflow { .. } => 6001,
            Error::Underflow { .. } => 6002,

            // Authorization errors: 7xxx
            Error::Unauthorized(_) => 7001,

            // Serialization errors: 8xxx
            Error::Serialization(_) => 8001,
            Error::Deserialization(_) => 8002,

            // Internal errors: 9xxx
            Error::Reentrancy => 9001,
            Error::Lock => 9002,
            Error::RollbackFailed { .. } => 9003,
        }
    }
}
