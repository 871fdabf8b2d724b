//! Engine events for state change notifications.
//!
//! Events are recorded for every committed ledger change, enabling clients
//! to track activity. An operation that fails publishes none of its events.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::utils::address::Address;
use crate::utils::constants::MAX_EVENTS;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Collateral was credited to a user
    CollateralDeposited(CollateralDepositedEvent),
    /// Collateral left engine custody
    CollateralRedeemed(CollateralRedeemedEvent),
    /// DSC was minted against a user's collateral
    DscMinted(DscMintedEvent),
    /// DSC debt was repaid and the units burned
    DscBurned(DscBurnedEvent),
    /// A position was liquidated
    Liquidated(LiquidatedEvent),
}

impl EngineEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralDeposited(_) => "CollateralDeposited",
            Self::CollateralRedeemed(_) => "CollateralRedeemed",
            Self::DscMinted(_) => "DscMinted",
            Self::DscBurned(_) => "DscBurned",
            Self::Liquidated(_) => "Liquidated",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::CollateralDeposited(e) => e.timestamp,
            Self::CollateralRedeemed(e) => e.timestamp,
            Self::DscMinted(e) => e.timestamp,
            Self::DscBurned(e) => e.timestamp,
            Self::Liquidated(e) => e.timestamp,
        }
    }

    /// Whether `address` took part in the event
    pub fn involves(&self, address: &Address) -> bool {
        match self {
            Self::CollateralDeposited(e) => e.user == *address,
            Self::CollateralRedeemed(e) => e.from == *address || e.to == *address,
            Self::DscMinted(e) => e.user == *address,
            Self::DscBurned(e) => e.on_behalf_of == *address || e.dsc_from == *address,
            Self::Liquidated(e) => e.liquidator == *address || e.user == *address,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when collateral is deposited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDepositedEvent {
    /// Depositor
    pub user: Address,
    /// Collateral asset
    pub asset: Address,
    /// Amount deposited
    pub amount: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when collateral is released from custody.
///
/// `from` is the account debited; `to` receives the tokens. They differ
/// during liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemedEvent {
    /// Account whose collateral was debited
    pub from: Address,
    /// Recipient of the collateral
    pub to: Address,
    /// Collateral asset
    pub asset: Address,
    /// Amount released
    pub amount: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when DSC is minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscMintedEvent {
    /// Minter and recipient
    pub user: Address,
    /// Amount minted
    pub amount: u128,
    /// Debt after the mint
    pub new_debt: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when DSC debt is burned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscBurnedEvent {
    /// Account whose debt was reduced
    pub on_behalf_of: Address,
    /// Account that supplied the DSC
    pub dsc_from: Address,
    /// Amount burned
    pub amount: u128,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a position is liquidated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    /// Liquidated account
    pub user: Address,
    /// Account that covered the debt
    pub liquidator: Address,
    /// Collateral asset seized
    pub asset: Address,
    /// Debt covered
    pub debt_covered: u128,
    /// Collateral seized including bonus
    pub collateral_seized: u128,
    /// Health factor before
    pub starting_health_factor: u128,
    /// Health factor after
    pub ending_health_factor: u128,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded log of committed events, oldest dropped first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<EngineEvent>,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    /// Create a log keeping at most `max_events` entries
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events: max_events.max(1),
        }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: EngineEvent) {
        self.events.push_back(event);
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
    }

    /// Append events in order
    pub fn extend(&mut self, events: impl IntoIterator<Item = EngineEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// All retained events, oldest first
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.iter().cloned().collect()
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&EngineEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events involving `address`
    pub fn events_for(&self, address: &Address) -> Vec<&EngineEvent> {
        self.events.iter().filter(|e| e.involves(address)).collect()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
