//! Price readings, price sources and clocks.
//!
//! This module provides the raw inputs of the oracle adapter:
//! - [`PriceReading`]: one round reported by a feed
//! - [`PriceSource`]: anything that can report the latest round of a feed
//! - [`Clock`]: the adapter's notion of "now"
//!
//! [`MockPriceFeed`], [`SystemClock`] and [`ManualClock`] are the reference
//! implementations used by the scenario runner and the tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::address::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE READING
// ═══════════════════════════════════════════════════════════════════════════════

/// One round reported by a price feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    /// Round identifier, increasing with every update
    pub round_id: u64,
    /// Price with the feed's decimals (8 for USD pairs)
    pub answer: i128,
    /// Unix timestamp of the update
    pub updated_at: u64,
}

impl PriceReading {
    /// Create a new reading
    pub fn new(round_id: u64, answer: i128, updated_at: u64) -> Self {
        Self {
            round_id,
            answer,
            updated_at,
        }
    }

    /// Age of the reading in seconds; future timestamps count as zero
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.updated_at)
    }

    /// Check if the reading is at most `max_age` seconds old
    pub fn is_fresh(&self, now: u64, max_age: u64) -> bool {
        self.age(now) <= max_age
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of raw price readings, keyed by feed address
pub trait PriceSource: Send + Sync {
    /// Latest round of `feed`
    fn latest_reading(&self, feed: &Address) -> Result<PriceReading>;
}

/// Source of the current unix time in seconds
pub trait Clock: Send + Sync {
    /// Current unix time in seconds
    fn now(&self) -> u64;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Wall-clock time (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock for scenarios and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock stopped at `now`
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Jump to `now`
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(secs)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct FeedRounds {
    rounds: Vec<PriceReading>,
}

/// In-memory aggregator with settable answers per feed
#[derive(Debug)]
pub struct MockPriceFeed {
    /// Decimals of every answer
    pub decimals: u32,
    /// Maximum rounds kept per feed
    max_history: usize,
    feeds: Mutex<BTreeMap<Address, FeedRounds>>,
}

impl Default for MockPriceFeed {
    fn default() -> Self {
        Self::new(crate::utils::constants::FEED_DECIMALS)
    }
}

impl MockPriceFeed {
    /// Create an empty feed set
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals,
            max_history: 100,
            feeds: Mutex::new(BTreeMap::new()),
        }
    }

    /// Publish a new round for `feed` and return its round id
    pub fn set_answer(&self, feed: &Address, answer: i128, updated_at: u64) -> Result<u64> {
        let mut feeds = self.feeds.lock().map_err(|_| Error::Lock)?;
        let entry = feeds.entry(*feed).or_default();

        let round_id = entry.rounds.last().map_or(1, |r| r.round_id + 1);
        entry.rounds.push(PriceReading::new(round_id, answer, updated_at));
        if entry.rounds.len() > self.max_history {
            entry.rounds.remove(0);
        }

        debug!(%feed, round_id, answer, updated_at, "price round published");
        Ok(round_id)
    }

    /// A specific past round of `feed`, if still retained
    pub fn round_data(&self, feed: &Address, round_id: u64) -> Result<PriceReading> {
        let feeds = self.feeds.lock().map_err(|_| Error::Lock)?;
        feeds
            .get(feed)
            .and_then(|f| f.rounds.iter().find(|r| r.round_id == round_id).copied())
            .ok_or(Error::PriceUnavailable(*feed))
    }

    /// Number of rounds retained for `feed`
    pub fn round_count(&self, feed: &Address) -> usize {
        self.feeds
            .lock()
            .map(|feeds| feeds.get(feed).map_or(0, |f| f.rounds.len()))
            .unwrap_or(0)
    }
}

impl PriceSource for MockPriceFeed {
    fn latest_reading(&self, feed: &Address) -> Result<PriceReading> {
        let feeds = self.feeds.lock().map_err(|_| Error::Lock)?;
        feeds
            .get(feed)
            .and_then(|f| f.rounds.last().copied())
            .ok_or(Error::PriceUnavailable(*feed))
    }
}
