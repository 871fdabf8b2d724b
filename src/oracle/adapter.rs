//! Staleness-checked price access for approved collateral.
//!
//! Every USD valuation in the engine goes through [`PriceOracleAdapter::normalized_price`].
//! A stale, missing or non-positive reading fails the whole computation; there
//! is no fallback price.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::config::EngineParams;
use crate::core::registry::AssetRegistry;
use crate::error::{Error, Result};
use crate::oracle::price_feed::{Clock, PriceReading, PriceSource};
use crate::utils::address::Address;
use crate::utils::math::mul_div;
use crate::utils::validation::{validate_price_answer, validate_price_freshness};

/// Maps approved assets to feeds and rejects stale readings
#[derive(Clone)]
pub struct PriceOracleAdapter {
    registry: AssetRegistry,
    source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    timeout_secs: u64,
    additional_feed_precision: u128,
}

impl fmt::Debug for PriceOracleAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceOracleAdapter")
            .field("assets", &self.registry.len())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PriceOracleAdapter {
    /// Create an adapter over `registry` using the timeout and feed decimals of `params`
    pub fn new(
        registry: AssetRegistry,
        source: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
        params: &EngineParams,
    ) -> Self {
        Self {
            registry,
            source,
            clock,
            timeout_secs: params.price_timeout_secs,
            additional_feed_precision: params.additional_feed_precision(),
        }
    }

    /// Raw latest reading for `asset`, without freshness checks
    pub fn get_price(&self, asset: &Address) -> Result<PriceReading> {
        let feed = self
            .registry
            .feed_of(asset)
            .ok_or(Error::UnknownAsset(*asset))?;
        self.source.latest_reading(&feed)
    }

    /// Latest reading for `asset`, failing with `StalePrice` if older than the timeout
    pub fn stale_check(&self, asset: &Address) -> Result<PriceReading> {
        let reading = self.get_price(asset)?;
        let now = self.clock.now();

        if let Err(err) = validate_price_freshness(reading.updated_at, now, self.timeout_secs) {
            warn!(
                %asset,
                round_id = reading.round_id,
                updated_at = reading.updated_at,
                now,
                "rejecting stale price"
            );
            return Err(err);
        }
        Ok(reading)
    }

    /// Fresh price of one whole unit of `asset` in USD, with 18 decimals
    pub fn normalized_price(&self, asset: &Address) -> Result<u128> {
        let reading = self.stale_check(asset)?;
        let answer = validate_price_answer(reading.answer)?;
        let price = mul_div(answer, self.additional_feed_precision, 1)?;
        debug!(%asset, round_id = reading.round_id, price, "normalized price");
        Ok(price)
    }

    /// Allowed reading age in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Current time according to the adapter's clock
    pub fn now(&self) -> u64 {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::price_feed::{ManualClock, MockPriceFeed};
    use crate::utils::constants::PRICE_TIMEOUT_SECS;

    const START: u64 = 1_700_000_000;

    fn weth() -> Address {
        Address::from_label("weth")
    }

    fn weth_feed() -> Address {
        Address::from_label("weth-usd")
    }

    fn setup() -> (PriceOracleAdapter, Arc<MockPriceFeed>, Arc<ManualClock>) {
        let registry = AssetRegistry::new(&[weth()], &[weth_feed()]).unwrap();
        let prices = Arc::new(MockPriceFeed::default());
        let clock = Arc::new(ManualClock::new(START));
        prices.set_answer(&weth_feed(), 2000_0000_0000, START).unwrap();

        let adapter = PriceOracleAdapter::new(
            registry,
            prices.clone(),
            clock.clone(),
            &EngineParams::default(),
        );
        (adapter, prices, clock)
    }

    #[test]
    fn test_normalized_price() {
        let (adapter, _, _) = setup();
        assert_eq!(
            adapter.normalized_price(&weth()).unwrap(),
            2000 * 1_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_unknown_asset() {
        let (adapter, _, _) = setup();
        let doge = Address::from_label("doge");
        assert_eq!(adapter.get_price(&doge), Err(Error::UnknownAsset(doge)));
    }

    #[test]
    fn test_stale_boundary() {
        let (adapter, _, clock) = setup();

        clock.advance(PRICE_TIMEOUT_SECS);
        assert!(adapter.stale_check(&weth()).is_ok());

        clock.advance(1);
        assert_eq!(
            adapter.stale_check(&weth()),
            Err(Error::StalePrice {
                elapsed: PRICE_TIMEOUT_SECS + 1,
                timeout: PRICE_TIMEOUT_SECS
            })
        );
        assert!(adapter.normalized_price(&weth()).is_err());

        // Raw reads ignore freshness
        assert!(adapter.get_price(&weth()).is_ok());
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let (adapter, prices, _) = setup();
        prices
            .set_answer(&weth_feed(), 2100_0000_0000, START + 600)
            .unwrap();
        assert!(adapter.stale_check(&weth()).is_ok());
    }

    #[test]
    fn test_non_positive_answer() {
        let (adapter, prices, _) = setup();
        prices.set_answer(&weth_feed(), 0, START).unwrap();
        assert_eq!(adapter.normalized_price(&weth()), Err(Error::InvalidPrice(0)));

        prices.set_answer(&weth_feed(), -1, START).unwrap();
        assert_eq!(adapter.normalized_price(&weth()), Err(Error::InvalidPrice(-1)));
    }
}
