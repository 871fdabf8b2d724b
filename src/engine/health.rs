//! USD valuation and health factor.
//!
//! The health factor is the threshold-adjusted collateral value divided by the
//! minted debt, scaled so that `1e18` is the minimum safe value:
//!
//! ```text
//! adjusted = collateral_value_usd * liquidation_threshold / liquidation_precision
//! health   = adjusted * 1e18 / debt          (debt > 0)
//!          = adjusted * 1e18                 (debt == 0)
//! ```
//!
//! Both health results saturate at `u128::MAX`; every other product fails
//! with `Overflow` if it does not fit.

use crate::core::config::EngineParams;
use crate::core::ledger::Account;
use crate::core::registry::AssetRegistry;
use crate::error::Result;
use crate::oracle::adapter::PriceOracleAdapter;
use crate::utils::address::Address;
use crate::utils::constants::PRECISION;
use crate::utils::math::{mul_div, mul_div_saturating, safe_add};

/// Health factor from debt and USD collateral value, without touching the oracle
pub fn calculate_health_factor(
    params: &EngineParams,
    total_dsc_minted: u128,
    collateral_value_usd: u128,
) -> Result<u128> {
    let adjusted = mul_div(
        collateral_value_usd,
        params.liquidation_threshold,
        params.liquidation_precision,
    )?;

    if total_dsc_minted == 0 {
        return mul_div_saturating(adjusted, PRECISION, 1);
    }
    mul_div_saturating(adjusted, PRECISION, total_dsc_minted)
}

/// Values collateral through the oracle and derives health factors
#[derive(Debug, Clone)]
pub struct HealthFactorCalculator {
    params: EngineParams,
    registry: AssetRegistry,
    oracle: PriceOracleAdapter,
}

impl HealthFactorCalculator {
    /// Create a calculator over the approved assets of `registry`
    pub fn new(params: EngineParams, registry: AssetRegistry, oracle: PriceOracleAdapter) -> Self {
        Self {
            params,
            registry,
            oracle,
        }
    }

    /// USD value of `amount` units of `asset`
    pub fn usd_value(&self, asset: &Address, amount: u128) -> Result<u128> {
        let price = self.oracle.normalized_price(asset)?;
        mul_div(price, amount, PRECISION)
    }

    /// Units of `asset` worth `usd_amount`
    pub fn token_amount_for_usd(&self, asset: &Address, usd_amount: u128) -> Result<u128> {
        let price = self.oracle.normalized_price(asset)?;
        mul_div(usd_amount, PRECISION, price)
    }

    /// Total USD value of the account's collateral.
    ///
    /// Every approved asset is priced, including those with a zero balance.
    pub fn account_value_usd(&self, account: &Account) -> Result<u128> {
        self.registry
            .assets()
            .iter()
            .try_fold(0u128, |total, asset| {
                let value = self.usd_value(asset, account.collateral_of(asset))?;
                safe_add(total, value)
            })
    }

    /// Health factor of `account` at current prices
    pub fn health_factor(&self, account: &Account) -> Result<u128> {
        let value = self.account_value_usd(account)?;
        calculate_health_factor(&self.params, account.debt_minted, value)
    }

    /// Oracle adapter used for every valuation
    pub fn oracle(&self) -> &PriceOracleAdapter {
        &self.oracle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::oracle::price_feed::{Clock, ManualClock, MockPriceFeed};
    use std::sync::Arc;

    const START: u64 = 1_700_000_000;
    const ONE: u128 = PRECISION;

    fn weth() -> Address {
        Address::from_label("weth")
    }

    fn wbtc() -> Address {
        Address::from_label("wbtc")
    }

    fn setup() -> (HealthFactorCalculator, Arc<MockPriceFeed>, Arc<ManualClock>) {
        let feeds = [Address::from_label("weth-usd"), Address::from_label("wbtc-usd")];
        let registry = AssetRegistry::new(&[weth(), wbtc()], &feeds).unwrap();
        let prices = Arc::new(MockPriceFeed::default());
        let clock = Arc::new(ManualClock::new(START));
        prices.set_answer(&feeds[0], 2000_0000_0000, START).unwrap();
        prices.set_answer(&feeds[1], 1000_0000_0000, START).unwrap();

        let params = EngineParams::default();
        let oracle = PriceOracleAdapter::new(registry.clone(), prices.clone(), clock.clone(), &params);
        (
            HealthFactorCalculator::new(params, registry, oracle),
            prices,
            clock,
        )
    }

    fn account(weth_amount: u128, debt: u128) -> Account {
        let mut account = Account::default();
        if weth_amount > 0 {
            account.collateral.insert(weth(), weth_amount);
        }
        account.debt_minted = debt;
        account
    }

    #[test]
    fn test_usd_value() {
        let (calc, _, _) = setup();
        assert_eq!(calc.usd_value(&weth(), 15 * ONE).unwrap(), 30_000 * ONE);
    }

    #[test]
    fn test_token_amount_for_usd() {
        let (calc, _, _) = setup();
        assert_eq!(calc.token_amount_for_usd(&weth(), 100 * ONE).unwrap(), ONE / 20);
    }

    #[test]
    fn test_account_value_sums_assets() {
        let (calc, _, _) = setup();
        let mut acct = account(10 * ONE, 0);
        acct.collateral.insert(wbtc(), 2 * ONE);
        assert_eq!(calc.account_value_usd(&acct).unwrap(), 22_000 * ONE);
    }

    #[test]
    fn test_health_factor() {
        let (calc, _, _) = setup();
        assert_eq!(calc.health_factor(&account(10 * ONE, 1000 * ONE)).unwrap(), 10 * ONE);
        assert_eq!(
            calc.health_factor(&account(10 * ONE, 40_000 * ONE)).unwrap(),
            ONE / 4
        );
    }

    #[test]
    fn test_health_factor_without_debt() {
        let (calc, _, _) = setup();
        assert_eq!(calc.health_factor(&account(0, 0)).unwrap(), 0);
        // 1 wei of weth is worth 2000 wei of USD; adjusted 1000, scaled by 1e18
        assert_eq!(calc.health_factor(&account(1, 0)).unwrap(), 1000 * ONE);
        assert_eq!(calc.health_factor(&account(10 * ONE, 0)).unwrap(), u128::MAX);
    }

    #[test]
    fn test_calculate_health_factor_saturates() {
        let params = EngineParams::default();
        assert_eq!(
            calculate_health_factor(&params, 0, u128::MAX).unwrap(),
            u128::MAX
        );
        assert_eq!(
            calculate_health_factor(&params, 1, u128::MAX / 2).unwrap(),
            u128::MAX
        );
        assert_eq!(
            calculate_health_factor(&params, 100 * ONE, 200 * ONE).unwrap(),
            ONE
        );
    }

    #[test]
    fn test_stale_zero_balance_asset_freezes_valuation() {
        let (calc, prices, clock) = setup();
        clock.advance(4 * 3600);
        // Refresh only weth; the empty wbtc balance still needs a fresh price
        prices
            .set_answer(&Address::from_label("weth-usd"), 2000_0000_0000, clock.now())
            .unwrap();

        let result = calc.account_value_usd(&account(ONE, 0));
        assert!(matches!(result, Err(Error::StalePrice { .. })));
    }
}
