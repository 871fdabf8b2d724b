//! The DSC engine.
//!
//! [`DscEngine`] owns the collateral/debt ledger and is its only writer. It
//! exposes:
//! - Position entry points: deposit, redeem, mint, burn and their compositions (`position`)
//! - Liquidation (`crate::liquidation`)
//! - Read-only queries (this module)
//!
//! Every mutating entry point is serialized by a [`ReentrancyGuard`] and runs
//! as one all-or-nothing transaction (`transaction`). Queries read committed
//! state only.

pub mod guard;
pub mod health;
pub mod position;
pub mod transaction;

pub use guard::*;
pub use health::*;
pub use transaction::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info};

use crate::core::config::{EngineConfig, EngineParams};
use crate::core::ledger::CollateralDebtLedger;
use crate::core::registry::AssetRegistry;
use crate::core::token::{SyntheticToken, TokenLedger};
use crate::error::{Error, Result};
use crate::liquidation::engine::{LiquidationEngine, LiquidationStats};
use crate::oracle::adapter::PriceOracleAdapter;
use crate::oracle::price_feed::{Clock, PriceSource};
use crate::protocol::events::{EngineEvent, EventLog};
use crate::utils::address::Address;
use crate::utils::constants::PRECISION;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// External systems the engine talks to
#[derive(Clone)]
pub struct Collaborators {
    /// Token ledger of every approved collateral asset
    pub collateral_tokens: BTreeMap<Address, Arc<dyn TokenLedger>>,
    /// The synthetic token, bound to `EngineConfig::dsc_address`
    pub dsc: Arc<dyn SyntheticToken>,
    /// Price source for every feed in the registry
    pub prices: Arc<dyn PriceSource>,
    /// Time source for staleness checks
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Create with no collateral tokens registered yet
    pub fn new(
        dsc: Arc<dyn SyntheticToken>,
        prices: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            collateral_tokens: BTreeMap::new(),
            dsc,
            prices,
            clock,
        }
    }

    /// Attach the token ledger of `asset`
    pub fn with_token(mut self, asset: Address, token: Arc<dyn TokenLedger>) -> Self {
        self.collateral_tokens.insert(asset, token);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT INFORMATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Debt and collateral value of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInformation {
    /// DSC minted and not yet burned
    pub total_dsc_minted: u128,
    /// USD value of all collateral (18 decimals)
    pub collateral_value_usd: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Over-collateralized synthetic dollar engine
pub struct DscEngine {
    config: EngineConfig,
    registry: AssetRegistry,
    health: HealthFactorCalculator,
    liquidation: LiquidationEngine,
    tokens: BTreeMap<Address, Arc<dyn TokenLedger>>,
    dsc: Arc<dyn SyntheticToken>,
    ledger: RwLock<CollateralDebtLedger>,
    events: Mutex<EventLog>,
    stats: Mutex<LiquidationStats>,
    guard: ReentrancyGuard,
}

impl fmt::Debug for DscEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DscEngine")
            .field("engine_address", &self.config.engine_address)
            .field("dsc_address", &self.config.dsc_address)
            .field("assets", &self.registry.assets())
            .finish()
    }
}

impl DscEngine {
    /// Build an engine from its configuration and collaborators.
    ///
    /// Fails if the configuration is invalid, the asset and feed lists
    /// disagree, or an approved asset has no token ledger.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let registry = AssetRegistry::new(&config.token_addresses, &config.price_feed_addresses)?;

        let mut tokens = BTreeMap::new();
        for asset in registry.assets() {
            let token = collaborators
                .collateral_tokens
                .get(asset)
                .ok_or(Error::MissingCollaborator(*asset))?;
            tokens.insert(*asset, Arc::clone(token));
        }

        let oracle = PriceOracleAdapter::new(
            registry.clone(),
            collaborators.prices,
            collaborators.clock,
            &config.params,
        );
        let health = HealthFactorCalculator::new(config.params.clone(), registry.clone(), oracle);
        let liquidation = LiquidationEngine::new(&config.params);

        info!(
            engine = %config.engine_address,
            dsc = %config.dsc_address,
            assets = registry.len(),
            "DSC engine initialized"
        );

        Ok(Self {
            config,
            registry,
            health,
            liquidation,
            tokens,
            dsc: collaborators.dsc,
            ledger: RwLock::new(CollateralDebtLedger::new()),
            events: Mutex::new(EventLog::new()),
            stats: Mutex::new(LiquidationStats::default()),
            guard: ReentrancyGuard::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn read_ledger(&self) -> Result<RwLockReadGuard<'_, CollateralDebtLedger>> {
        self.ledger.read().map_err(|_| Error::Lock)
    }

    pub(crate) fn write_ledger(&self) -> Result<RwLockWriteGuard<'_, CollateralDebtLedger>> {
        self.ledger.write().map_err(|_| Error::Lock)
    }

    pub(crate) fn token(&self, asset: &Address) -> Result<&Arc<dyn TokenLedger>> {
        self.tokens.get(asset).ok_or(Error::TokenNotAllowed(*asset))
    }

    pub(crate) fn dsc(&self) -> &dyn SyntheticToken {
        self.dsc.as_ref()
    }

    pub(crate) fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub(crate) fn calculator(&self) -> &HealthFactorCalculator {
        &self.health
    }

    pub(crate) fn liquidation_engine(&self) -> &LiquidationEngine {
        &self.liquidation
    }

    pub(crate) fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    /// Append committed events; a poisoned log loses them but never fails the operation
    pub(crate) fn publish(&self, events: Vec<EngineEvent>) {
        match self.events.lock() {
            Ok(mut log) => log.extend(events),
            Err(_) => error!(dropped = events.len(), "event log unavailable"),
        }
    }

    pub(crate) fn record_liquidation(&self, asset: &Address, debt_covered: u128, seized: u128) {
        match self.stats.lock() {
            Ok(mut stats) => stats.record(asset, debt_covered, seized),
            Err(_) => error!(%asset, debt_covered, seized, "liquidation stats unavailable"),
        }
    }

    pub(crate) fn now(&self) -> u64 {
        self.health.oracle().now()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VALUATION QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// USD value of all collateral deposited by `user`
    pub fn account_collateral_value(&self, user: &Address) -> Result<u128> {
        let account = self.read_ledger()?.account(user);
        self.health.account_value_usd(&account)
    }

    /// USD value of `amount` units of `asset`
    pub fn usd_value(&self, asset: &Address, amount: u128) -> Result<u128> {
        self.health.usd_value(asset, amount)
    }

    /// Units of `asset` worth `usd_amount`
    pub fn token_amount_from_usd(&self, asset: &Address, usd_amount: u128) -> Result<u128> {
        self.health.token_amount_for_usd(asset, usd_amount)
    }

    /// Debt and collateral value of `user`
    pub fn account_information(&self, user: &Address) -> Result<AccountInformation> {
        let account = self.read_ledger()?.account(user);
        Ok(AccountInformation {
            total_dsc_minted: account.debt_minted,
            collateral_value_usd: self.health.account_value_usd(&account)?,
        })
    }

    /// Health factor of `user` at current prices
    pub fn health_factor(&self, user: &Address) -> Result<u128> {
        let account = self.read_ledger()?.account(user);
        self.health.health_factor(&account)
    }

    /// Health factor for arbitrary debt and collateral value (no oracle access)
    pub fn calculate_health_factor(&self, total_dsc_minted: u128, collateral_value_usd: u128) -> Result<u128> {
        calculate_health_factor(&self.config.params, total_dsc_minted, collateral_value_usd)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BALANCE QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Collateral of `user` in `asset`; never reads prices
    pub fn collateral_balance_of(&self, user: &Address, asset: &Address) -> Result<u128> {
        Ok(self.read_ledger()?.collateral_of(user, asset))
    }

    /// DSC minted by `user`; never reads prices
    pub fn dsc_minted(&self, user: &Address) -> Result<u128> {
        Ok(self.read_ledger()?.debt_of(user))
    }

    /// Copy of the whole ledger
    pub fn ledger_snapshot(&self) -> Result<CollateralDebtLedger> {
        Ok(self.read_ledger()?.clone())
    }

    /// Committed events, oldest first
    pub fn events(&self) -> Result<Vec<EngineEvent>> {
        Ok(self.events.lock().map_err(|_| Error::Lock)?.events())
    }

    /// Totals over all successful liquidations
    pub fn liquidation_stats(&self) -> Result<LiquidationStats> {
        Ok(self.stats.lock().map_err(|_| Error::Lock)?.clone())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION GETTERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Approved collateral assets in registry order
    pub fn collateral_tokens(&self) -> Vec<Address> {
        self.registry.assets().to_vec()
    }

    /// Price feed bound to `asset`
    pub fn collateral_token_price_feed(&self, asset: &Address) -> Option<Address> {
        self.registry.feed_of(asset)
    }

    /// Fixed-point scale (1e18)
    pub fn precision(&self) -> u128 {
        PRECISION
    }

    /// Multiplier lifting feed answers to 18 decimals
    pub fn additional_feed_precision(&self) -> u128 {
        self.config.params.additional_feed_precision()
    }

    /// Share of collateral counted toward solvency
    pub fn liquidation_threshold(&self) -> u128 {
        self.config.params.liquidation_threshold
    }

    /// Liquidator bonus
    pub fn liquidation_bonus(&self) -> u128 {
        self.config.params.liquidation_bonus
    }

    /// Divisor for threshold and bonus
    pub fn liquidation_precision(&self) -> u128 {
        self.config.params.liquidation_precision
    }

    /// Minimum health factor
    pub fn min_health_factor(&self) -> u128 {
        self.config.params.min_health_factor
    }

    /// Identity of the synthetic token
    pub fn dsc_address(&self) -> Address {
        self.config.dsc_address
    }

    /// Identity of the engine (custody account)
    pub fn engine_address(&self) -> Address {
        self.config.engine_address
    }

    /// Risk parameters
    pub fn params(&self) -> &EngineParams {
        &self.config.params
    }

    /// Full construction-time configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::{InMemoryToken, StableToken};
    use crate::oracle::price_feed::{ManualClock, MockPriceFeed};

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    fn collaborators() -> Collaborators {
        Collaborators::new(
            Arc::new(StableToken::new(addr("engine"))),
            Arc::new(MockPriceFeed::default()),
            Arc::new(ManualClock::new(0)),
        )
        .with_token(addr("weth"), Arc::new(InMemoryToken::new("WETH")))
    }

    fn config(tokens: Vec<Address>, feeds: Vec<Address>) -> EngineConfig {
        EngineConfig::new(tokens, feeds, addr("dsc"), addr("engine"))
    }

    #[test]
    fn test_construction() {
        let engine = DscEngine::new(
            config(vec![addr("weth")], vec![addr("weth-usd")]),
            collaborators(),
        )
        .unwrap();

        assert_eq!(engine.collateral_tokens(), vec![addr("weth")]);
        assert_eq!(engine.collateral_token_price_feed(&addr("weth")), Some(addr("weth-usd")));
        assert_eq!(engine.collateral_token_price_feed(&addr("wbtc")), None);
        assert_eq!(engine.dsc_address(), addr("dsc"));
        assert_eq!(engine.precision(), PRECISION);
        assert_eq!(engine.additional_feed_precision(), 10_000_000_000);
        assert_eq!(engine.liquidation_threshold(), 50);
        assert_eq!(engine.liquidation_bonus(), 10);
        assert_eq!(engine.liquidation_precision(), 100);
        assert_eq!(engine.min_health_factor(), PRECISION);
    }

    #[test]
    fn test_construction_length_mismatch() {
        let result = DscEngine::new(
            config(vec![addr("weth")], vec![addr("weth-usd"), addr("wbtc-usd")]),
            collaborators(),
        );
        assert!(matches!(
            result,
            Err(Error::TokenAddressesAndPriceFeedAddressesMustBeTheSameLength { tokens: 1, feeds: 2 })
        ));
    }

    #[test]
    fn test_construction_missing_token() {
        let result = DscEngine::new(
            config(
                vec![addr("weth"), addr("wbtc")],
                vec![addr("weth-usd"), addr("wbtc-usd")],
            ),
            collaborators(),
        );
        assert!(matches!(result, Err(Error::MissingCollaborator(a)) if a == addr("wbtc")));
    }

    #[test]
    fn test_empty_account_queries() {
        let engine = DscEngine::new(config(vec![], vec![]), collaborators()).unwrap();
        let user = addr("nobody");

        assert_eq!(engine.collateral_balance_of(&user, &addr("weth")).unwrap(), 0);
        assert_eq!(engine.dsc_minted(&user).unwrap(), 0);
        assert_eq!(
            engine.account_information(&user).unwrap(),
            AccountInformation {
                total_dsc_minted: 0,
                collateral_value_usd: 0
            }
        );
        assert_eq!(engine.health_factor(&user).unwrap(), 0);
        assert!(engine.events().unwrap().is_empty());
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DscEngine>();
    }
}
