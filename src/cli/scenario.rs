//! Scenario files: scripted runs of the engine against in-memory collaborators.
//!
//! A scenario lists the collateral assets with their starting USD prices,
//! initial token balances, and a sequence of steps. Steps are either engine
//! operations or changes to the world (price updates, clock advances).
//! Users and assets are referred to by name; names are turned into stable
//! addresses with [`Address::from_label`].
//!
//! ```json
//! {
//!   "assets": [{ "symbol": "WETH", "price": "2000" }],
//!   "fundings": [{ "user": "alice", "asset": "WETH", "amount": "10" }],
//!   "steps": [
//!     { "action": "deposit_and_mint", "user": "alice", "asset": "WETH",
//!       "collateral": "10", "dsc": "100" },
//!     { "action": "set_price", "asset": "WETH", "price": "18" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::{EngineConfig, EngineParams};
use crate::core::token::{InMemoryToken, StableToken, SyntheticToken, TokenLedger};
use crate::engine::{Collaborators, DscEngine};
use crate::error::{Error, Result};
use crate::liquidation::engine::LiquidationStats;
use crate::oracle::price_feed::{Clock, ManualClock, MockPriceFeed};
use crate::protocol::operations::{
    BurnDscOp, DepositAndMintOp, DepositCollateralOp, LiquidateOp, MintDscOp, Operation,
    OperationOutcome, RedeemCollateralOp, RedeemForDscOp,
};
use crate::utils::address::Address;
use crate::utils::constants::AMOUNT_DECIMALS;
use crate::utils::math::{format_units, units};

/// Default scenario start time (2024-01-01T00:00:00Z)
pub const DEFAULT_START_TIME: u64 = 1_704_067_200;

fn default_start_time() -> u64 {
    DEFAULT_START_TIME
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIO FILE
// ═══════════════════════════════════════════════════════════════════════════════

/// Approved collateral asset and its starting price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Asset name, e.g. `WETH`
    pub symbol: String,
    /// USD price per unit
    #[serde(with = "units")]
    pub price: u128,
}

/// Initial collateral-token balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funding {
    /// Holder name
    pub user: String,
    /// Asset symbol
    pub asset: String,
    /// Units to credit
    #[serde(with = "units")]
    pub amount: u128,
}

/// One scripted step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Deposit collateral
    Deposit {
        /// Depositor
        user: String,
        /// Asset symbol
        asset: String,
        /// Units to deposit
        #[serde(with = "units")]
        amount: u128,
    },
    /// Redeem collateral
    Redeem {
        /// Owner
        user: String,
        /// Asset symbol
        asset: String,
        /// Units to withdraw
        #[serde(with = "units")]
        amount: u128,
    },
    /// Mint DSC
    Mint {
        /// Borrower
        user: String,
        /// DSC to mint
        #[serde(with = "units")]
        amount: u128,
    },
    /// Burn DSC
    Burn {
        /// Borrower
        user: String,
        /// DSC to burn
        #[serde(with = "units")]
        amount: u128,
    },
    /// Deposit then mint
    DepositAndMint {
        /// Borrower
        user: String,
        /// Asset symbol
        asset: String,
        /// Units to deposit
        #[serde(with = "units")]
        collateral: u128,
        /// DSC to mint
        #[serde(with = "units")]
        dsc: u128,
    },
    /// Burn then redeem
    RedeemForDsc {
        /// Borrower
        user: String,
        /// Asset symbol
        asset: String,
        /// Units to withdraw
        #[serde(with = "units")]
        collateral: u128,
        /// DSC to burn
        #[serde(with = "units")]
        dsc: u128,
    },
    /// Liquidate `target`
    Liquidate {
        /// Account covering the debt
        liquidator: String,
        /// Asset symbol to seize
        asset: String,
        /// Account being liquidated
        target: String,
        /// DSC debt to cover
        #[serde(with = "units")]
        debt: u128,
    },
    /// Publish a new price, timestamped now
    SetPrice {
        /// Asset symbol
        asset: String,
        /// USD price per unit
        #[serde(with = "units")]
        price: u128,
    },
    /// Move the clock forward without refreshing prices
    AdvanceClock {
        /// Seconds to advance
        secs: u64,
    },
}

impl Step {
    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            Self::Deposit { user, asset, amount } => {
                format!("{} deposits {} {}", user, format_units(*amount), asset)
            }
            Self::Redeem { user, asset, amount } => {
                format!("{} redeems {} {}", user, format_units(*amount), asset)
            }
            Self::Mint { user, amount } => format!("{} mints {} DSC", user, format_units(*amount)),
            Self::Burn { user, amount } => format!("{} burns {} DSC", user, format_units(*amount)),
            Self::DepositAndMint {
                user,
                asset,
                collateral,
                dsc,
            } => format!(
                "{} deposits {} {} and mints {} DSC",
                user,
                format_units(*collateral),
                asset,
                format_units(*dsc)
            ),
            Self::RedeemForDsc {
                user,
                asset,
                collateral,
                dsc,
            } => format!(
                "{} burns {} DSC and redeems {} {}",
                user,
                format_units(*dsc),
                format_units(*collateral),
                asset
            ),
            Self::Liquidate {
                liquidator,
                asset,
                target,
                debt,
            } => format!(
                "{} liquidates {} for {} DSC in {}",
                liquidator,
                target,
                format_units(*debt),
                asset
            ),
            Self::SetPrice { asset, price } => format!("{} price set to ${}", asset, format_units(*price)),
            Self::AdvanceClock { secs } => format!("clock advances {}s", secs),
        }
    }

    fn users(&self) -> Vec<&str> {
        match self {
            Self::Deposit { user, .. }
            | Self::Redeem { user, .. }
            | Self::Mint { user, .. }
            | Self::Burn { user, .. }
            | Self::DepositAndMint { user, .. }
            | Self::RedeemForDsc { user, .. } => vec![user.as_str()],
            Self::Liquidate {
                liquidator, target, ..
            } => vec![liquidator.as_str(), target.as_str()],
            Self::SetPrice { .. } | Self::AdvanceClock { .. } => Vec::new(),
        }
    }

    fn asset(&self) -> Option<&str> {
        match self {
            Self::Deposit { asset, .. }
            | Self::Redeem { asset, .. }
            | Self::DepositAndMint { asset, .. }
            | Self::RedeemForDsc { asset, .. }
            | Self::Liquidate { asset, .. }
            | Self::SetPrice { asset, .. } => Some(asset.as_str()),
            Self::Mint { .. } | Self::Burn { .. } | Self::AdvanceClock { .. } => None,
        }
    }

    /// Engine operation for this step, or `None` for world changes
    pub fn to_operation(&self) -> Option<Operation> {
        let op = match self {
            Self::Deposit { user, asset, amount } => Operation::DepositCollateral(DepositCollateralOp {
                user: user_address(user),
                asset: asset_address(asset),
                amount: *amount,
            }),
            Self::Redeem { user, asset, amount } => Operation::RedeemCollateral(RedeemCollateralOp {
                user: user_address(user),
                asset: asset_address(asset),
                amount: *amount,
            }),
            Self::Mint { user, amount } => Operation::MintDsc(MintDscOp {
                user: user_address(user),
                amount: *amount,
            }),
            Self::Burn { user, amount } => Operation::BurnDsc(BurnDscOp {
                user: user_address(user),
                amount: *amount,
            }),
            Self::DepositAndMint {
                user,
                asset,
                collateral,
                dsc,
            } => Operation::DepositCollateralAndMintDsc(DepositAndMintOp {
                user: user_address(user),
                asset: asset_address(asset),
                collateral_amount: *collateral,
                dsc_amount: *dsc,
            }),
            Self::RedeemForDsc {
                user,
                asset,
                collateral,
                dsc,
            } => Operation::RedeemCollateralForDsc(RedeemForDscOp {
                user: user_address(user),
                asset: asset_address(asset),
                collateral_amount: *collateral,
                dsc_amount: *dsc,
            }),
            Self::Liquidate {
                liquidator,
                asset,
                target,
                debt,
            } => Operation::Liquidate(LiquidateOp {
                liquidator: user_address(liquidator),
                asset: asset_address(asset),
                target: user_address(target),
                debt_to_cover: *debt,
            }),
            Self::SetPrice { .. } | Self::AdvanceClock { .. } => return None,
        };
        Some(op)
    }
}

/// A scripted engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Optional name shown in reports
    #[serde(default)]
    pub name: Option<String>,
    /// Unix time the clock starts at
    #[serde(default = "default_start_time")]
    pub start_time: u64,
    /// Risk parameters
    #[serde(default)]
    pub params: EngineParams,
    /// Approved collateral assets, in registry order
    pub assets: Vec<AssetSpec>,
    /// Initial collateral-token balances
    #[serde(default)]
    pub fundings: Vec<Funding>,
    /// Steps, run in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Deserialization(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse a scenario from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Check the scenario is self-consistent without running it
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        if self.assets.is_empty() {
            return Err(invalid("assets", "at least one collateral asset is required"));
        }
        let mut symbols = BTreeSet::new();
        for spec in &self.assets {
            if !symbols.insert(spec.symbol.as_str()) {
                return Err(Error::DuplicateAsset(asset_address(&spec.symbol)));
            }
            feed_answer(spec.price, &self.params)?;
        }

        let known = |asset: &str| -> Result<()> {
            if symbols.contains(asset) {
                Ok(())
            } else {
                Err(invalid("asset", &format!("unknown asset {}", asset)))
            }
        };
        for funding in &self.fundings {
            known(&funding.asset)?;
        }
        for step in &self.steps {
            if let Some(asset) = step.asset() {
                known(asset)?;
            }
            if let Step::SetPrice { price, .. } = step {
                feed_answer(*price, &self.params)?;
            }
        }
        Ok(())
    }

    /// Every user named anywhere in the scenario, sorted
    pub fn users(&self) -> Vec<String> {
        let mut users: BTreeSet<&str> = self.fundings.iter().map(|f| f.user.as_str()).collect();
        for step in &self.steps {
            users.extend(step.users());
        }
        users.into_iter().map(str::to_string).collect()
    }
}

/// Address a user name maps to
pub fn user_address(name: &str) -> Address {
    Address::from_label(name)
}

/// Address an asset symbol maps to
pub fn asset_address(symbol: &str) -> Address {
    Address::from_label(symbol)
}

/// Address of the price feed for an asset symbol
pub fn feed_address(symbol: &str) -> Address {
    Address::from_label(&format!("{}/USD", symbol))
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidParameter {
        name: name.into(),
        reason: reason.into(),
    }
}

/// Convert an 18-decimal USD price to a raw feed answer
fn feed_answer(price: u128, params: &EngineParams) -> Result<i128> {
    let divisor = 10u128.pow(AMOUNT_DECIMALS - params.feed_decimals);
    let raw = price / divisor;
    if raw == 0 {
        return Err(invalid("price", "price must be positive at feed precision"));
    }
    i128::try_from(raw).map_err(|_| Error::Overflow {
        operation: format!("feed answer for price {}", format_units(price)),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// WORLD
// ═══════════════════════════════════════════════════════════════════════════════

/// An engine wired to in-memory tokens, a mock feed and a manual clock
#[derive(Debug)]
pub struct World {
    engine: DscEngine,
    params: EngineParams,
    tokens: BTreeMap<String, Arc<InMemoryToken>>,
    dsc: Arc<StableToken>,
    prices: Arc<MockPriceFeed>,
    clock: Arc<ManualClock>,
}

impl World {
    /// Build the world described by `scenario` and apply its fundings
    pub fn build(scenario: &Scenario) -> Result<Self> {
        scenario.validate()?;

        let engine_address = Address::from_label("dsc-engine");
        let dsc = Arc::new(StableToken::new(engine_address));
        let prices = Arc::new(MockPriceFeed::new(scenario.params.feed_decimals));
        let clock = Arc::new(ManualClock::new(scenario.start_time));

        let mut tokens = BTreeMap::new();
        let mut collaborators = Collaborators::new(dsc.clone(), prices.clone(), clock.clone());
        for spec in &scenario.assets {
            let token = Arc::new(InMemoryToken::new(spec.symbol.clone()));
            collaborators = collaborators.with_token(asset_address(&spec.symbol), token.clone());
            tokens.insert(spec.symbol.clone(), token);
            prices.set_answer(
                &feed_address(&spec.symbol),
                feed_answer(spec.price, &scenario.params)?,
                scenario.start_time,
            )?;
        }

        let config = EngineConfig::new(
            scenario.assets.iter().map(|a| asset_address(&a.symbol)).collect(),
            scenario.assets.iter().map(|a| feed_address(&a.symbol)).collect(),
            Address::from_label("dsc"),
            engine_address,
        )
        .with_params(scenario.params.clone());
        let engine = DscEngine::new(config, collaborators)?;

        let world = Self {
            engine,
            params: scenario.params.clone(),
            tokens,
            dsc,
            prices,
            clock,
        };
        for funding in &scenario.fundings {
            world
                .token(&funding.asset)?
                .mint_to(&user_address(&funding.user), funding.amount)?;
        }
        Ok(world)
    }

    /// The engine under test
    pub fn engine(&self) -> &DscEngine {
        &self.engine
    }

    /// The synthetic token
    pub fn dsc(&self) -> &StableToken {
        &self.dsc
    }

    /// Collateral token by symbol
    pub fn token(&self, symbol: &str) -> Result<&InMemoryToken> {
        self.tokens
            .get(symbol)
            .map(|t| t.as_ref())
            .ok_or_else(|| Error::TokenNotAllowed(asset_address(symbol)))
    }

    /// Publish `price` (18 decimals) for `symbol`, timestamped now
    pub fn set_price(&self, symbol: &str, price: u128) -> Result<()> {
        self.token(symbol)?;
        let answer = feed_answer(price, &self.params)?;
        self.prices
            .set_answer(&feed_address(symbol), answer, self.clock.now())?;
        Ok(())
    }

    /// Move the clock forward
    pub fn advance_clock(&self, secs: u64) {
        self.clock.advance(secs);
    }

    /// Current scenario time
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Apply one step
    pub fn apply(&self, step: &Step) -> Result<Option<OperationOutcome>> {
        match step {
            Step::SetPrice { asset, price } => {
                self.set_price(asset, *price)?;
                Ok(None)
            }
            Step::AdvanceClock { secs } => {
                self.advance_clock(*secs);
                Ok(None)
            }
            other => match other.to_operation() {
                Some(op) => self.engine.execute(&op).map(Some),
                None => Ok(None),
            },
        }
    }

    /// Snapshot of one user's position and balances
    pub fn account_report(&self, name: &str) -> Result<AccountReport> {
        let user = user_address(name);
        let mut collateral = BTreeMap::new();
        let mut wallet = BTreeMap::new();
        for (symbol, token) in &self.tokens {
            let deposited = self.engine.collateral_balance_of(&user, &asset_address(symbol))?;
            if deposited > 0 {
                collateral.insert(symbol.clone(), format_units(deposited));
            }
            let held = token.balance_of(&user);
            if held > 0 {
                wallet.insert(symbol.clone(), format_units(held));
            }
        }

        let health_factor = match self.engine.health_factor(&user) {
            Ok(hf) => Some(format_health_factor(hf)),
            Err(err) => {
                warn!(user = name, error = %err, "health factor unavailable");
                None
            }
        };

        Ok(AccountReport {
            user: name.to_string(),
            address: user,
            collateral,
            wallet,
            dsc_minted: format_units(self.engine.dsc_minted(&user)?),
            dsc_balance: format_units(self.dsc.balance_of(&user)),
            health_factor,
        })
    }
}

/// Health factor as a decimal string; `inf` when saturated
pub fn format_health_factor(health_factor: u128) -> String {
    if health_factor == u128::MAX {
        "inf".into()
    } else {
        format_units(health_factor)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Position in the scenario (from 1)
    pub index: usize,
    /// Human-readable step
    pub description: String,
    /// Whether the step succeeded
    pub ok: bool,
    /// Error message on failure
    pub error: Option<String>,
    /// Error code on failure
    pub code: Option<u32>,
}

/// Final state of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReport {
    /// User name
    pub user: String,
    /// Derived address
    pub address: Address,
    /// Deposited collateral per asset
    pub collateral: BTreeMap<String, String>,
    /// Collateral tokens held outside the engine
    pub wallet: BTreeMap<String, String>,
    /// Outstanding debt
    pub dsc_minted: String,
    /// DSC held
    pub dsc_balance: String,
    /// Health factor, if prices are fresh
    pub health_factor: Option<String>,
}

/// Outcome of a full scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: Option<String>,
    /// Per-step results
    pub steps: Vec<StepReport>,
    /// Final per-user state
    pub accounts: Vec<AccountReport>,
    /// Liquidation totals
    pub liquidations: LiquidationStats,
    /// Events committed
    pub events: usize,
    /// DSC in circulation
    pub dsc_supply: String,
}

impl ScenarioReport {
    /// Number of failed steps
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the world and run every step; step failures are recorded, not fatal
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let world = World::build(scenario)?;
    info!(
        name = scenario.name.as_deref().unwrap_or("unnamed"),
        steps = scenario.steps.len(),
        "running scenario"
    );

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (i, step) in scenario.steps.iter().enumerate() {
        let description = step.describe();
        let report = match world.apply(step) {
            Ok(_) => StepReport {
                index: i + 1,
                description,
                ok: true,
                error: None,
                code: None,
            },
            Err(err) => {
                info!(step = i + 1, error = %err, "step failed");
                StepReport {
                    index: i + 1,
                    description,
                    ok: false,
                    error: Some(err.to_string()),
                    code: Some(err.code()),
                }
            }
        };
        steps.push(report);
    }

    let accounts = scenario
        .users()
        .iter()
        .map(|name| world.account_report(name))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScenarioReport {
        name: scenario.name.clone(),
        steps,
        accounts,
        liquidations: world.engine().liquidation_stats()?,
        events: world.engine().events()?.len(),
        dsc_supply: format_units(world.dsc().total_supply()),
    })
}
