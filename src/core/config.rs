//! Engine configuration and parameters.
//!
//! Parameters are fixed at construction. There is no governance path that
//! changes them afterwards:
//! - [`EngineParams`]: numeric risk parameters (defaults match `utils::constants`)
//! - [`EngineConfig`]: the approved collateral list, its price feeds and the
//!   identities of the synthetic token and the engine

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::*;
use crate::utils::validation::validate_address;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Risk parameters of the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Decimals reported by every price feed
    pub feed_decimals: u32,

    /// Share of collateral value counted toward solvency, out of `liquidation_precision`
    pub liquidation_threshold: u128,

    /// Divisor for `liquidation_threshold` and `liquidation_bonus`
    pub liquidation_precision: u128,

    /// Liquidator bonus on seized collateral, out of `liquidation_precision`
    pub liquidation_bonus: u128,

    /// Minimum health factor (1e18 = 1.0)
    pub min_health_factor: u128,

    /// Maximum age of a price reading in seconds
    pub price_timeout_secs: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            feed_decimals: FEED_DECIMALS,
            liquidation_threshold: LIQUIDATION_THRESHOLD,
            liquidation_precision: LIQUIDATION_PRECISION,
            liquidation_bonus: LIQUIDATION_BONUS,
            min_health_factor: MIN_HEALTH_FACTOR,
            price_timeout_secs: PRICE_TIMEOUT_SECS,
        }
    }
}

impl EngineParams {
    /// Multiplier lifting a feed answer to 18 decimals
    pub fn additional_feed_precision(&self) -> u128 {
        10u128.pow(AMOUNT_DECIMALS.saturating_sub(self.feed_decimals))
    }

    /// Override the liquidation threshold (for testing)
    pub fn with_threshold(mut self, threshold: u128) -> Self {
        self.liquidation_threshold = threshold;
        self
    }

    /// Override the price timeout (for testing)
    pub fn with_price_timeout(mut self, secs: u64) -> Self {
        self.price_timeout_secs = secs;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, reason: &str| {
            Err(Error::InvalidParameter {
                name: name.into(),
                reason: reason.into(),
            })
        };

        if self.liquidation_precision == 0 {
            return invalid("liquidation_precision", "cannot be zero");
        }
        if self.liquidation_threshold == 0 || self.liquidation_threshold > self.liquidation_precision {
            return invalid(
                "liquidation_threshold",
                "must be in 1..=liquidation_precision",
            );
        }
        if self.liquidation_bonus >= self.liquidation_precision {
            return invalid("liquidation_bonus", "must be below liquidation_precision");
        }
        if self.feed_decimals > AMOUNT_DECIMALS {
            return invalid("feed_decimals", "cannot exceed 18");
        }
        if self.min_health_factor == 0 {
            return invalid("min_health_factor", "cannot be zero");
        }
        if self.price_timeout_secs == 0 {
            return invalid("price_timeout_secs", "cannot be zero");
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Construction-time configuration of a [`DscEngine`](crate::engine::DscEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Approved collateral assets, in registry order
    pub token_addresses: Vec<Address>,

    /// Price feed for each asset, index-aligned with `token_addresses`
    pub price_feed_addresses: Vec<Address>,

    /// Identity of the synthetic token
    pub dsc_address: Address,

    /// Identity of the engine (custody account, sole minter)
    pub engine_address: Address,

    /// Risk parameters
    #[serde(default)]
    pub params: EngineParams,
}

impl EngineConfig {
    /// Create a configuration with default parameters
    pub fn new(
        token_addresses: Vec<Address>,
        price_feed_addresses: Vec<Address>,
        dsc_address: Address,
        engine_address: Address,
    ) -> Self {
        Self {
            token_addresses,
            price_feed_addresses,
            dsc_address,
            engine_address,
            params: EngineParams::default(),
        }
    }

    /// Replace the risk parameters
    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Deserialization(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Serialization(format!("{}: {}", parent.display(), e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))
    }

    /// Validate configuration.
    ///
    /// Registry shape (length match, duplicates) is checked by
    /// [`AssetRegistry::new`](crate::core::registry::AssetRegistry::new).
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        validate_address(&self.dsc_address, "dsc_address")?;
        validate_address(&self.engine_address, "engine_address")?;
        if self.dsc_address == self.engine_address {
            return Err(Error::InvalidParameter {
                name: "engine_address".into(),
                reason: "must differ from dsc_address".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EngineConfig {
        EngineConfig::new(
            vec![Address::from_label("weth"), Address::from_label("wbtc")],
            vec![
                Address::from_label("weth-usd"),
                Address::from_label("wbtc-usd"),
            ],
            Address::from_label("dsc"),
            Address::from_label("engine"),
        )
    }

    #[test]
    fn test_engine_params_default() {
        let params = EngineParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.additional_feed_precision(), ADDITIONAL_FEED_PRECISION);
        assert_eq!(params.min_health_factor, PRECISION);
    }

    #[test]
    fn test_engine_params_rejects_inconsistent_values() {
        let mut params = EngineParams::default();
        params.liquidation_precision = 0;
        assert!(params.validate().is_err());

        let params = EngineParams::default().with_threshold(101);
        assert!(params.validate().is_err());

        let mut params = EngineParams::default();
        params.liquidation_bonus = 100;
        assert!(params.validate().is_err());

        let mut params = EngineParams::default();
        params.feed_decimals = 19;
        assert!(params.validate().is_err());

        let params = EngineParams::default().with_price_timeout(0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_config_validate() {
        assert!(test_config().validate().is_ok());

        let mut config = test_config();
        config.dsc_address = Address::zero();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.engine_address = config.dsc_address;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.json");

        let config = test_config().with_params(EngineParams::default().with_price_timeout(60));
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_params_default_when_omitted() {
        let json = format!(
            r#"{{"token_addresses":[],"price_feed_addresses":[],"dsc_address":"{}","engine_address":"{}"}}"#,
            Address::from_label("dsc"),
            Address::from_label("engine")
        );
        let config: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.params, EngineParams::default());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }
}
