//! Approved collateral assets and their price feeds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::utils::address::Address;

/// Ordered whitelist of collateral assets, each bound to one price feed.
///
/// Fixed at construction; iteration follows the order the assets were listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistry {
    assets: Vec<Address>,
    feeds: BTreeMap<Address, Address>,
}

impl AssetRegistry {
    /// Build a registry from index-aligned asset and feed lists.
    ///
    /// Fails on length mismatch or when an asset is listed twice.
    pub fn new(token_addresses: &[Address], price_feed_addresses: &[Address]) -> Result<Self> {
        if token_addresses.len() != price_feed_addresses.len() {
            return Err(Error::TokenAddressesAndPriceFeedAddressesMustBeTheSameLength {
                tokens: token_addresses.len(),
                feeds: price_feed_addresses.len(),
            });
        }

        let mut feeds = BTreeMap::new();
        for (asset, feed) in token_addresses.iter().zip(price_feed_addresses) {
            if feeds.insert(*asset, *feed).is_some() {
                return Err(Error::DuplicateAsset(*asset));
            }
        }

        Ok(Self {
            assets: token_addresses.to_vec(),
            feeds,
        })
    }

    /// Assets in registry order
    pub fn assets(&self) -> &[Address] {
        &self.assets
    }

    /// Price feed bound to `asset`, if approved
    pub fn feed_of(&self, asset: &Address) -> Option<Address> {
        self.feeds.get(asset).copied()
    }

    /// Whether `asset` is approved collateral
    pub fn is_allowed(&self, asset: &Address) -> bool {
        self.feeds.contains_key(asset)
    }

    /// Fail with `TokenNotAllowed` unless `asset` is approved
    pub fn ensure_allowed(&self, asset: &Address) -> Result<()> {
        if !self.is_allowed(asset) {
            return Err(Error::TokenNotAllowed(*asset));
        }
        Ok(())
    }

    /// Number of approved assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether no asset is approved
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_registry_keeps_order() {
        let registry = AssetRegistry::new(
            &[addr("wbtc"), addr("weth")],
            &[addr("wbtc-usd"), addr("weth-usd")],
        )
        .unwrap();

        assert_eq!(registry.assets(), &[addr("wbtc"), addr("weth")]);
        assert_eq!(registry.feed_of(&addr("weth")), Some(addr("weth-usd")));
        assert_eq!(registry.len(), 2);
        assert!(registry.is_allowed(&addr("wbtc")));
        assert!(!registry.is_allowed(&addr("doge")));
    }

    #[test]
    fn test_length_mismatch() {
        let result = AssetRegistry::new(&[addr("weth")], &[]);
        assert_eq!(
            result,
            Err(Error::TokenAddressesAndPriceFeedAddressesMustBeTheSameLength { tokens: 1, feeds: 0 })
        );
    }

    #[test]
    fn test_duplicate_asset_rejected() {
        let result = AssetRegistry::new(
            &[addr("weth"), addr("weth")],
            &[addr("feed-a"), addr("feed-b")],
        );
        assert_eq!(result, Err(Error::DuplicateAsset(addr("weth"))));
    }

    #[test]
    fn test_ensure_allowed() {
        let registry = AssetRegistry::new(&[addr("weth")], &[addr("weth-usd")]).unwrap();
        assert!(registry.ensure_allowed(&addr("weth")).is_ok());
        assert_eq!(
            registry.ensure_allowed(&addr("random")),
            Err(Error::TokenNotAllowed(addr("random")))
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = AssetRegistry::new(&[], &[]).unwrap();
        assert!(registry.is_empty());
    }
}
