//! Input validation helpers shared by the engine and the oracle adapter.

use crate::error::{Error, Result};
use crate::utils::address::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is strictly positive
pub fn validate_more_than_zero(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(Error::MustBeMoreThanZero);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that a feed answer is positive and return it unsigned
pub fn validate_price_answer(answer: i128) -> Result<u128> {
    if answer <= 0 {
        return Err(Error::InvalidPrice(answer));
    }
    Ok(answer as u128)
}

/// Validate a reading timestamp against the current time.
///
/// A reading exactly `timeout` seconds old is still fresh. Timestamps in the
/// future are treated as zero seconds old.
pub fn validate_price_freshness(updated_at: u64, now: u64, timeout: u64) -> Result<()> {
    let elapsed = now.saturating_sub(updated_at);
    if elapsed > timeout {
        return Err(Error::StalePrice { elapsed, timeout });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that a configured address is set
pub fn validate_address(address: &Address, name: &str) -> Result<()> {
    if address.is_zero() {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: "address cannot be zero".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::PRICE_TIMEOUT_SECS;

    #[test]
    fn test_validate_more_than_zero() {
        assert!(validate_more_than_zero(1).is_ok());
        assert_eq!(validate_more_than_zero(0), Err(Error::MustBeMoreThanZero));
    }

    #[test]
    fn test_validate_price_answer() {
        assert_eq!(validate_price_answer(2000_0000_0000).unwrap(), 2000_0000_0000);
        assert_eq!(validate_price_answer(0), Err(Error::InvalidPrice(0)));
        assert_eq!(validate_price_answer(-5), Err(Error::InvalidPrice(-5)));
    }

    #[test]
    fn test_validate_price_freshness() {
        let now = 1_000_000;

        // Fresh price (10 seconds old)
        assert!(validate_price_freshness(now - 10, now, PRICE_TIMEOUT_SECS).is_ok());

        // Exactly at the boundary is still fresh
        assert!(validate_price_freshness(now - PRICE_TIMEOUT_SECS, now, PRICE_TIMEOUT_SECS).is_ok());

        // One second past the boundary
        assert_eq!(
            validate_price_freshness(now - PRICE_TIMEOUT_SECS - 1, now, PRICE_TIMEOUT_SECS),
            Err(Error::StalePrice {
                elapsed: PRICE_TIMEOUT_SECS + 1,
                timeout: PRICE_TIMEOUT_SECS
            })
        );

        // Future timestamps count as fresh
        assert!(validate_price_freshness(now + 60, now, PRICE_TIMEOUT_SECS).is_ok());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address(&Address::from_label("dsc"), "dsc_address").is_ok());
        assert!(validate_address(&Address::zero(), "dsc_address").is_err());
    }
}
