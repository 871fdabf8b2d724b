//! Fixed-point arithmetic for 18-decimal amounts.
//!
//! Every product that can exceed `u128` is carried out in a 256-bit
//! intermediate, then narrowed back with an explicit overflow check.
//! Division always truncates toward zero.

use crate::error::{Error, Result};
use crate::utils::constants::AMOUNT_DECIMALS;

pub use wide::U256;

/// Kept apart from the crate's `Result` alias, which the macro expansion would pick up
#[allow(
    clippy::assign_op_pattern,
    clippy::ptr_offset_with_cast,
    clippy::manual_range_contains
)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer used for intermediate products
        pub struct U256(4);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

fn widened_product(a: u128, b: u128, c: u128, operation: &str) -> Result<U256> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: format!("division by zero in {}", operation),
        });
    }
    Ok(U256::from(a) * U256::from(b) / U256::from(c))
}

/// Computes `(a * b) / c` with a 256-bit intermediate, truncating.
///
/// Fails with [`Error::Overflow`] if the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    let result = widened_product(a, b, c, "mul_div")?;
    if result > U256::from(u128::MAX) {
        return Err(Error::Overflow {
            operation: format!("({} * {}) / {}", a, b, c),
        });
    }
    Ok(result.as_u128())
}

/// Computes `(a * b) / c` like [`mul_div`], clamping to `u128::MAX` instead of failing.
pub fn mul_div_saturating(a: u128, b: u128, c: u128) -> Result<u128> {
    let result = widened_product(a, b, c, "mul_div_saturating")?;
    if result > U256::from(u128::MAX) {
        return Ok(u128::MAX);
    }
    Ok(result.as_u128())
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECIMAL STRINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses a decimal string such as `"12.5"` into an 18-decimal integer.
pub fn parse_units(input: &str) -> Result<u128> {
    let invalid = |reason: &str| Error::InvalidParameter {
        name: "amount".into(),
        reason: format!("{}: {:?}", reason, input),
    };

    let trimmed = input.trim().replace('_', "");
    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed.as_str(), ""),
    };

    if frac.len() > AMOUNT_DECIMALS as usize {
        return Err(invalid("too many decimal places"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("not a decimal number"));
    }

    let scale = 10u128.pow(AMOUNT_DECIMALS);
    let whole_units: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("amount too large"))?
    };
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = AMOUNT_DECIMALS as usize);
        padded.parse().map_err(|_| invalid("not a decimal number"))?
    };

    let scaled = whole_units.checked_mul(scale).ok_or(Error::Overflow {
        operation: format!("parse_units({})", input),
    })?;
    safe_add(scaled, frac_units)
}

/// Formats an 18-decimal integer as a decimal string, trimming trailing zeros.
pub fn format_units(amount: u128) -> String {
    let scale = 10u128.pow(AMOUNT_DECIMALS);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", frac, width = AMOUNT_DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Serde adapter storing 18-decimal amounts as decimal strings (`"12.5"`).
///
/// Use with `#[serde(with = "crate::utils::math::units")]`.
pub mod units {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal string
    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_units(*amount))
    }

    /// Deserialize from a decimal string
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_units(&text).map_err(de::Error::custom)
    }
}
