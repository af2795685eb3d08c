//! Signed fixed-point amount backed by a 256-bit integer.
//!
//! On-chain values arrive as unsigned 256-bit integers with an implicit scale
//! (USD values at 10^30, funding rates at `FUNDING_RATE_PRECISION`). Derived
//! values such as collateral after fees can go negative, so all arithmetic is
//! carried out on `I256`. Conversion to `rust_decimal` happens only for display.

use alloy_primitives::{Sign, I256, U256};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest scale kept when converting to `rust_decimal` (96-bit mantissa).
const MAX_DISPLAY_SCALE: u32 = 18;

/// Signed fixed-point integer amount.
///
/// Serializes to a JSON string holding the raw integer so no precision is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(I256);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("too many fractional digits in {value} for {decimals} decimals")]
    TooPrecise { value: String, decimals: u32 },
}

impl Amount {
    pub const ZERO: Amount = Amount(I256::ZERO);

    pub fn new(value: I256) -> Self {
        Amount(value)
    }

    /// Interpret an on-chain unsigned word; values above `I256::MAX` saturate.
    pub fn from_raw(value: U256) -> Self {
        Amount(I256::checked_from_sign_and_abs(Sign::Positive, value).unwrap_or(I256::MAX))
    }

    pub fn from_u64(value: u64) -> Self {
        Amount::from_raw(U256::from(value))
    }

    pub fn from_i64(value: i64) -> Self {
        let sign = if value < 0 {
            Sign::Negative
        } else {
            Sign::Positive
        };
        Amount(
            I256::checked_from_sign_and_abs(sign, U256::from(value.unsigned_abs()))
                .unwrap_or(I256::ZERO),
        )
    }

    /// `10^exp` as an amount.
    pub fn exp10(exp: u32) -> Self {
        Amount::from_raw(U256::from(10u64).pow(U256::from(exp)))
    }

    /// Parse a human decimal string ("1500.25") into an amount scaled by `10^decimals`.
    pub fn parse_units(value: &str, decimals: u32) -> Result<Self, AmountParseError> {
        let trimmed = value.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountParseError::Invalid(value.to_string()));
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(AmountParseError::Invalid(value.to_string()));
        }
        if fraction.len() > decimals as usize {
            return Err(AmountParseError::TooPrecise {
                value: value.to_string(),
                decimals,
            });
        }

        let mut combined = String::with_capacity(whole.len() + decimals as usize + 1);
        if negative {
            combined.push('-');
        }
        combined.push_str(if whole.is_empty() { "0" } else { whole });
        combined.push_str(fraction);
        for _ in fraction.len()..decimals as usize {
            combined.push('0');
        }

        I256::from_dec_str(&combined)
            .map(Amount)
            .map_err(|_| AmountParseError::Invalid(value.to_string()))
    }

    /// Get the underlying signed integer.
    pub fn inner(&self) -> I256 {
        self.0
    }

    /// Absolute value as an unsigned word.
    pub fn unsigned_abs(&self) -> U256 {
        self.0.unsigned_abs()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Self {
        Amount(self.0.abs())
    }

    /// Integer division, `None` on a zero divisor.
    pub fn checked_div(&self, rhs: Amount) -> Option<Amount> {
        if rhs.is_zero() {
            return None;
        }
        self.0.checked_div(rhs.0).map(Amount)
    }

    /// Convert to a `rust_decimal::Decimal`, treating the value as scaled by `10^decimals`.
    ///
    /// Digits beyond 18 decimal places are truncated. Values too large for the
    /// 96-bit mantissa lose further fractional digits until they fit.
    pub fn to_decimal(&self, decimals: u32) -> Decimal {
        let ten = I256::from_raw(U256::from(10u64));
        let mut value = self.0;
        let mut scale = decimals;
        if scale > MAX_DISPLAY_SCALE {
            value = value / Amount::exp10(scale - MAX_DISPLAY_SCALE).0;
            scale = MAX_DISPLAY_SCALE;
        }

        loop {
            if let Ok(mantissa) = value.to_string().parse::<i128>() {
                if let Ok(d) = Decimal::try_from_i128_with_scale(mantissa, scale) {
                    return d;
                }
            }
            if scale == 0 {
                return if value.is_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                };
            }
            value = value / ten;
            scale -= 1;
        }
    }

    /// Format with a fixed number of decimals, truncating, optionally with thousands separators.
    pub fn format_units(&self, decimals: u32, display_decimals: u32, use_commas: bool) -> String {
        let d = self
            .to_decimal(decimals)
            .round_dp_with_strategy(display_decimals, RoundingStrategy::ToZero);
        let text = format!("{:.*}", display_decimals as usize, d);
        if use_commas {
            with_thousands_separators(&text)
        } else {
            text
        }
    }
}

fn with_thousands_separators(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::ZERO
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    /// Parses a raw integer: decimal, or `0x`-prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex_digits) = s.strip_prefix("0x") {
            return U256::from_str_radix(hex_digits, 16)
                .map(Amount::from_raw)
                .map_err(|_| AmountParseError::Invalid(s.to_string()));
        }
        I256::from_dec_str(s)
            .map(Amount)
            .map_err(|_| AmountParseError::Invalid(s.to_string()))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Amount::from_raw(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Int(i64),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Text(s) => Amount::from_str(&s).map_err(serde::de::Error::custom),
            Wire::Int(v) => Ok(Amount::from_i64(v)),
        }
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Amount {
    type Output = Amount;

    fn mul(self, rhs: Amount) -> Amount {
        Amount(self.0 * rhs.0)
    }
}

/// Truncating integer division. Panics on a zero divisor; use `checked_div` when
/// the divisor can be zero.
impl std::ops::Div for Amount {
    type Output = Amount;

    fn div(self, rhs: Amount) -> Amount {
        Amount(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_scales_value() {
        let a = Amount::parse_units("1500.25", 4).unwrap();
        assert_eq!(a, Amount::from_u64(15_002_500));

        let b = Amount::parse_units("-2", 2).unwrap();
        assert_eq!(b, Amount::from_i64(-200));

        let c = Amount::parse_units(".5", 1).unwrap();
        assert_eq!(c, Amount::from_u64(5));
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(matches!(
            Amount::parse_units("12a", 2),
            Err(AmountParseError::Invalid(_))
        ));
        assert!(matches!(
            Amount::parse_units("1.234", 2),
            Err(AmountParseError::TooPrecise { .. })
        ));
    }

    #[test]
    fn test_from_str_decimal_and_hex() {
        assert_eq!(Amount::from_str("255").unwrap(), Amount::from_u64(255));
        assert_eq!(Amount::from_str("0xff").unwrap(), Amount::from_u64(255));
        assert_eq!(Amount::from_str("-7").unwrap(), Amount::from_i64(-7));
        assert!(Amount::from_str("nope").is_err());
    }

    #[test]
    fn test_from_raw_saturates() {
        assert_eq!(Amount::from_raw(U256::MAX).inner(), I256::MAX);
    }

    #[test]
    fn test_arithmetic() {
        let a = Amount::from_u64(10);
        let b = Amount::from_u64(4);
        assert_eq!(a + b, Amount::from_u64(14));
        assert_eq!(b - a, Amount::from_i64(-6));
        assert_eq!(a * b, Amount::from_u64(40));
        assert_eq!(a / b, Amount::from_u64(2));
        assert_eq!(-a, Amount::from_i64(-10));
        assert_eq!((b - a).abs(), Amount::from_u64(6));
        assert_eq!(a.checked_div(Amount::ZERO), None);
    }

    #[test]
    fn test_to_decimal_usd_scale() {
        let usd = Amount::parse_units("1234.5678", 30).unwrap();
        assert_eq!(usd.to_decimal(30), Decimal::from_str("1234.5678").unwrap());
    }

    #[test]
    fn test_format_units_truncates_and_groups() {
        let usd = Amount::parse_units("1234567.899", 30).unwrap();
        assert_eq!(usd.format_units(30, 2, true), "1,234,567.89");
        assert_eq!(usd.format_units(30, 2, false), "1234567.89");

        let negative = Amount::parse_units("-1000", 30).unwrap();
        assert_eq!(negative.format_units(30, 2, true), "-1,000.00");

        let small = Amount::from_u64(5);
        assert_eq!(small.format_units(2, 2, true), "0.05");
    }

    #[test]
    fn test_json_is_string() {
        let a = Amount::from_i64(-42);
        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json, serde_json::json!("-42"));

        let back: Amount = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);

        let from_number: Amount = serde_json::from_str("17").unwrap();
        assert_eq!(from_number, Amount::from_u64(17));
    }
}
