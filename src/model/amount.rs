//! Amount type for monetary values with three fractional digits.
//!
//! This module provides the `Amount` type which wraps `Decimal` and guarantees that every value
//! lies between `0.001` and `999999.999` and carries at most three decimal places. The sign of a
//! transaction is conveyed by its `TransactionType`, never by a negative amount.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The number of fractional digits an amount carries.
pub const SCALE: u32 = 3;

/// The smallest amount that can be recorded: `0.001`.
pub const MIN: Decimal = Decimal::from_parts(1, 0, 0, false, SCALE);

/// The largest amount that can be recorded: `999999.999`.
pub const MAX: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, SCALE);

/// Represents a non-negative monetary amount.
///
/// # Examples
///
/// Parsing user input rounds to three places and accepts thousands separators:
/// ```
/// # use floos::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str(" 1,234.5 ").unwrap();
/// assert_eq!(amount.to_string(), "1,234.500");
/// assert_eq!(amount.plain(), "1234.500");
/// ```
///
/// Values outside of the allowed range are rejected:
/// ```
/// # use floos::model::Amount;
/// # use std::str::FromStr;
/// assert!(Amount::from_str("0").is_err());
/// assert!(Amount::from_str("1000000").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    /// Always rescaled to `SCALE` fractional digits.
    value: Decimal,
}

impl Amount {
    /// Creates an `Amount` from an exact `Decimal`.
    ///
    /// # Errors
    /// - If `value` has more than three significant fractional digits.
    /// - If `value` is outside of `MIN..=MAX`.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.normalize().scale() > SCALE {
            return Err(AmountError::TooPrecise(value));
        }
        if value < MIN || value > MAX {
            return Err(AmountError::OutOfRange(value));
        }
        let mut value = value;
        value.rescale(SCALE);
        Ok(Self { value })
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// The amount with three decimals and no thousands separators, e.g. `1234.500`.
    pub fn plain(&self) -> String {
        self.value.to_string()
    }

    /// The amount prefixed with a currency symbol, e.g. `OMR 1,234.500`.
    pub fn with_currency(&self, symbol: &str) -> String {
        if symbol.is_empty() {
            self.to_string()
        } else {
            format!("{symbol} {self}")
        }
    }
}

/// An error that can occur when creating or parsing an `Amount`.
#[derive(Debug, Error)]
pub enum AmountError {
    #[error("An amount is required")]
    Empty,

    #[error("'{0}' is not a number")]
    Parse(String, #[source] rust_decimal::Error),

    #[error("The amount must be greater than zero, got {0}")]
    NotPositive(Decimal),

    #[error("The amount {0} has more than 3 decimal places")]
    TooPrecise(Decimal),

    #[error("The amount {0} is outside of the range 0.001 to 999999.999")]
    OutOfRange(Decimal),
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses user input: whitespace and commas are removed, and the number is rounded to three
    /// decimal places before the range is checked.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .collect();

        if cleaned.is_empty() {
            return Err(AmountError::Empty);
        }

        let value =
            Decimal::from_str(&cleaned).map_err(|e| AmountError::Parse(cleaned.clone(), e))?;
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        Amount::new(value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_money(self.value))
    }
}

/// Formats any decimal the way amounts are shown, with three decimals and thousands separators.
/// Unlike an `Amount`, `value` may be zero or negative, e.g. a balance.
pub fn format_money(value: Decimal) -> String {
    format_num::format_num!(",.3f", value.to_f64().unwrap_or_default())
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Backup files carry amounts as plain JSON numbers.
        serializer.serialize_f64(self.value.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a number or numeric string between {MIN} and {MAX}")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        // The shortest round-trip representation of the float is what the writer meant.
        Amount::from_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Amount::new(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Amount::new(Decimal::from(v)).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("50").unwrap();
        assert_eq!(amount.value(), dec("50"));
        assert_eq!(amount.plain(), "50.000");
    }

    #[test]
    fn test_parse_with_commas_and_whitespace() {
        let amount = Amount::from_str(" 12,345.678 ").unwrap();
        assert_eq!(amount.value(), dec("12345.678"));
    }

    #[test]
    fn test_parse_rounds_to_three_places() {
        assert_eq!(Amount::from_str("1.2345").unwrap().value(), dec("1.235"));
        assert_eq!(Amount::from_str("1.2344").unwrap().value(), dec("1.234"));
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(Amount::from_str("0.001").unwrap().value(), MIN);
        assert_eq!(Amount::from_str("999999.999").unwrap().value(), MAX);
        assert!(matches!(
            Amount::from_str("1000000"),
            Err(AmountError::OutOfRange(_))
        ));
        // Rounds down to zero, which is below the minimum.
        assert!(matches!(
            Amount::from_str("0.0004"),
            Err(AmountError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(matches!(
            Amount::from_str("0"),
            Err(AmountError::NotPositive(_))
        ));
        assert!(matches!(
            Amount::from_str("-5"),
            Err(AmountError::NotPositive(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Amount::from_str(""), Err(AmountError::Empty)));
        assert!(matches!(Amount::from_str(" , "), Err(AmountError::Empty)));
        assert!(matches!(
            Amount::from_str("twelve"),
            Err(AmountError::Parse(..))
        ));
    }

    #[test]
    fn test_new_is_exact() {
        assert!(matches!(
            Amount::new(dec("1.2345")),
            Err(AmountError::TooPrecise(_))
        ));
        // Trailing zeros are not significant.
        assert_eq!(Amount::new(dec("1.50000")).unwrap().plain(), "1.500");
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_str("0.5").unwrap().to_string(), "0.500");
        assert_eq!(
            Amount::from_str("999999.999").unwrap().to_string(),
            "999,999.999"
        );
        assert_eq!(
            Amount::from_str("1234").unwrap().with_currency("OMR"),
            "OMR 1,234.000"
        );
        assert_eq!(Amount::from_str("1234").unwrap().with_currency(""), "1,234.000");
    }

    #[test]
    fn test_serialize_as_number() {
        let amount = Amount::from_str("12.5").unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "12.5");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let a: Amount = serde_json::from_str("12.345").unwrap();
        assert_eq!(a.value(), dec("12.345"));
        let b: Amount = serde_json::from_str("7").unwrap();
        assert_eq!(b.value(), dec("7"));
        let c: Amount = serde_json::from_str("\"1,000.25\"").unwrap();
        assert_eq!(c.value(), dec("1000.25"));
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Amount>("0").is_err());
        assert!(serde_json::from_str::<Amount>("-3").is_err());
        assert!(serde_json::from_str::<Amount>("1000000.5").is_err());
        assert!(serde_json::from_str::<Amount>("true").is_err());
    }

    #[test]
    fn test_ordering() {
        let a1 = Amount::from_str("30").unwrap();
        let a2 = Amount::from_str("50").unwrap();
        assert!(a1 < a2);
    }
}
