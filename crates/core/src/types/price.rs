//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog price in the store's single display currency.
///
/// The remote table stores prices as plain numerics with no currency column,
/// so the amount is all we keep. Deserializes from JSON numbers or strings and
/// serializes back out as a JSON number, the shape the table itself returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from whole currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// The raw decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display, e.g. `$19.99` or `$20.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_whole_units() {
        assert_eq!(Price::from_units(20).display(), "$20.00");
        assert_eq!(Price::from_units(4_444_444).to_string(), "$4444444.00");
    }

    #[test]
    fn test_display_rounds_to_cents() {
        let price = Price::new(Decimal::new(19_995, 3)); // 19.995
        assert_eq!(price.display(), "$20.00");

        let price = Price::new(Decimal::new(1999, 2));
        assert_eq!(price.display(), "$19.99");
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_int: Price = serde_json::from_str("33").unwrap();
        assert_eq!(from_int, Price::from_units(33));

        let from_float: Price = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_float.amount(), Decimal::new(125, 1));

        let from_str: Price = serde_json::from_str("\"7.25\"").unwrap();
        assert_eq!(from_str.amount(), Decimal::new(725, 2));
    }

    #[test]
    fn test_serializes_as_json_number() {
        let value = serde_json::to_value(Price::from_units(20)).unwrap();
        assert!(value.is_number());
        assert_eq!(value, serde_json::json!(20.0));

        let value = serde_json::to_value(Price::new(Decimal::new(45, 1))).unwrap();
        assert_eq!(value, serde_json::json!(4.5));
    }
}
