//! Decimal money amounts.
//!
//! Amounts are kept as [`Decimal`] so sums and products never accumulate
//! binary floating-point error, but they cross the JSON boundary as plain
//! numbers (`350`, `99.9`) because that is what the mini-app client and the
//! POS system both speak.

use std::iter::Sum;
use std::ops::{Add, Mul};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A non-currency-tagged amount in the store's single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount as is.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Whole-unit amount, e.g. `Price::from_units(350)`.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Convert an upstream floating-point amount.
    ///
    /// Returns `None` for NaN and infinities.
    #[must_use]
    pub fn from_f64(amount: f64) -> Option<Self> {
        Decimal::from_f64(amount).map(Self)
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round to two decimal places, halves away from zero.
    #[must_use]
    pub fn round2(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        )
    }

    /// Whether the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, qty: u32) -> Self {
        Self(self.0 * Decimal::from(qty))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_away_from_zero() {
        let p = Price::new(Decimal::new(10_005, 3)).round2();
        assert_eq!(p.to_string(), "10.01");
        let p = Price::new(Decimal::new(199_999, 3)).round2();
        assert_eq!(p, Price::from_units(200));
    }

    #[test]
    fn test_serializes_as_json_number() {
        let json = serde_json::to_value(Price::from_units(350)).unwrap();
        assert!(json.is_number());
        assert_eq!(json.as_f64(), Some(350.0));

        let back: Price = serde_json::from_str("150").unwrap();
        assert_eq!(back, Price::from_units(150));
    }

    #[test]
    fn test_line_arithmetic() {
        let subtotal: Price = [Price::from_units(350) * 2, Price::from_units(150)]
            .into_iter()
            .sum();
        assert_eq!(subtotal, Price::from_units(850));
        assert!(subtotal.is_positive());
        assert!(!Price::ZERO.is_positive());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        assert!(Price::from_f64(f64::NAN).is_none());
        assert!(Price::from_f64(f64::INFINITY).is_none());
    }
}
