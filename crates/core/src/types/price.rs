//! Type-safe price representation using decimal arithmetic.
//!
//! The shop sells in Indian Rupees only, so a [`Price`] carries no currency
//! code. Amounts are written as decimal strings so snapshots keep every
//! digit, and are parsed leniently (numbers or numeric strings).

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Currency symbol used for display.
pub const RUPEE: char = '₹';

/// A price in Indian Rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `percent`% of this price.
    #[must_use]
    pub fn percent(&self, percent: u32) -> Self {
        Self(self.0 * Decimal::from(percent) / Decimal::ONE_HUNDRED)
    }

    /// Format for display (e.g., "₹1,23,456.50").
    #[must_use]
    pub fn display(&self) -> String {
        format_inr(self.0)
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

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::str::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Self)
    }
}

/// Format an amount as Indian Rupees with Indian digit grouping.
///
/// The last three integer digits form one group and every group before them
/// has two digits: `1234567.5` becomes `₹12,34,567.50`.
#[must_use]
pub fn format_inr(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 2);
    let head_len = digits.len().saturating_sub(3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && i < head_len && (head_len - i) % 2 == 0 {
            grouped.push(',');
        }
        if i == head_len && head_len > 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{RUPEE}{grouped}.{frac_part}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_small_amounts() {
        assert_eq!(format_inr(d("0")), "₹0.00");
        assert_eq!(format_inr(d("5")), "₹5.00");
        assert_eq!(format_inr(d("999.5")), "₹999.50");
    }

    #[test]
    fn test_format_indian_grouping() {
        assert_eq!(format_inr(d("1000")), "₹1,000.00");
        assert_eq!(format_inr(d("123456.5")), "₹1,23,456.50");
        assert_eq!(format_inr(d("1234567")), "₹12,34,567.00");
        assert_eq!(format_inr(d("123456789.99")), "₹12,34,56,789.99");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_inr(d("10.005")), "₹10.01");
        assert_eq!(format_inr(d("-2500.5")), "-₹2,500.50");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let a: Price = serde_json::from_str("1499.99").unwrap();
        let b: Price = serde_json::from_str("\"1499.99\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"1499.99\"");
    }

    #[test]
    fn test_serialize_keeps_every_digit() {
        let precise = Price::new(d("123456789.123456789123"));
        let json = serde_json::to_string(&precise).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, precise);
    }

    #[test]
    fn test_arithmetic() {
        let unit = Price::new(d("250"));
        let total: Price = [unit * 2, Price::new(d("100"))].into_iter().sum();
        assert_eq!(total.amount(), d("600"));
        assert_eq!(total.percent(10).amount(), d("60"));
    }
}
