//! # Money Module
//!
//! Provides the `Money` type for Brazilian Real (BRL) amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The REST API sends prices as JSON numbers: 10.99                      │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ inventory value drifts          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    JSON 10.99 ──► round(10.99 × 100) = 1099 centavos                   │
//! │    All sums happen on i64, formatting happens once at display time     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use estoque_core::money::Money;
//! use estoque_core::i18n::Language;
//!
//! let price = Money::from_cents(123456);
//! assert_eq!(price.format(Language::PtBr), "R$ 1.234,56");
//! assert_eq!(price.format(Language::En), "R$1,234.56");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::format::group_thousands;
use crate::i18n::Language;

/// Currency symbol for the Brazilian Real.
pub const CURRENCY_SYMBOL: &str = "R$";

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos.
///
/// Signed so that refunds and losses can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ```rust
    /// use estoque_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // R$ 10,99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount in reais, as sent over the wire, to Money.
    ///
    /// Rounds half away from zero to the nearest centavo. Use only at the
    /// JSON boundary; arithmetic always stays on integers.
    ///
    /// ```rust
    /// use estoque_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(10.99).cents(), 1099);
    /// assert_eq!(Money::from_decimal(0.125).cents(), 13);
    /// ```
    pub fn from_decimal(reais: f64) -> Self {
        Money((reais * 100.0).round() as i64)
    }

    /// Amount in reais as a float (wire format and spreadsheet cells only).
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ```rust
    /// use estoque_core::money::Money;
    ///
    /// let unit = Money::from_cents(299);
    /// assert_eq!(unit.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Formats the amount for display in the given language.
    ///
    /// ## Output by Language
    /// ```text
    /// pt-BR / es:  R$ 1.234,56    -R$ 5,50
    /// en:          R$1,234.56     -R$5.50
    /// ```
    pub fn format(&self, language: Language) -> String {
        let (thousands, decimal) = language.separators();
        let sign = if self.0 < 0 { "-" } else { "" };
        let space = match language {
            Language::En => "",
            Language::PtBr | Language::Es => " ",
        };
        format!(
            "{sign}{CURRENCY_SYMBOL}{space}{}{decimal}{:02}",
            group_thousands(self.reais().unsigned_abs(), thousands),
            self.cents_part()
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display in the baseline language.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(Language::PtBr))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Wire Format
// =============================================================================

/// Serde adapter for fields the REST API sends as decimal reais.
///
/// ```rust,ignore
/// #[serde(with = "crate::money::as_decimal")]
/// pub price: Money,
/// ```
pub mod as_decimal {
    use super::Money;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.to_decimal())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        f64::deserialize(deserializer).map(Money::from_decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_format_portuguese() {
        assert_eq!(Money::from_cents(1099).format(Language::PtBr), "R$ 10,99");
        assert_eq!(Money::from_cents(0).format(Language::PtBr), "R$ 0,00");
        assert_eq!(
            Money::from_cents(123456789).format(Language::PtBr),
            "R$ 1.234.567,89"
        );
        assert_eq!(Money::from_cents(-550).format(Language::PtBr), "-R$ 5,50");
    }

    #[test]
    fn test_format_english() {
        assert_eq!(Money::from_cents(123456).format(Language::En), "R$1,234.56");
        assert_eq!(Money::from_cents(-1).format(Language::En), "-R$0.01");
    }

    #[test]
    fn test_display_uses_baseline() {
        assert_eq!(format!("{}", Money::from_cents(500)), "R$ 5,00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_decimal_boundary() {
        assert_eq!(Money::from_decimal(19.9).cents(), 1990);
        assert_eq!(Money::from_decimal(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_decimal(-4.5).cents(), -450);
        assert!((Money::from_cents(1099).to_decimal() - 10.99).abs() < f64::EPSILON);
    }

    #[test]
    fn test_as_decimal_serde() {
        #[derive(Serialize, Deserialize)]
        struct Row {
            #[serde(with = "as_decimal")]
            price: Money,
        }

        let row: Row = serde_json::from_str(r#"{"price": 12.5}"#).unwrap();
        assert_eq!(row.price.cents(), 1250);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"price":12.5}"#);
    }
}
