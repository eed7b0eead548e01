//! Price handling using decimal arithmetic.
//!
//! The backend is not consistent about prices: dishes usually carry a JSON
//! number, variants sometimes carry a numeric string, and half-configured
//! menu entries carry `null` or free text. [`lenient_amount`] turns all of
//! these into `Option<Decimal>` once, at the deserialization boundary.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the restaurant's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this amount can be charged for (strictly positive).
    #[must_use]
    pub fn is_chargeable(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Serde adapter for price fields that may be a number, a numeric string,
/// `null`, or garbage.
///
/// Anything that is not a finite decimal deserializes to `None`; it never
/// fails the surrounding record.
///
/// ```rust
/// use rust_decimal::Decimal;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Row {
///     #[serde(default, with = "tableside_core::lenient_amount")]
///     price: Option<Decimal>,
/// }
///
/// let row: Row = serde_json::from_str(r#"{"price": "12.50"}"#).unwrap();
/// assert_eq!(row.price, Some(Decimal::new(1250, 2)));
///
/// let row: Row = serde_json::from_str(r#"{"price": "ask the chef"}"#).unwrap();
/// assert_eq!(row.price, None);
/// ```
pub mod lenient_amount {
    use super::{Decimal, FromStr};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Deserialize a lenient price.
    ///
    /// # Errors
    ///
    /// Only fails when the underlying deserializer cannot produce a JSON value.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(parse_value(&value))
    }

    /// Serialize a lenient price as a plain decimal (or `null`).
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub(super) fn parse_value(value: &serde_json::Value) -> Option<Decimal> {
        match value {
            serde_json::Value::Number(n) => parse_text(&n.to_string()),
            serde_json::Value::String(s) => parse_text(s),
            _ => None,
        }
    }

    fn parse_text(text: &str) -> Option<Decimal> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
    }
}
