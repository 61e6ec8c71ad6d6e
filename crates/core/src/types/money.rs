//! Money in integer minor currency units.
//!
//! Prices and order totals are carried as whole cents. Checkout arithmetic is
//! checked so an absurd quantity can never wrap into a small charge.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

/// An amount of money in minor currency units (cents for USD).
///
/// Wraps an `i64` so amounts serialize as plain integers and survive sqlx as
/// `BIGINT`. Display formats as dollars for logs and error messages.
///
/// ```
/// use thimble_core::Cents;
///
/// let price = Cents::new(500);
/// assert_eq!(price.line_total(2), Some(Cents::new(1000)));
/// assert_eq!(price.to_string(), "$5.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create an amount from a raw minor-unit count.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the raw minor-unit count.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Multiply a unit price by a line quantity, `None` on overflow.
    #[must_use]
    pub const fn line_total(&self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked addition, `None` on overflow.
    #[must_use]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Cents {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<Cents> for i64 {
    fn from(amount: Cents) -> Self {
        amount.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Cents {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Cents {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Cents {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        assert_eq!(Cents::new(500).line_total(2), Some(Cents::new(1000)));
        assert_eq!(Cents::new(1200).line_total(1), Some(Cents::new(1200)));
        assert_eq!(Cents::new(0).line_total(100), Some(Cents::ZERO));
    }

    #[test]
    fn test_line_total_overflow() {
        assert_eq!(Cents::new(i64::MAX).line_total(2), None);
    }

    #[test]
    fn test_sum() {
        let total: Cents = [Cents::new(1000), Cents::new(1200)].into_iter().sum();
        assert_eq!(total, Cents::new(2200));
    }

    #[test]
    fn test_display() {
        assert_eq!(Cents::new(500).to_string(), "$5.00");
        assert_eq!(Cents::new(2205).to_string(), "$22.05");
        assert_eq!(Cents::new(7).to_string(), "$0.07");
        assert_eq!(Cents::new(-150).to_string(), "-$1.50");
        assert_eq!(Cents::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_serde_plain_integer() {
        let json = serde_json::to_string(&Cents::new(2200)).unwrap();
        assert_eq!(json, "2200");
        let parsed: Cents = serde_json::from_str("2200").unwrap();
        assert_eq!(parsed, Cents::new(2200));
    }
}
