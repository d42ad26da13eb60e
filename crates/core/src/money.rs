use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A signed BRL amount. Negative values are credits/payments,
/// non-negative values are charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).round().to_i64().unwrap_or(0)
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Half of this amount, exact to the tenth of a cent. Used for the
    /// 50/50 split of the Shared bucket.
    pub fn half(self) -> Self {
        Money((self.0 / Decimal::from(2)).round_dp(3))
    }

    /// This amount divided evenly over `n` parts, rounded to the cent.
    /// `n == 0` yields zero.
    pub fn divided_by(self, n: usize) -> Self {
        if n == 0 {
            return Money::zero();
        }
        Money((self.0 / Decimal::from(n as u64)).round_dp(2))
    }

    /// Fraction of `total` this amount represents, in percent.
    pub fn percent_of(self, total: Money) -> f64 {
        if total.0.is_zero() {
            return 0.0;
        }
        (self.0 / total.0).to_f64().unwrap_or(0.0) * 100.0
    }

    /// Brazilian-locale rendering with a decimal comma, e.g. `1234,56`.
    pub fn format_comma(self) -> String {
        format!("{:.2}", self.0).replace('.', ",")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}
