//! # Decimal Money
//!
//! Monetary amounts as a `rust_decimal::Decimal` newtype. The compound
//! sells in Egyptian pounds but quotes some corporate buyers in USD, so a
//! currency label is carried alongside plans; the label is never converted.
//!
//! ## Rounding Invariant
//!
//! Every amount that reaches a schedule, a total, or a document binding is
//! rounded half-even (banker's rounding) to two decimal places. Interior
//! present-value math keeps full 128-bit precision and rounds once at the
//! end, so totals never drift from sum-of-parts by more than 0.01.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Currency label carried on plans and documents. Never converted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Egyptian pound, the default sales currency.
    #[default]
    EGP,
    USD,
    EUR,
    SAR,
    AED,
    /// Any other ISO 4217 code, carried verbatim.
    Other(String),
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EGP => f.write_str("EGP"),
            Self::USD => f.write_str("USD"),
            Self::EUR => f.write_str("EUR"),
            Self::SAR => f.write_str("SAR"),
            Self::AED => f.write_str("AED"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// A monetary amount with decimal (not floating) arithmetic.
///
/// Wraps `Decimal` to prevent accidental `f64` usage on user-visible
/// amounts. Construction from floats is deliberately not provided.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wrap a raw decimal amount.
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Construct from an integer count of minor units (piastres / cents).
    pub fn from_minor_units(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// Construct from a whole number of major units.
    pub fn from_major(major: i64) -> Self {
        Self(Decimal::from(major))
    }

    /// The raw decimal value, full precision.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Round half-even to two decimal places. This is the only rounding
    /// mode the back-office uses on amounts.
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// The amount in minor units after rounding.
    pub fn to_minor_units(&self) -> i64 {
        let scaled = self.rounded().0 * dec!(100);
        scaled.trunc().try_into().unwrap_or(i64::MAX)
    }

    /// `pct` percent of this amount (`pct` = 20 means twenty percent).
    pub fn percent_of(&self, pct: Decimal) -> Self {
        Self(self.0 * pct / dec!(100))
    }

    /// Divide into `n` parts, returning the per-part amount rounded to
    /// two decimals. The caller gives the final part the remainder so the
    /// parts sum back exactly; see [`Money::split_remainder`].
    pub fn divided_by(&self, n: u32) -> Result<Self, DomainError> {
        if n == 0 {
            return Err(DomainError::validation(
                "divisor",
                "cannot divide an amount into zero parts",
            ));
        }
        Ok(Self(self.0 / Decimal::from(n)).rounded())
    }

    /// The final part of an `n`-way split: whatever is left after
    /// `n - 1` parts of `per_part` have been taken. Absorbs rounding so
    /// that `per_part * (n - 1) + remainder == self` exactly.
    pub fn split_remainder(&self, per_part: Money, n: u32) -> Self {
        if n == 0 {
            return *self;
        }
        Self(self.0 - per_part.0 * Decimal::from(n - 1)).rounded()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;
    fn mul(self, rhs: Decimal) -> Money {
        Money(self.0 * rhs)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;
    fn div(self, rhs: Decimal) -> Money {
        Money(self.0 / rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money(d)
    }
}
