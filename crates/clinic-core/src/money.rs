//! # Money Module
//!
//! Integer-cent money for order totals, payments and stock valuation.
//!
//! ## Where Money Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderLine: unit_price × quantity − discount ──► line_total             │
//! │                                                      │                  │
//! │  Order: Σ line_total ──► total_amount                ▼                  │
//! │         total_amount − amount_paid ──► balance_due                      │
//! │                                                                         │
//! │  Stock: Σ current_quantity × unit_price ──► total stock value           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Floats never touch money. `from_cents` is the only constructor that takes
//! a raw amount. Totals built from client input use the `checked_*`
//! helpers; report-only aggregates use `saturating_*`.
//!
//! ```rust
//! use clinic_core::money::Money;
//!
//! let lens = Money::from_cents(4500);
//! let line = lens.checked_line_total(2, Money::from_cents(1000));
//! assert_eq!(line, Some(Money::from_cents(8000)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// A monetary amount in the smallest currency unit.
///
/// Signed so that refunds and adjustments can be represented, although the
/// order and stock paths only ever produce non-negative values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity. `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Clamps at `i64::MIN`/`i64::MAX` instead of overflowing.
    #[inline]
    pub const fn saturating_multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    #[inline]
    pub const fn saturating_add(&self, other: Money) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Total for one order line: `self × qty − discount`, floored at zero.
    /// `None` when the gross amount does not fit in an `i64`.
    ///
    /// A discount larger than the gross line amount makes the line free, it
    /// never produces a credit.
    ///
    /// ```rust
    /// use clinic_core::money::Money;
    ///
    /// let unit = Money::from_cents(300);
    /// assert_eq!(unit.checked_line_total(3, Money::zero()), Some(Money::from_cents(900)));
    /// assert_eq!(unit.checked_line_total(1, Money::from_cents(500)), Some(Money::zero()));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_line_total(3, Money::zero()), None);
    /// ```
    pub fn checked_line_total(&self, qty: i64, discount: Money) -> Option<Money> {
        let gross = self.checked_multiply_quantity(qty)?;
        if discount >= gross {
            Some(Money::zero())
        } else {
            Some(gross - discount)
        }
    }
}

/// Debug-oriented rendering with two decimals. The dashboard formats
/// currency itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
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
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
