//! # Money Module
//!
//! Provides the `Money` type for parking fees and revenue totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Summing a day of parking fees in floats drifts by fractions of a      │
//! │  cent. Revenue dashboards must add up exactly.                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    hourly rate 100.00 = 10_000 cents                                    │
//! │    3 billable hours   = 30_000 cents, always                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use park_core::money::Money;
//!
//! let rate = Money::from_cents(10_000); // 100.00 per hour
//! let fee = rate * 3;                    // 300.00
//! assert_eq!(fee.cents(), 30_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

/// Currency code shown by [`Money`]'s `Display` impl.
pub const CURRENCY: &str = "KES";

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// FeePolicy.hourly_rate ──► FeePolicy::calculate ──► SessionState::Closed.fee
///                                                         │
///                           dashboard revenue ◄── Sum ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use park_core::money::Money;
    ///
    /// let fee = Money::from_cents(10_050);
    /// assert_eq!(fee.cents(), 10_050);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use park_core::money::Money;
    ///
    /// let rate = Money::from_major_minor(100, 0);
    /// assert_eq!(rate.cents(), 10_000);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
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

    /// Multiplies by a unit count, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use park_core::money::Money;
    ///
    /// let rate = Money::from_cents(10_000);
    /// assert_eq!(rate.checked_mul(2), Some(Money::from_cents(20_000)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul(&self, units: i64) -> Option<Self> {
        match self.0.checked_mul(units) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `KES 100.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{} {}.{:02}",
            sign,
            CURRENCY,
            self.major().abs(),
            self.minor_part()
        )
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, units: i64) -> Self {
        Money(self.0 * units)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(10_099);
        assert_eq!(money.cents(), 10_099);
        assert_eq!(money.major(), 100);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(10_000).to_string(), "KES 100.00");
        assert_eq!(Money::from_cents(505).to_string(), "KES 5.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-KES 5.50");
        assert_eq!(Money::zero().to_string(), "KES 0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_sum_of_fees() {
        let fees = vec![
            Money::from_cents(10_000),
            Money::from_cents(20_000),
            Money::zero(),
        ];
        let total: Money = fees.iter().sum();
        assert_eq!(total.cents(), 30_000);

        let empty: Vec<Money> = Vec::new();
        assert!(empty.into_iter().sum::<Money>().is_zero());
    }

    #[test]
    fn test_checked_mul_overflow() {
        assert!(Money::from_cents(i64::MAX / 2 + 1).checked_mul(2).is_none());
        assert_eq!(
            Money::from_cents(250).checked_mul(4),
            Some(Money::from_cents(1000))
        );
    }
}
