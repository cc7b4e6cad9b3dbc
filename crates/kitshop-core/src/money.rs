//! # Money Module
//!
//! Provides the `Money` type for prices, sale totals and bonus points.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices in the shop are whole tenge (₸). Bonus points are 1:1 tenge.   │
//! │                                                                         │
//! │  Kit price:    10 000 ₸                                                 │
//! │  Quantity:     × 2                                                      │
//! │  Sale total:   20 000 ₸                                                 │
//! │  Accrual 3%:   600 points (floor, never rounded up)                     │
//! │                                                                         │
//! │  Everything is i64 arithmetic. No floats anywhere in the pipeline.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kitshop_core::money::Money;
//! use kitshop_core::types::AccrualRate;
//!
//! let price = Money::from_tenge(10_000);
//! let total = price.multiply_quantity(2);
//! assert_eq!(total.tenge(), 20_000);
//!
//! let bonus = total.accrue(AccrualRate::from_bps(300));
//! assert_eq!(bonus.tenge(), 600);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::AccrualRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole tenge.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction can go negative before validation rejects it
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Newtype serde**: serialized as a plain JSON number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole tenge.
    #[inline]
    pub const fn from_tenge(tenge: i64) -> Self {
        Money(tenge)
    }

    /// Returns the value in whole tenge.
    #[inline]
    pub const fn tenge(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kitshop_core::money::Money;
    ///
    /// let unit_price = Money::from_tenge(4_990);
    /// assert_eq!(unit_price.multiply_quantity(3).tenge(), 14_970);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes the bonus accrued on this amount, rounded down.
    ///
    /// ## Implementation
    /// Integer math: `amount * bps / 10000`. Integer division truncates,
    /// which is `floor` for the non-negative totals a sale can have.
    /// Negative amounts accrue nothing.
    ///
    /// ## Example
    /// ```rust
    /// use kitshop_core::money::Money;
    /// use kitshop_core::types::AccrualRate;
    ///
    /// // 3% of 9 999 ₸ = 299.97 → 299 points
    /// let bonus = Money::from_tenge(9_999).accrue(AccrualRate::from_bps(300));
    /// assert_eq!(bonus.tenge(), 299);
    /// ```
    pub fn accrue(&self, rate: AccrualRate) -> Money {
        if self.0 <= 0 {
            return Money::zero();
        }
        // i128 to keep large totals from overflowing before the division
        let points = (self.0 as i128 * rate.bps() as i128) / 10_000;
        Money::from_tenge(points as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display groups thousands with a space, the way prices are shown in the shop.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{} ₸", sign, grouped)
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
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_tenge(20_000).to_string(), "20 000 ₸");
        assert_eq!(Money::from_tenge(999).to_string(), "999 ₸");
        assert_eq!(Money::from_tenge(1_234_567).to_string(), "1 234 567 ₸");
        assert_eq!(Money::from_tenge(-5_000).to_string(), "-5 000 ₸");
        assert_eq!(Money::zero().to_string(), "0 ₸");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_tenge(1_000);
        let b = Money::from_tenge(500);

        assert_eq!((a + b).tenge(), 1_500);
        assert_eq!((a - b).tenge(), 500);
        assert_eq!((a * 3).tenge(), 3_000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.tenge(), 2_000);
    }

    #[test]
    fn test_accrue_floors() {
        let rate = AccrualRate::from_bps(300);
        assert_eq!(Money::from_tenge(20_000).accrue(rate).tenge(), 600);
        assert_eq!(Money::from_tenge(33).accrue(rate).tenge(), 0);
        assert_eq!(Money::from_tenge(34).accrue(rate).tenge(), 1);
        assert_eq!(Money::from_tenge(12_345).accrue(rate).tenge(), 370);
    }

    #[test]
    fn test_accrue_non_positive_is_zero() {
        let rate = AccrualRate::from_bps(500);
        assert!(Money::zero().accrue(rate).is_zero());
        assert!(Money::from_tenge(-1_000).accrue(rate).is_zero());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_tenge(1).is_positive());
        assert!(Money::from_tenge(-1).is_negative());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Money::from_tenge(600)).unwrap();
        assert_eq!(json, "600");
    }
}
