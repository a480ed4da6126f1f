//! # Money Module
//!
//! Provides the `Money` type for prices, order totals and discounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices are whole currency units stored as i64.                         │
//! │                                                                         │
//! │  Discounts are percentages rounded DOWN in the customer's disfavour:    │
//! │    discount = floor(total × percent / 100)                              │
//! │    final    = total − discount                                          │
//! │                                                                         │
//! │  total = 333, percent = 10  →  discount = 33, final = 300               │
//! │                                                                         │
//! │  No floats anywhere, so the same cart always prices the same way.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopfront_core::money::Money;
//!
//! let unit = Money::new(100);
//! let line = unit.checked_multiply(3).unwrap();
//! assert_eq!(line.amount(), 300);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use crate::types::DiscountPercent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in whole currency units.
///
/// ## Where Money is Used
/// ```text
/// Product.price ──► PricedLine.subtotal ──► Quote.total_price
///                                               │
///                     DiscountPercent ──────────┤
///                                               ▼
///                                        Quote.final_price
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from a raw amount.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn amount(&self) -> i64 {
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use shopfront_core::money::Money;
    ///
    /// let unit_price = Money::new(299);
    /// assert_eq!(unit_price.checked_multiply(3).unwrap().amount(), 897);
    /// assert!(Money::new(i64::MAX / 2).checked_multiply(3).is_none());
    /// ```
    #[inline]
    pub const fn checked_multiply(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(amount) => Some(Money(amount)),
            None => None,
        }
    }

    /// Returns `floor(self × percent / 100)`, the amount taken off by a discount.
    ///
    /// Computed in i128 so large totals cannot overflow the intermediate product.
    ///
    /// ## Example
    /// ```rust
    /// use shopfront_core::money::Money;
    /// use shopfront_core::types::DiscountPercent;
    ///
    /// let total = Money::new(333);
    /// let pct = DiscountPercent::new(10).unwrap();
    /// assert_eq!(total.discount_amount(pct).amount(), 33);
    /// ```
    pub fn discount_amount(&self, percent: DiscountPercent) -> Money {
        let off = (self.0 as i128 * percent.value() as i128).div_euclid(100);
        Money(off as i64)
    }

    /// Applies a percentage discount: `self − floor(self × percent / 100)`.
    ///
    /// For a non-negative amount the result always satisfies
    /// `0 ≤ result ≤ self`.
    ///
    /// ## Example
    /// ```rust
    /// use shopfront_core::money::Money;
    /// use shopfront_core::types::DiscountPercent;
    ///
    /// let total = Money::new(300);
    /// let pct = DiscountPercent::new(10).unwrap();
    /// assert_eq!(total.apply_discount(pct).amount(), 270);
    /// ```
    pub fn apply_discount(&self, percent: DiscountPercent) -> Money {
        *self - self.discount_amount(percent)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(value: i64) -> DiscountPercent {
        DiscountPercent::new(value).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(1000);
        let b = Money::new(500);

        assert_eq!((a + b).amount(), 1500);
        assert_eq!((a - b).amount(), 500);
        assert_eq!(a.checked_multiply(3), Some(Money::new(3000)));
        assert_eq!(a.checked_add(b), Some(Money::new(1500)));
    }

    #[test]
    fn test_checked_ops_report_overflow() {
        assert_eq!(Money::new(i64::MAX / 2).checked_multiply(3), None);
        assert_eq!(Money::new(i64::MAX).checked_add(Money::new(1)), None);
        assert_eq!(Money::new(i64::MAX).checked_multiply(1), Some(Money::new(i64::MAX)));
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::new(100), Money::new(250), Money::new(5)]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), 355);
    }

    #[test]
    fn test_discount_rounds_down() {
        // 333 × 10% = 33.3 → 33 off
        assert_eq!(Money::new(333).discount_amount(pct(10)).amount(), 33);
        assert_eq!(Money::new(333).apply_discount(pct(10)).amount(), 300);

        // 99 × 15% = 14.85 → 14 off
        assert_eq!(Money::new(99).apply_discount(pct(15)).amount(), 85);
    }

    #[test]
    fn test_discount_bounds() {
        let total = Money::new(1234);
        assert_eq!(total.apply_discount(pct(0)), total);
        assert_eq!(total.apply_discount(pct(100)), Money::zero());

        for p in 0..=100 {
            let final_price = total.apply_discount(pct(p));
            assert!(!final_price.is_negative());
            assert!(final_price <= total);
        }
    }

    #[test]
    fn test_discount_on_large_total_does_not_overflow() {
        let total = Money::new(i64::MAX / 2);
        let final_price = total.apply_discount(pct(50));
        assert!(final_price.amount() > 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::new(270).to_string(), "270");
    }
}
