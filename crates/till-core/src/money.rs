//! # Money Module
//!
//! Provides the `Money` type and the pure helpers every settlement figure
//! flows through: rounding, fees, final totals, proportional scoping and
//! near-equality.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A drawer that sums thousands of sales in f64 drifts, and every        │
//! │  "is it settled?" check needs an epsilon.                              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Amounts are i64 cents. Decimal input is rounded exactly once,       │
//! │    at the boundary, with `Money::from_decimal`.                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::{self, FeeRule, Money};
//!
//! let subtotal = Money::from_decimal(100.0);
//! let service = money::fee_of(subtotal, FeeRule::Percent(1000)); // 10%
//! assert_eq!(service.cents(), 1000);
//!
//! let total = money::final_total(subtotal, service, Money::zero(), Money::from_cents(500));
//! assert_eq!(total.cents(), 10500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Tolerance used for every "is it settled" decision (one cent).
pub const SETTLEMENT_EPSILON: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: withdrawals and shortfalls are negative drawer effects
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No currency tag**: the register runs a single currency
/// - **Saturating operators**: inputs are bounded by `MAX_AMOUNT` at the
///   validation layer; operators saturate instead of wrapping or panicking
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds a decimal amount to currency precision (two places,
    /// half away from zero).
    ///
    /// The scaled value is first snapped to six decimal places so that
    /// representation noise (`1.005 * 100 == 100.49999999999999`) does not
    /// decide the rounding direction. NaN maps to zero; infinities saturate.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(1.005).cents(), 101);
    /// assert_eq!(Money::from_decimal(-2.345).cents(), -235);
    /// assert_eq!(Money::from_decimal(120.0).cents(), 12000);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        let scaled = ((amount * 100.0) * 1_000_000.0).round() / 1_000_000.0;
        Money(scaled.round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal amount (for display and DTOs only).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let line = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Applies a rate in basis points, rounding half away from zero.
    pub fn apply_bps(&self, bps: u32) -> Money {
        Money(clamp_cents(div_round(self.0 as i128 * bps as i128, 10_000)))
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn floor_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

// =============================================================================
// MoneyMath
// =============================================================================

/// How a service fee or cover charge is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FeeRule {
    /// A fixed amount regardless of the base.
    Flat(Money),
    /// A percentage of the base, in basis points (1000 = 10%).
    Percent(u32),
}

impl Default for FeeRule {
    fn default() -> Self {
        FeeRule::Flat(Money::zero())
    }
}

/// Rounds a decimal amount to currency precision. Alias of
/// [`Money::from_decimal`], kept so call sites read like the rule they apply.
#[inline]
pub fn round(amount: f64) -> Money {
    Money::from_decimal(amount)
}

/// Computes a fee over `base`.
///
/// `Flat` returns the flat value; `Percent` returns `round(base * pct)`.
pub fn fee_of(base: Money, rule: FeeRule) -> Money {
    match rule {
        FeeRule::Flat(value) => value,
        FeeRule::Percent(bps) => base.apply_bps(bps),
    }
}

/// `subtotal + service_fee + cover_charge - deduction`, floored at zero.
///
/// `deduction` is the manual discount plus the loyalty points value.
pub fn final_total(
    subtotal: Money,
    service_fee: Money,
    cover_charge: Money,
    deduction: Money,
) -> Money {
    (subtotal + service_fee + cover_charge - deduction).floor_zero()
}

/// Scopes a whole-cart fee onto a part of the cart:
/// `round(whole_fee * partial_base / whole_base)`.
///
/// Returns zero when `whole_base` is zero.
///
/// ```rust
/// use till_core::money::{proportion, Money};
///
/// let fee = proportion(Money::from_cents(1000), Money::from_cents(10000), Money::from_cents(2500));
/// assert_eq!(fee.cents(), 250);
/// assert!(proportion(Money::from_cents(1000), Money::zero(), Money::zero()).is_zero());
/// ```
pub fn proportion(whole_fee: Money, whole_base: Money, partial_base: Money) -> Money {
    if whole_base.is_zero() {
        return Money::zero();
    }
    let numerator = whole_fee.0 as i128 * partial_base.0 as i128;
    Money(clamp_cents(div_round(numerator, whole_base.0 as i128)))
}

/// `|a - b| < epsilon`. All settlement decisions go through this.
#[inline]
pub fn nearly_equal(a: Money, b: Money, epsilon: Money) -> bool {
    (a - b).abs() < epsilon
}

/// Narrows an i128 intermediate back to cents, saturating at the `i64` range.
fn clamp_cents(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        let direction = if (numerator < 0) == (denominator < 0) { 1 } else { -1 };
        quotient + direction
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with two decimals and no currency symbol; the register
/// config owns the symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(10.994).cents(), 1099);
        assert_eq!(Money::from_decimal(10.995).cents(), 1100);
        assert_eq!(Money::from_decimal(0.125).cents(), 13);
        assert_eq!(Money::from_decimal(-0.125).cents(), -13);
        assert_eq!(Money::from_decimal(1.005).cents(), 101);
        assert_eq!(Money::from_decimal(f64::NAN).cents(), 0);
    }

    #[test]
    fn test_round_is_idempotent() {
        for x in [0.0, 0.004, 0.005, 1.005, 2.675, 19.999, -3.335, 1234.5678, -0.015] {
            let once = round(x);
            let twice = round(once.to_decimal());
            assert_eq!(once, twice, "round not idempotent for {}", x);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((b * 4).cents(), 1000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_operators_saturate() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max + Money::from_cents(10), max);
        let min = Money::from_cents(i64::MIN);
        assert_eq!(min - Money::from_cents(1), min);
        assert_eq!(max.multiply_quantity(3), max);
        assert_eq!(-min, max);
        assert_eq!([max, Money::from_cents(10)].iter().sum::<Money>(), max);
        assert_eq!(fee_of(max, FeeRule::Percent(20_000)), max);
    }

    #[test]
    fn test_fee_of() {
        let base = Money::from_cents(12345);
        assert_eq!(fee_of(base, FeeRule::Flat(Money::from_cents(500))).cents(), 500);
        // 10% of 123.45 = 12.345 -> 12.35
        assert_eq!(fee_of(base, FeeRule::Percent(1000)).cents(), 1235);
        assert!(fee_of(base, FeeRule::Percent(0)).is_zero());
    }

    #[test]
    fn test_final_total_floors_at_zero() {
        let total = final_total(
            Money::from_cents(1000),
            Money::from_cents(100),
            Money::from_cents(0),
            Money::from_cents(5000),
        );
        assert!(total.is_zero());

        let total = final_total(
            Money::from_cents(10000),
            Money::from_cents(1000),
            Money::from_cents(500),
            Money::from_cents(1500),
        );
        assert_eq!(total.cents(), 10000);
    }

    #[test]
    fn test_proportion_zero_base() {
        assert!(proportion(Money::from_cents(999), Money::zero(), Money::from_cents(10)).is_zero());
    }

    #[test]
    fn test_proportion_conserves_fee_across_partition() {
        let fee = Money::from_cents(1000);
        let whole = Money::from_cents(3000);
        let parts = [
            Money::from_cents(1000),
            Money::from_cents(1000),
            Money::from_cents(1000),
        ];
        let sum: Money = parts.iter().map(|p| proportion(fee, whole, *p)).sum();
        assert!((sum - fee).abs() <= SETTLEMENT_EPSILON);

        let fee = Money::from_cents(1235);
        let whole = Money::from_cents(12345);
        let parts = [Money::from_cents(4567), Money::from_cents(12345 - 4567)];
        let sum: Money = parts.iter().map(|p| proportion(fee, whole, *p)).sum();
        assert!((sum - fee).abs() <= SETTLEMENT_EPSILON);
    }

    #[test]
    fn test_nearly_equal() {
        let a = Money::from_cents(12000);
        assert!(nearly_equal(a, Money::from_cents(12000), SETTLEMENT_EPSILON));
        assert!(!nearly_equal(a, Money::from_cents(12001), SETTLEMENT_EPSILON));
        assert!(nearly_equal(a, Money::from_cents(12001), Money::from_cents(2)));
    }

    #[test]
    fn test_apply_bps_negative_rounds_away_from_zero() {
        // -0.05 * 50% = -0.025 -> -0.03
        assert_eq!(Money::from_cents(-5).apply_bps(5000).cents(), -3);
    }
}
