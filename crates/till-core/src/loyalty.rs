//! # Loyalty Arithmetic
//!
//! Points earning and redemption rules. The points ledger itself lives in
//! till-db; this module only decides the numbers.
//!
//! ## Earning vs Redeeming
//! ```text
//! gross (subtotal + service + cover) ──► earn_points() ──► credit
//! requested points ──► redeem(balance) ──► clamp ──► discount on total due
//! ```
//!
//! Discounts and redeemed points never reduce the points earned: earning is
//! always computed on the pre-discount gross.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Points program parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoyaltyPolicy {
    /// Points earned per whole currency unit of gross.
    pub points_per_unit: i64,
    /// Discount granted per redeemed point.
    pub point_value: Money,
}

impl Default for LoyaltyPolicy {
    /// One point per unit spent; each point is worth 0.05.
    fn default() -> Self {
        LoyaltyPolicy {
            points_per_unit: 1,
            point_value: Money::from_cents(5),
        }
    }
}

/// Points actually redeemed and the discount they grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Redemption {
    pub points: i64,
    pub discount: Money,
}

impl Redemption {
    /// No points redeemed.
    pub const fn none() -> Self {
        Redemption {
            points: 0,
            discount: Money::zero(),
        }
    }
}

impl LoyaltyPolicy {
    /// Points earned on a gross amount (whole units only, never negative).
    ///
    /// ```rust
    /// use till_core::loyalty::LoyaltyPolicy;
    /// use till_core::Money;
    ///
    /// let policy = LoyaltyPolicy::default();
    /// assert_eq!(policy.earn_points(Money::from_cents(12999)), 129);
    /// ```
    pub fn earn_points(&self, gross: Money) -> i64 {
        if !gross.is_positive() || self.points_per_unit <= 0 {
            return 0;
        }
        gross.units() * self.points_per_unit
    }

    /// Converts requested points into a discount, clamped to `balance`.
    ///
    /// Requesting more than the balance holds is clamped, not rejected;
    /// negative requests redeem nothing. The discount grows monotonically
    /// with the points redeemed.
    pub fn redeem(&self, requested: i64, balance: i64) -> Redemption {
        let points = requested.min(balance).max(0);
        Redemption {
            points,
            discount: self.point_value.multiply_quantity(points),
        }
    }
}

/// Everything the loyalty ledger must apply for one settled sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoyaltyUpdate {
    pub customer_key: String,
    pub customer_name: String,
    /// Points to debit (redeemed in this sale).
    pub points_to_debit: i64,
    /// Pre-discount base the credited points are computed on.
    pub gross_for_points: Money,
    /// Amount actually charged, for the customer's aggregate stats.
    pub sale_total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earn_points() {
        let policy = LoyaltyPolicy {
            points_per_unit: 2,
            point_value: Money::from_cents(10),
        };
        assert_eq!(policy.earn_points(Money::from_cents(1050)), 20);
        assert_eq!(policy.earn_points(Money::zero()), 0);
        assert_eq!(policy.earn_points(Money::from_cents(-500)), 0);
    }

    #[test]
    fn test_redeem_clamps_to_balance() {
        let policy = LoyaltyPolicy::default();

        let r = policy.redeem(500, 120);
        assert_eq!(r.points, 120);
        assert_eq!(r.discount.cents(), 600);

        let r = policy.redeem(40, 120);
        assert_eq!(r.points, 40);
        assert_eq!(r.discount.cents(), 200);

        assert_eq!(policy.redeem(-3, 120), Redemption::none());
        assert_eq!(policy.redeem(10, 0), Redemption::none());
    }

    #[test]
    fn test_redeem_is_monotonic() {
        let policy = LoyaltyPolicy::default();
        let mut last = Money::zero();
        for requested in 0..50 {
            let r = policy.redeem(requested, 30);
            assert!(r.discount >= last);
            last = r.discount;
        }
    }
}
