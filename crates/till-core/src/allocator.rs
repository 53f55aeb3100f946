//! # Payment Allocator
//!
//! Decides whether a set of tenders covers the amount due, and how much
//! change the cash drawer returns.
//!
//! ## Settlement Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  total_due = final_total(subtotal, service, cover, discount + points)   │
//! │  balance   = Σ tendered − total_due                                     │
//! │                                                                         │
//! │  balance ≈ 0                          ──► Settled, change 0             │
//! │  balance > 0, cash covers the surplus ──► Change(balance)               │
//! │  balance > 0, surplus above the cash  ──► NoDigitalChange               │
//! │  balance < 0                          ──► Underpayment                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card and Pix tenders are charged on external terminals for the exact
//! amount typed in, so change can only come out of the cash tender.
//!
//! ## Partial Settlement
//! When only some cart lines are paid, the service fee and cover charge are
//! narrowed with [`scope_charges`] before they reach the allocator; the
//! allocator itself only ever sees already-scoped figures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{final_total, nearly_equal, proportion, Money, SETTLEMENT_EPSILON};
use crate::types::{MethodAmount, PaymentMethod};
use crate::validation::validate_amount;

/// Figures of a checkout about to be paid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementRequest {
    pub subtotal: Money,
    pub service_fee: Money,
    pub cover_charge: Money,
    /// Manual discount.
    pub discount: Money,
    /// Discount granted by redeemed loyalty points.
    pub points_discount: Money,
    /// Amount typed in per tender.
    pub tendered: BTreeMap<PaymentMethod, Money>,
}

impl SettlementRequest {
    /// Amount due after fees and deductions, never negative.
    pub fn total_due(&self) -> Money {
        final_total(
            self.subtotal,
            self.service_fee,
            self.cover_charge,
            self.discount + self.points_discount,
        )
    }

    /// Sum of all tenders.
    pub fn tendered_sum(&self) -> Money {
        self.tendered.values().copied().sum()
    }

    /// Cash tender (zero when absent).
    pub fn cash_tendered(&self) -> Money {
        self.tendered
            .get(&PaymentMethod::Cash)
            .copied()
            .unwrap_or_default()
    }
}

/// A finalized settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub total_due: Money,
    pub tendered_sum: Money,
    /// `tendered_sum - total_due`.
    pub balance: Money,
    pub change_amount: Money,
    /// Non-zero tenders, in method order.
    pub methods: Vec<MethodAmount>,
}

/// Live status of a tender screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", content = "amount", rename_all = "snake_case")]
pub enum BalanceStatus {
    /// Tenders match the amount due.
    Settled,
    /// Surplus returned from the cash tender.
    Change(Money),
    /// Amount still missing.
    Shortfall(Money),
    /// Surplus that cash cannot cover.
    DigitalOverpayment(Money),
}

impl BalanceStatus {
    /// Whether a settlement with this status can be finalized.
    pub fn is_payable(&self) -> bool {
        matches!(self, BalanceStatus::Settled | BalanceStatus::Change(_))
    }
}

/// Validates tender coverage. Stateless.
pub struct PaymentAllocator;

impl PaymentAllocator {
    /// Classifies the current tenders without failing.
    ///
    /// Negative tenders are not checked here; [`allocate`](Self::allocate)
    /// rejects them.
    pub fn evaluate(request: &SettlementRequest) -> BalanceStatus {
        let balance = request.tendered_sum() - request.total_due();

        if nearly_equal(balance, Money::zero(), SETTLEMENT_EPSILON) {
            return BalanceStatus::Settled;
        }
        if balance.is_negative() {
            return BalanceStatus::Shortfall(-balance);
        }

        let cash = request.cash_tendered();
        if cash.is_positive() && balance <= cash {
            BalanceStatus::Change(balance)
        } else {
            BalanceStatus::DigitalOverpayment(balance)
        }
    }

    /// Finalizes a settlement.
    ///
    /// ## Errors
    /// - `Validation` if a tender or a charge is negative or above `MAX_AMOUNT`
    /// - `Underpayment` if the tenders fall short of the amount due
    /// - `NoDigitalChange` if the surplus is not covered by the cash tender
    ///
    /// ## Example
    /// ```rust
    /// use till_core::allocator::{PaymentAllocator, SettlementRequest};
    /// use till_core::{Money, PaymentMethod};
    ///
    /// let mut request = SettlementRequest {
    ///     subtotal: Money::from_cents(12000),
    ///     ..Default::default()
    /// };
    /// request.tendered.insert(PaymentMethod::Cash, Money::from_cents(15000));
    ///
    /// let settlement = PaymentAllocator::allocate(&request).unwrap();
    /// assert_eq!(settlement.change_amount.cents(), 3000);
    /// ```
    pub fn allocate(request: &SettlementRequest) -> CoreResult<Settlement> {
        for (method, amount) in &request.tendered {
            validate_amount(&format!("{:?} tender", method).to_lowercase(), *amount)?;
        }
        validate_amount("subtotal", request.subtotal)?;
        validate_amount("service fee", request.service_fee)?;
        validate_amount("cover charge", request.cover_charge)?;
        validate_amount("discount", request.discount)?;
        validate_amount("points discount", request.points_discount)?;

        let total_due = request.total_due();
        let tendered_sum = request.tendered_sum();
        let balance = tendered_sum - total_due;

        let change_amount = match Self::evaluate(request) {
            BalanceStatus::Settled => Money::zero(),
            BalanceStatus::Change(change) => change,
            BalanceStatus::Shortfall(shortfall) => {
                return Err(CoreError::Underpayment {
                    due: total_due,
                    tendered: tendered_sum,
                    shortfall,
                })
            }
            BalanceStatus::DigitalOverpayment(surplus) => {
                return Err(CoreError::NoDigitalChange {
                    surplus,
                    cash_tendered: request.cash_tendered(),
                })
            }
        };

        let methods = request
            .tendered
            .iter()
            .filter(|(_, amount)| amount.is_positive())
            .map(|(&method, &amount)| MethodAmount::new(method, amount))
            .collect();

        Ok(Settlement {
            total_due,
            tendered_sum,
            balance,
            change_amount,
            methods,
        })
    }
}

/// Service fee and cover charge narrowed to a selection of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScopedCharges {
    pub subtotal: Money,
    pub service_fee: Money,
    pub cover_charge: Money,
}

/// Narrows whole-cart charges onto the selected lines' subtotal.
///
/// ## Errors
/// `Validation` if any base is negative or the selection exceeds the cart.
pub fn scope_charges(
    full_service_fee: Money,
    full_cover_charge: Money,
    full_subtotal: Money,
    selected_subtotal: Money,
) -> CoreResult<ScopedCharges> {
    validate_amount("service fee", full_service_fee)?;
    validate_amount("cover charge", full_cover_charge)?;
    validate_amount("subtotal", full_subtotal)?;
    validate_amount("selected subtotal", selected_subtotal)?;
    if selected_subtotal > full_subtotal {
        return Err(ValidationError::rule("selected lines exceed the cart subtotal").into());
    }

    Ok(ScopedCharges {
        subtotal: selected_subtotal,
        service_fee: proportion(full_service_fee, full_subtotal, selected_subtotal),
        cover_charge: proportion(full_cover_charge, full_subtotal, selected_subtotal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn request(subtotal: i64, tenders: &[(PaymentMethod, i64)]) -> SettlementRequest {
        SettlementRequest {
            subtotal: cents(subtotal),
            tendered: tenders.iter().map(|&(m, c)| (m, cents(c))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cash_overpayment_returns_change() {
        let req = request(12000, &[(PaymentMethod::Cash, 15000)]);
        let settlement = PaymentAllocator::allocate(&req).unwrap();

        assert_eq!(settlement.total_due.cents(), 12000);
        assert_eq!(settlement.change_amount.cents(), 3000);
        assert_eq!(
            settlement.methods,
            vec![MethodAmount::new(PaymentMethod::Cash, cents(15000))]
        );
    }

    #[test]
    fn test_card_overpayment_is_rejected() {
        let req = request(12000, &[(PaymentMethod::Credit, 13000)]);
        let err = PaymentAllocator::allocate(&req).unwrap_err();

        match err {
            CoreError::NoDigitalChange {
                surplus,
                cash_tendered,
            } => {
                assert_eq!(surplus.cents(), 1000);
                assert!(cash_tendered.is_zero());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_surplus_above_cash_is_rejected() {
        let req = request(
            12000,
            &[(PaymentMethod::Cash, 500), (PaymentMethod::Debit, 13000)],
        );
        assert!(matches!(
            PaymentAllocator::allocate(&req),
            Err(CoreError::NoDigitalChange { .. })
        ));
    }

    #[test]
    fn test_split_with_cash_change() {
        let req = request(
            12000,
            &[(PaymentMethod::Pix, 10000), (PaymentMethod::Cash, 5000)],
        );
        let settlement = PaymentAllocator::allocate(&req).unwrap();
        assert_eq!(settlement.change_amount.cents(), 3000);
        assert_eq!(settlement.methods.len(), 2);
    }

    #[test]
    fn test_underpayment() {
        let req = request(12000, &[(PaymentMethod::Debit, 11999)]);
        assert!(matches!(
            PaymentAllocator::allocate(&req),
            Err(CoreError::Underpayment { shortfall, .. }) if shortfall.cents() == 1
        ));
    }

    #[test]
    fn test_exact_payment_drops_zero_tenders() {
        let req = request(
            12000,
            &[(PaymentMethod::Credit, 12000), (PaymentMethod::Cash, 0)],
        );
        let settlement = PaymentAllocator::allocate(&req).unwrap();
        assert!(settlement.change_amount.is_zero());
        assert_eq!(settlement.methods.len(), 1);
    }

    #[test]
    fn test_negative_tender_is_validation_error() {
        let req = request(
            1000,
            &[(PaymentMethod::Cash, -500), (PaymentMethod::Pix, 1500)],
        );
        assert!(matches!(
            PaymentAllocator::allocate(&req),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_huge_tender_is_validation_error() {
        let req = request(
            1000,
            &[(PaymentMethod::Cash, i64::MAX), (PaymentMethod::Pix, 10)],
        );
        assert!(matches!(
            PaymentAllocator::allocate(&req),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        // The live status never panics either
        assert!(PaymentAllocator::evaluate(&req).is_payable());
    }

    #[test]
    fn test_deductions_floor_total_at_zero() {
        let mut req = request(1000, &[]);
        req.discount = cents(400);
        req.points_discount = cents(900);

        let settlement = PaymentAllocator::allocate(&req).unwrap();
        assert!(settlement.total_due.is_zero());
        assert!(settlement.methods.is_empty());
    }

    #[test]
    fn test_evaluate_statuses() {
        assert_eq!(
            PaymentAllocator::evaluate(&request(1000, &[(PaymentMethod::Pix, 1000)])),
            BalanceStatus::Settled
        );
        assert_eq!(
            PaymentAllocator::evaluate(&request(1000, &[(PaymentMethod::Pix, 600)])),
            BalanceStatus::Shortfall(cents(400))
        );
        assert_eq!(
            PaymentAllocator::evaluate(&request(1000, &[(PaymentMethod::Cash, 1001)])),
            BalanceStatus::Change(cents(1))
        );
        let status = PaymentAllocator::evaluate(&request(1000, &[(PaymentMethod::Pix, 1200)]));
        assert_eq!(status, BalanceStatus::DigitalOverpayment(cents(200)));
        assert!(!status.is_payable());
    }

    #[test]
    fn test_scope_charges() {
        let scoped = scope_charges(cents(1000), cents(600), cents(10000), cents(2500)).unwrap();
        assert_eq!(scoped.subtotal.cents(), 2500);
        assert_eq!(scoped.service_fee.cents(), 250);
        assert_eq!(scoped.cover_charge.cents(), 150);

        assert!(scope_charges(cents(1000), cents(0), cents(100), cents(200)).is_err());
        assert!(scope_charges(cents(-1), cents(0), cents(100), cents(50)).is_err());
    }

    #[test]
    fn test_scope_charges_on_empty_cart() {
        let scoped = scope_charges(cents(1000), cents(600), Money::zero(), Money::zero()).unwrap();
        assert!(scoped.service_fee.is_zero());
        assert!(scoped.cover_charge.is_zero());
    }
}
