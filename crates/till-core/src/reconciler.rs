//! # Closure Reconciler
//!
//! Close-of-shift cash count: compares what the operator counted with what
//! the ledger says should be in the drawer, writes the adjustments, then
//! closes the ledger.
//!
//! ## Closure Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ledger.cash_in_drawer() ──┐                                            │
//! │  final_withdrawal ─────────┼──► reconcile() ──► ClosureReport           │
//! │  counted_cash ─────────────┘                        │                   │
//! │                                                     ▼                   │
//! │                          confirm() ──► 0..2 adjustments ──► close()    │
//! │                                                                         │
//! │  expected   = max(0, balance − final_withdrawal)                        │
//! │  difference = counted − expected                                        │
//! │  < −0.01 Shortage │ > +0.01 Surplus │ otherwise Ok                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every adjustment is prepared before the first one is written, so a
//! rejected adjustment leaves the ledger untouched.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger::{CashierLedger, ClosedShift, TransactionMeta};
use crate::money::{Money, SETTLEMENT_EPSILON};
use crate::types::{ClosureAudit, ClosureStatus, MethodAmount, PaymentMethod, TransactionKind};
use crate::validation::validate_amount;

/// Description of the withdrawal that empties the drawer at close.
pub const FINAL_WITHDRAWAL_DESCRIPTION: &str = "final withdrawal";
/// Description of the withdrawal that books a shortage.
pub const SHORTFALL_DESCRIPTION: &str = "cash shortfall";
/// Description of the deposit that books a surplus.
pub const OVERAGE_DESCRIPTION: &str = "cash overage";

/// Operator input at close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosureInput {
    /// Drawer balance according to the ledger.
    pub current_system_balance: Money,
    /// Cash taken out before counting (bank run).
    pub final_withdrawal: Money,
    /// Cash physically counted.
    pub counted_cash: Money,
}

/// Result of reconciling one closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosureReport {
    pub expected_cash: Money,
    /// `counted_cash - expected_cash`.
    pub difference: Money,
    pub status: ClosureStatus,
    pub final_withdrawal: Money,
    pub counted_cash: Money,
}

/// A ledger movement the closure must write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: &'static str,
}

impl ClosureReport {
    /// Audit snapshot handed to the ledger at close.
    pub fn audit(&self) -> ClosureAudit {
        ClosureAudit {
            final_real_value: self.counted_cash,
            expected_cash: self.expected_cash,
            difference: self.difference,
            status: self.status,
        }
    }

    /// Adjustments to write, in order: final withdrawal, then the
    /// discrepancy booking.
    pub fn adjustments(&self) -> Vec<Adjustment> {
        let mut out = Vec::with_capacity(2);

        if self.final_withdrawal.is_positive() {
            out.push(Adjustment {
                kind: TransactionKind::Withdrawal,
                amount: self.final_withdrawal,
                description: FINAL_WITHDRAWAL_DESCRIPTION,
            });
        }

        match self.status {
            ClosureStatus::Shortage => out.push(Adjustment {
                kind: TransactionKind::Withdrawal,
                amount: self.difference.abs(),
                description: SHORTFALL_DESCRIPTION,
            }),
            ClosureStatus::Surplus => out.push(Adjustment {
                kind: TransactionKind::Deposit,
                amount: self.difference,
                description: OVERAGE_DESCRIPTION,
            }),
            ClosureStatus::Ok => {}
        }

        out
    }
}

/// Classifies a counted-minus-expected difference with a one-cent tolerance.
pub fn classify(difference: Money) -> ClosureStatus {
    if difference < -SETTLEMENT_EPSILON {
        ClosureStatus::Shortage
    } else if difference > SETTLEMENT_EPSILON {
        ClosureStatus::Surplus
    } else {
        ClosureStatus::Ok
    }
}

/// Stateless closure logic.
pub struct ClosureReconciler;

impl ClosureReconciler {
    /// Computes the expected cash, the difference and its classification.
    ///
    /// ## Errors
    /// `Validation` if the final withdrawal or the counted cash is negative.
    pub fn reconcile(input: &ClosureInput) -> CoreResult<ClosureReport> {
        validate_amount("final withdrawal", input.final_withdrawal)?;
        validate_amount("counted cash", input.counted_cash)?;

        let expected_cash = (input.current_system_balance - input.final_withdrawal).floor_zero();
        let difference = input.counted_cash - expected_cash;

        Ok(ClosureReport {
            expected_cash,
            difference,
            status: classify(difference),
            final_withdrawal: input.final_withdrawal,
            counted_cash: input.counted_cash,
        })
    }

    /// Writes the report's adjustments and closes the ledger.
    ///
    /// ## Errors
    /// `InvalidState` if the ledger is not open; nothing is written then.
    pub fn confirm(report: &ClosureReport, ledger: &mut CashierLedger) -> CoreResult<ClosedShift> {
        if !ledger.is_open() {
            return Err(CoreError::invalid_state("cashier is not open"));
        }

        let prepared = report
            .adjustments()
            .into_iter()
            .map(|adj| {
                ledger.prepare_transaction(
                    adj.kind,
                    vec![MethodAmount::new(PaymentMethod::Cash, adj.amount)],
                    adj.description,
                    TransactionMeta::adjustment(),
                )
            })
            .collect::<CoreResult<Vec<_>>>()?;

        for tx in prepared {
            ledger.append(tx);
        }

        ledger.close(Some(report.audit()))
    }

    /// Reconciles against the ledger's own drawer balance and confirms.
    pub fn close_shift(
        ledger: &mut CashierLedger,
        final_withdrawal: Money,
        counted_cash: Money,
    ) -> CoreResult<(ClosureReport, ClosedShift)> {
        if !ledger.is_open() {
            return Err(CoreError::invalid_state("cashier is not open"));
        }

        let report = Self::reconcile(&ClosureInput {
            current_system_balance: ledger.cash_in_drawer(),
            final_withdrawal,
            counted_cash,
        })?;
        let closed = Self::confirm(&report, ledger)?;
        Ok((report, closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn input(balance: i64, withdrawal: i64, counted: i64) -> ClosureInput {
        ClosureInput {
            current_system_balance: cents(balance),
            final_withdrawal: cents(withdrawal),
            counted_cash: cents(counted),
        }
    }

    #[test]
    fn test_shortage_scenario() {
        let report = ClosureReconciler::reconcile(&input(50000, 10000, 39500)).unwrap();
        assert_eq!(report.expected_cash.cents(), 40000);
        assert_eq!(report.difference.cents(), -500);
        assert_eq!(report.status, ClosureStatus::Shortage);

        let adjustments = report.adjustments();
        assert_eq!(adjustments.len(), 2);
        assert_eq!(adjustments[0].amount.cents(), 10000);
        assert_eq!(adjustments[0].description, FINAL_WITHDRAWAL_DESCRIPTION);
        assert_eq!(adjustments[1].kind, TransactionKind::Withdrawal);
        assert_eq!(adjustments[1].amount.cents(), 500);
    }

    #[test]
    fn test_classify_tolerance() {
        assert_eq!(classify(cents(0)), ClosureStatus::Ok);
        assert_eq!(classify(cents(1)), ClosureStatus::Ok);
        assert_eq!(classify(cents(-1)), ClosureStatus::Ok);
        assert_eq!(classify(cents(2)), ClosureStatus::Surplus);
        assert_eq!(classify(cents(-2)), ClosureStatus::Shortage);
    }

    #[test]
    fn test_expected_cash_never_negative() {
        let report = ClosureReconciler::reconcile(&input(5000, 8000, 0)).unwrap();
        assert!(report.expected_cash.is_zero());
        assert_eq!(report.status, ClosureStatus::Ok);
        assert_eq!(report.adjustments().len(), 1);
    }

    #[test]
    fn test_surplus_books_a_deposit() {
        let report = ClosureReconciler::reconcile(&input(20000, 0, 20750)).unwrap();
        assert_eq!(
            report.adjustments(),
            vec![Adjustment {
                kind: TransactionKind::Deposit,
                amount: cents(750),
                description: OVERAGE_DESCRIPTION,
            }]
        );
    }

    #[test]
    fn test_negative_inputs_rejected() {
        assert!(ClosureReconciler::reconcile(&input(100, -1, 0)).is_err());
        assert!(ClosureReconciler::reconcile(&input(100, 0, -1)).is_err());
    }

    #[test]
    fn test_close_shift_writes_adjustments_then_closes() {
        let mut ledger = CashierLedger::new();
        ledger.open("Ana", cents(10000)).unwrap();
        ledger
            .register_transaction(
                TransactionKind::Sale,
                vec![MethodAmount::new(PaymentMethod::Cash, cents(40000))],
                "",
                TransactionMeta::sale(cents(40000), Money::zero()),
            )
            .unwrap();
        assert_eq!(ledger.cash_in_drawer().cents(), 50000);

        let (report, closed) =
            ClosureReconciler::close_shift(&mut ledger, cents(10000), cents(39500)).unwrap();

        assert_eq!(report.status, ClosureStatus::Shortage);
        assert!(!ledger.is_open());
        assert_eq!(closed.transactions.len(), 3);

        let descriptions: Vec<&str> = closed.transactions[1..]
            .iter()
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(descriptions, vec![FINAL_WITHDRAWAL_DESCRIPTION, SHORTFALL_DESCRIPTION]);
        assert!(closed.transactions[1..]
            .iter()
            .all(|t| t.received_amount == Some(Money::zero())));

        let audit = closed.audit.unwrap();
        assert_eq!(audit.final_real_value.cents(), 39500);
        assert_eq!(audit.difference.cents(), -500);
    }

    #[test]
    fn test_confirm_on_closed_ledger_fails() {
        let mut ledger = CashierLedger::new();
        let report = ClosureReconciler::reconcile(&input(0, 0, 0)).unwrap();
        assert!(matches!(
            ClosureReconciler::confirm(&report, &mut ledger),
            Err(CoreError::InvalidState(_))
        ));
    }
}
