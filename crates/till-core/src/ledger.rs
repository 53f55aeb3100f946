//! # Cashier Ledger
//!
//! Owns the cash-session lifecycle and the append-only transaction log of
//! the open shift.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CLOSED ──── open(responsible, float) ────► OPEN                      │
//! │     ▲                                          │                        │
//! │     │                                          │ register_transaction() │
//! │     │                                          │ withdraw() / deposit() │
//! │     │                                          ▼                        │
//! │     └────────────── close(audit) ◄──────── OPEN (log grows)            │
//! │                                                                         │
//! │  One open session at a time; no nested opens.                          │
//! │  close() hands the whole session back as a ClosedShift snapshot.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! Totals are never stored. They are a fold over the log where withdrawals
//! contribute negatively and sale change is taken out of the cash method, so
//! `totals().net_total` always equals the sum of the transactions' `total`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    CashTransaction, CashierSession, ClosureAudit, MethodAmount, PaymentMethod, Totals,
    TransactionKind,
};
use crate::validation::{validate_amount, validate_positive_amount, validate_responsible};

/// Optional extras of a transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionMeta {
    pub received_amount: Option<Money>,
    pub change_amount: Option<Money>,
    /// Overrides the session's responsible operator.
    pub responsible: Option<String>,
}

impl TransactionMeta {
    /// Meta for a sale: what was handed over and the change returned.
    pub fn sale(received_amount: Money, change_amount: Money) -> Self {
        TransactionMeta {
            received_amount: Some(received_amount),
            change_amount: Some(change_amount),
            responsible: None,
        }
    }

    /// Meta for closure adjustments; zeroed so they stay out of gross sales.
    pub fn adjustment() -> Self {
        TransactionMeta::sale(Money::zero(), Money::zero())
    }
}

/// Snapshot of a session handed back by [`CashierLedger::close`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosedShift {
    pub session: CashierSession,
    pub transactions: Vec<CashTransaction>,
    pub totals: Totals,
    pub audit: Option<ClosureAudit>,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
}

/// Shift report of the open session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftSummary {
    pub sale_count: usize,
    /// Net of change: what the sales actually left in the register.
    pub gross_sales: Money,
    pub change_given: Money,
    /// Absolute sum of withdrawals.
    pub withdrawals: Money,
    pub deposits: Money,
    /// Sales only, net of change, per method.
    pub sales_by_method: BTreeMap<PaymentMethod, Money>,
    pub opening_float: Money,
    pub cash_in_drawer: Money,
    pub net_total: Money,
}

/// The cashier ledger of one register.
///
/// Serializable so the register can persist it as a draft and survive a
/// reload mid-shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashierLedger {
    session: Option<CashierSession>,
    transactions: Vec<CashTransaction>,
}

impl CashierLedger {
    /// Creates a closed ledger.
    pub fn new() -> Self {
        CashierLedger::default()
    }

    /// Opens the drawer for a shift.
    ///
    /// ## Errors
    /// - `InvalidState` if a session is already open
    /// - `Validation` if `responsible` is blank or the float is negative
    pub fn open(&mut self, responsible: &str, opening_float: Money) -> CoreResult<&CashierSession> {
        if self.session.is_some() {
            return Err(CoreError::invalid_state("cashier is already open"));
        }

        let responsible = validate_responsible(responsible)?;
        validate_amount("opening float", opening_float)?;

        self.transactions.clear();
        Ok(self.session.insert(CashierSession {
            responsible,
            opened_at: Utc::now(),
            opening_float,
        }))
    }

    /// Checks if a session is open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// The open session, if any.
    pub fn session(&self) -> Option<&CashierSession> {
        self.session.as_ref()
    }

    /// Transactions of the open session, oldest first.
    pub fn transactions(&self) -> &[CashTransaction] {
        &self.transactions
    }

    /// Validates and builds a transaction without recording it.
    ///
    /// ## Rules
    /// - The drawer must be open
    /// - At least one method, every amount > 0
    /// - Change only on sales, never above the cash tendered
    ///
    /// ## Total
    /// ```text
    /// Sale        Σ methods − change
    /// Withdrawal  −Σ methods
    /// Deposit     +Σ methods
    /// ```
    pub fn prepare_transaction(
        &self,
        kind: TransactionKind,
        methods: Vec<MethodAmount>,
        description: &str,
        meta: TransactionMeta,
    ) -> CoreResult<CashTransaction> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| CoreError::invalid_state("cashier is closed"))?;

        if methods.is_empty() {
            return Err(ValidationError::required("payment methods").into());
        }
        for m in &methods {
            validate_positive_amount("method amount", m.amount)?;
        }

        let sum: Money = methods.iter().map(|m| m.amount).sum();
        let change = meta.change_amount.unwrap_or_default();
        validate_amount("change amount", change)?;
        if let Some(received) = meta.received_amount {
            validate_amount("received amount", received)?;
        }

        if change.is_positive() {
            if kind != TransactionKind::Sale {
                return Err(ValidationError::rule("only sales can return change").into());
            }
            let cash: Money = methods
                .iter()
                .filter(|m| m.method.is_cash())
                .map(|m| m.amount)
                .sum();
            if change > cash {
                return Err(ValidationError::rule(format!(
                    "change {} exceeds the cash tendered {}",
                    change, cash
                ))
                .into());
            }
        }

        let total = match kind {
            TransactionKind::Sale => sum - change,
            TransactionKind::Withdrawal => -sum,
            TransactionKind::Deposit => sum,
        };

        let description = match description.trim() {
            "" => default_description(kind).to_string(),
            d => d.to_string(),
        };

        let responsible = match meta.responsible {
            Some(r) => validate_responsible(&r)?,
            None => session.responsible.clone(),
        };

        Ok(CashTransaction {
            id: Uuid::new_v4().to_string(),
            kind,
            methods,
            description,
            responsible,
            timestamp: Utc::now(),
            received_amount: meta.received_amount,
            change_amount: meta.change_amount,
            total,
        })
    }

    /// Appends a transaction built by [`prepare_transaction`](Self::prepare_transaction).
    ///
    /// Infallible on purpose: callers validate first and commit second.
    pub fn append(&mut self, transaction: CashTransaction) {
        self.transactions.push(transaction);
    }

    /// Validates, builds and records a transaction.
    pub fn register_transaction(
        &mut self,
        kind: TransactionKind,
        methods: Vec<MethodAmount>,
        description: &str,
        meta: TransactionMeta,
    ) -> CoreResult<CashTransaction> {
        let tx = self.prepare_transaction(kind, methods, description, meta)?;
        self.append(tx.clone());
        Ok(tx)
    }

    /// Takes cash out of the drawer (sangria).
    pub fn withdraw(&mut self, amount: Money, description: &str) -> CoreResult<CashTransaction> {
        self.register_transaction(
            TransactionKind::Withdrawal,
            vec![MethodAmount::new(PaymentMethod::Cash, amount)],
            description,
            TransactionMeta::default(),
        )
    }

    /// Puts cash into the drawer (suprimento).
    pub fn deposit(&mut self, amount: Money, description: &str) -> CoreResult<CashTransaction> {
        self.register_transaction(
            TransactionKind::Deposit,
            vec![MethodAmount::new(PaymentMethod::Cash, amount)],
            description,
            TransactionMeta::default(),
        )
    }

    /// Per-method totals of the open session, plus the net total.
    pub fn totals(&self) -> Totals {
        totals_of(&self.transactions)
    }

    /// Cash that should physically be in the drawer:
    /// opening float + net cash movements.
    pub fn cash_in_drawer(&self) -> Money {
        let float = self
            .session
            .as_ref()
            .map(|s| s.opening_float)
            .unwrap_or_default();
        float + self.totals().cash()
    }

    /// Shift report of the open session.
    pub fn summary(&self) -> ShiftSummary {
        let mut summary = ShiftSummary {
            opening_float: self
                .session
                .as_ref()
                .map(|s| s.opening_float)
                .unwrap_or_default(),
            ..ShiftSummary::default()
        };

        for tx in &self.transactions {
            match tx.kind {
                TransactionKind::Sale => {
                    summary.sale_count += 1;
                    summary.gross_sales += tx.total;
                    summary.change_given += tx.change_amount.unwrap_or_default();
                    for (method, amount) in tx.contributions() {
                        *summary.sales_by_method.entry(method).or_default() += amount;
                    }
                }
                TransactionKind::Withdrawal => summary.withdrawals += tx.methods_sum(),
                TransactionKind::Deposit => summary.deposits += tx.methods_sum(),
            }
            summary.net_total += tx.total;
        }

        summary.cash_in_drawer = self.cash_in_drawer();
        summary
    }

    /// Closes the drawer and hands back the session snapshot.
    ///
    /// The current-session log is cleared; archiving the snapshot is the
    /// caller's decision.
    pub fn close(&mut self, audit: Option<ClosureAudit>) -> CoreResult<ClosedShift> {
        let session = self
            .session
            .take()
            .ok_or_else(|| CoreError::invalid_state("cashier is not open"))?;

        let transactions = std::mem::take(&mut self.transactions);
        let totals = totals_of(&transactions);

        Ok(ClosedShift {
            session,
            transactions,
            totals,
            audit,
            closed_at: Utc::now(),
        })
    }
}

/// Folds a transaction log into per-method totals.
pub fn totals_of(transactions: &[CashTransaction]) -> Totals {
    let mut totals = Totals::default();
    for tx in transactions {
        for (method, amount) in tx.contributions() {
            *totals.by_method.entry(method).or_default() += amount;
        }
        totals.net_total += tx.total;
    }
    totals
}

fn default_description(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Sale => "Sale",
        TransactionKind::Withdrawal => "Withdrawal",
        TransactionKind::Deposit => "Deposit",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
