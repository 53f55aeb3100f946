//! # Cashier Commands
//!
//! Drawer lifecycle: open, cash movements, shift report, closure.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Shift Lifecycle                                      │
//! │                                                                         │
//! │  ┌──────────┐  open_cashier  ┌──────────┐  close_cashier  ┌──────────┐ │
//! │  │  CLOSED  │───────────────►│   OPEN   │────────────────►│  CLOSED  │ │
//! │  └──────────┘                └──────────┘                 └──────────┘ │
//! │                                 │    ▲                                  │
//! │                   withdraw_cash │    │ checkout (sale.rs)              │
//! │                   deposit_cash  └────┘                                  │
//! │                                                                         │
//! │  preview_closure: reconcile without writing anything                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::draft::persist_register;
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, RegisterState};
use till_core::reconciler::ClosureInput;
use till_core::{
    CashTransaction, CashierSession, ClosedShift, ClosureReconciler, ClosureReport, Money,
    ShiftSummary, Totals,
};

/// Drawer status for the cashier screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierResponse {
    pub is_open: bool,
    pub session: Option<CashierSession>,
    pub totals: Totals,
    pub cash_in_drawer: Money,
    pub transactions: Vec<CashTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCashierRequest {
    pub responsible: String,
    pub opening_float: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovementRequest {
    pub amount: Money,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseCashierRequest {
    /// Cash taken out for the bank before counting.
    #[serde(default)]
    pub final_withdrawal: Money,
    pub counted_cash: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseCashierResponse {
    pub report: ClosureReport,
    pub shift: ClosedShift,
}

/// Gets the drawer status and the current session's log.
pub async fn get_cashier(register: &RegisterState) -> CashierResponse {
    debug!("get_cashier command");
    register
        .with_register(|r| CashierResponse {
            is_open: r.ledger.is_open(),
            session: r.ledger.session().cloned(),
            totals: r.ledger.totals(),
            cash_in_drawer: r.ledger.cash_in_drawer(),
            transactions: r.ledger.transactions().to_vec(),
        })
        .await
}

/// Opens the drawer for a shift.
pub async fn open_cashier(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    request: OpenCashierRequest,
) -> Result<CashierSession, ApiError> {
    debug!(responsible = %request.responsible, "open_cashier command");

    let mut guard = register.lock().await;
    let session = guard
        .ledger
        .open(&request.responsible, request.opening_float)?
        .clone();
    persist_register(db, config, &guard).await?;

    info!(
        responsible = %session.responsible,
        opening_float = %session.opening_float,
        "Cashier opened"
    );
    Ok(session)
}

/// Takes cash out of the drawer (sangria).
pub async fn withdraw_cash(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    request: CashMovementRequest,
) -> Result<CashTransaction, ApiError> {
    debug!(amount = %request.amount, "withdraw_cash command");

    let mut guard = register.lock().await;
    let tx = guard.ledger.withdraw(request.amount, &request.description)?;
    persist_register(db, config, &guard).await?;

    info!(transaction_id = %tx.id, amount = %request.amount, "Cash withdrawn");
    Ok(tx)
}

/// Puts cash into the drawer (suprimento).
pub async fn deposit_cash(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    request: CashMovementRequest,
) -> Result<CashTransaction, ApiError> {
    debug!(amount = %request.amount, "deposit_cash command");

    let mut guard = register.lock().await;
    let tx = guard.ledger.deposit(request.amount, &request.description)?;
    persist_register(db, config, &guard).await?;

    info!(transaction_id = %tx.id, amount = %request.amount, "Cash deposited");
    Ok(tx)
}

/// Shift report of the open session.
pub async fn shift_summary(register: &RegisterState) -> Result<ShiftSummary, ApiError> {
    register
        .with_register(|r| {
            if r.ledger.is_open() {
                Ok(r.ledger.summary())
            } else {
                Err(ApiError::invalid_state("cashier is closed"))
            }
        })
        .await
}

/// Reconciles a prospective closure without touching the ledger, so the
/// operator can see the discrepancy before confirming.
pub async fn preview_closure(
    register: &RegisterState,
    request: CloseCashierRequest,
) -> Result<ClosureReport, ApiError> {
    let guard = register.lock().await;
    if !guard.ledger.is_open() {
        return Err(ApiError::invalid_state("cashier is not open"));
    }

    let report = ClosureReconciler::reconcile(&ClosureInput {
        current_system_balance: guard.ledger.cash_in_drawer(),
        final_withdrawal: request.final_withdrawal,
        counted_cash: request.counted_cash,
    })?;
    Ok(report)
}

/// Closes the shift: writes the final withdrawal and the discrepancy
/// booking, then closes the ledger.
pub async fn close_cashier(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    request: CloseCashierRequest,
) -> Result<CloseCashierResponse, ApiError> {
    debug!(
        final_withdrawal = %request.final_withdrawal,
        counted = %request.counted_cash,
        "close_cashier command"
    );

    let mut guard = register.lock().await;
    let (report, shift) = ClosureReconciler::close_shift(
        &mut guard.ledger,
        request.final_withdrawal,
        request.counted_cash,
    )?;
    persist_register(db, config, &guard).await?;

    info!(
        responsible = %shift.session.responsible,
        expected = %report.expected_cash,
        counted = %report.counted_cash,
        difference = %report.difference,
        status = ?report.status,
        transactions = shift.transactions.len(),
        "Cashier closed"
    );
    Ok(CloseCashierResponse { report, shift })
}
