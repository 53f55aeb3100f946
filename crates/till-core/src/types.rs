//! # Domain Types
//!
//! Core domain types shared by the ledger, allocator, reconciler, table
//! registry and dispatcher.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ CashierSession  │   │ CashTransaction │   │     Totals      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  responsible    │   │  kind           │   │  by_method      │       │
//! │  │  opened_at      │   │  methods[]      │   │  net_total      │       │
//! │  │  opening_float  │   │  total (signed) │   │  (derived)      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  TableConfig    │   │  TableSession   │   │  OrderRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, number     │   │  table_id       │   │  status         │       │
//! │  │  description    │   │  items[]        │   │  Pending |      │       │
//! │  │                 │   │  opened_at      │   │  Delivered      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartItem;
use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// Tender types accepted at the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant bank transfer.
    Pix,
    /// Physical cash; the only tender change can be returned from.
    Cash,
    /// Credit card on an external terminal.
    Credit,
    /// Debit card on an external terminal.
    Debit,
}

impl PaymentMethod {
    /// Every method, in display order.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Pix,
        PaymentMethod::Cash,
        PaymentMethod::Credit,
        PaymentMethod::Debit,
    ];

    /// Checks if this is the cash tender.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Cash Transactions
// =============================================================================

/// The kind of drawer movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A completed sale.
    Sale,
    /// Cash taken out of the drawer (sangria).
    Withdrawal,
    /// Cash put into the drawer (suprimento).
    Deposit,
}

impl TransactionKind {
    /// Sign of this kind's effect on the drawer.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            TransactionKind::Withdrawal => -1,
            TransactionKind::Sale | TransactionKind::Deposit => 1,
        }
    }
}

/// One tender line of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodAmount {
    pub method: PaymentMethod,
    /// Always positive; the transaction kind carries the sign.
    pub amount: Money,
}

impl MethodAmount {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        MethodAmount { method, amount }
    }
}

/// An entry of the cashier ledger. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub methods: Vec<MethodAmount>,
    pub description: String,
    pub responsible: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    /// For sales: what the customer handed over across all tenders.
    pub received_amount: Option<Money>,
    /// For sales: change returned from the cash tender.
    pub change_amount: Option<Money>,
    /// Signed net effect on the drawer.
    pub total: Money,
}

impl CashTransaction {
    /// Sum of the method amounts (unsigned).
    pub fn methods_sum(&self) -> Money {
        self.methods.iter().map(|m| m.amount).sum()
    }

    /// Signed contribution of this transaction to each method.
    ///
    /// Sale change is attributed to the cash method, so the contributions
    /// always add up to `total`.
    pub fn contributions(&self) -> Vec<(PaymentMethod, Money)> {
        let sign = self.kind.sign();
        let mut out: Vec<(PaymentMethod, Money)> = self
            .methods
            .iter()
            .map(|m| (m.method, m.amount * sign))
            .collect();

        if let Some(change) = self.change_amount.filter(|c| c.is_positive()) {
            out.push((PaymentMethod::Cash, -change));
        }

        out
    }
}

// =============================================================================
// Cashier Session
// =============================================================================

/// The open drawer of a shift. Exists only while the drawer is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashierSession {
    pub responsible: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    /// Cash placed in the drawer at opening.
    pub opening_float: Money,
}

/// Per-method running totals of the open session. Derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub by_method: BTreeMap<PaymentMethod, Money>,
    pub net_total: Money,
}

impl Totals {
    /// Total for one method (zero when the method never appeared).
    pub fn get(&self, method: PaymentMethod) -> Money {
        self.by_method.get(&method).copied().unwrap_or_default()
    }

    /// Cash-method total.
    #[inline]
    pub fn cash(&self) -> Money {
        self.get(PaymentMethod::Cash)
    }
}

// =============================================================================
// Closure Audit
// =============================================================================

/// Outcome of comparing counted cash with expected cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClosureStatus {
    Ok,
    Shortage,
    Surplus,
}

/// One-shot snapshot produced at close and handed to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosureAudit {
    /// Cash physically counted in the drawer.
    pub final_real_value: Money,
    pub expected_cash: Money,
    /// `final_real_value - expected_cash`.
    pub difference: Money,
    pub status: ClosureStatus,
}

// =============================================================================
// Tables
// =============================================================================

/// A configured table. Independent of occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableConfig {
    pub id: String,
    /// Display label, not necessarily numeric.
    pub number: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Open,
}

/// The open, unsettled cart of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableSession {
    pub table_id: String,
    pub table_number: String,
    pub customer_name: String,
    pub customer_whatsapp: Option<String>,
    pub items: Vec<CartItem>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    pub status: TableStatus,
}

impl TableSession {
    /// Sum of the line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

/// Customer name used when a table is saved without one.
pub fn default_table_customer(number: &str) -> String {
    format!("Table {}", number)
}

// =============================================================================
// Orders
// =============================================================================

/// Where the order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Counter sale, nothing left open.
    QuickSale,
    /// Settled from a table session.
    DineIn,
    /// Delivery order.
    Delivery,
}

/// Fulfillment routing of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for kitchen preparation.
    Pending,
    /// Handed over immediately.
    Delivered,
}

/// The order created for every completed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRecord {
    pub id: String,
    pub order_type: OrderType,
    pub table_id: Option<String>,
    pub table_number: Option<String>,
    pub customer_name: String,
    /// Normalised phone number of the loyalty customer, if any.
    pub customer_key: Option<String>,
    pub delivery_address: Option<String>,
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub service_fee: Money,
    pub cover_charge: Money,
    pub discount: Money,
    pub points_discount: Money,
    pub points_redeemed: i64,
    pub total: Money,
    pub payments: Vec<MethodAmount>,
    pub change_amount: Money,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Loyalty Customers
// =============================================================================

/// A loyalty-program customer, keyed by normalised phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub customer_key: String,
    pub name: String,
    pub points: i64,
    pub total_spent: Money,
    pub visit_count: i64,
    #[ts(as = "Option<String>")]
    pub last_visit_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
