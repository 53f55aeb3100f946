//! # till-core: Settlement & Reconciliation Core for Till POS
//!
//! Everything that decides money lives here, as pure synchronous code with
//! zero I/O. Persistence (till-db) and orchestration (the register app)
//! call into it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Register app (state + commands)                  │   │
//! │  │   open_cashier, add_to_cart, save_table, checkout, close_shift  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   dispatcher ──► allocator ──► money                            │   │
//! │  │       │                                                         │   │
//! │  │       ├──────► ledger ◄────── reconciler                        │   │
//! │  │       └──────► tables, cart, loyalty                            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-db (Database Layer)                        │   │
//! │  │        orders, loyalty ledger, drafts, table configuration      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` in integer cents, fees, proportional scoping
//! - [`ledger`] - Cashier session and append-only transaction log
//! - [`allocator`] - Tender coverage, change and shortfall
//! - [`reconciler`] - Close-of-shift cash count
//! - [`tables`] - Table configuration and open table sessions
//! - [`dispatcher`] - Validate-then-commit checkout orchestration
//! - [`cart`], [`loyalty`], [`types`], [`validation`], [`error`]
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::reconciler::ClosureReconciler;
//! use till_core::{CashierLedger, ClosureStatus, Money};
//!
//! let mut ledger = CashierLedger::new();
//! ledger.open("Ana", Money::from_cents(50_000)).unwrap();
//!
//! let (report, closed) = ClosureReconciler::close_shift(
//!     &mut ledger,
//!     Money::from_cents(10_000),
//!     Money::from_cents(39_500),
//! )
//! .unwrap();
//!
//! assert_eq!(report.status, ClosureStatus::Shortage);
//! assert_eq!(closed.transactions.len(), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod cart;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod loyalty;
pub mod money;
pub mod reconciler;
pub mod tables;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocator::{BalanceStatus, PaymentAllocator, Settlement, SettlementRequest};
pub use cart::{Cart, CartItem, SelectedExtra};
pub use dispatcher::{DispatchPlan, DispatchReceipt, TransactionDispatcher};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{CashierLedger, ClosedShift, ShiftSummary};
pub use loyalty::{LoyaltyPolicy, LoyaltyUpdate};
pub use money::{FeeRule, Money};
pub use reconciler::{ClosureReconciler, ClosureReport};
pub use tables::TableSessionRegistry;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart or table session.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum extras on a single line.
pub const MAX_EXTRAS_PER_LINE: usize = 50;

/// Largest single amount accepted anywhere (price, tender, movement, count):
/// one billion currency units. Keeps every sum far inside `i64`.
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000_000);
