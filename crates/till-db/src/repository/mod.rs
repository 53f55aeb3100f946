//! # Repository Module
//!
//! Database repository implementations for Till POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Register command                                                      │
//! │       │                                                                 │
//! │       │  db.loyalty().balance("11987654321")                           │
//! │       ▼                                                                 │
//! │  LoyaltyRepository ──► SQL ──► SQLite                                  │
//! │                                                                         │
//! │  Each repository also exposes `pub(crate)` functions taking a          │
//! │  `&mut SqliteConnection`, so `Database::persist_settlement` can run    │
//! │  several of them inside one transaction.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Order store and kitchen queue
//! - [`LoyaltyRepository`](loyalty::LoyaltyRepository) - Points ledger
//! - [`DraftRepository`](draft::DraftRepository) - Draft blobs
//! - [`TableRepository`](table::TableRepository) - Table configuration

pub mod draft;
pub mod loyalty;
pub mod order;
pub mod table;
