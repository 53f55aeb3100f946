//! # till-db: Database Layer for Till POS
//!
//! SQLite persistence for everything the settlement core hands off: orders,
//! the loyalty points ledger, draft blobs and table configuration.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  Register checkout command                                             │
//! │       │  TransactionDispatcher::prepare() → DispatchPlan               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo     │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ LoyaltyRepo   │    │ _schema.sql  │  │   │
//! │  │   │ persist_      │    │ DraftRepo     │    │              │  │   │
//! │  │   │  settlement   │    │ TableRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database in the platform data directory (till.db)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//! let points = db.loyalty().balance("11987654321").await?;
//! db.persist_settlement(&plan.order, plan.loyalty.as_ref(), plan.points_earned).await?;
//! ```
//!
//! Queries are built at runtime with `sqlx::query` / `query_as` and bound
//! parameters, so the crate builds without a live `DATABASE_URL`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::draft::DraftRepository;
pub use repository::loyalty::{LoyaltyMovement, LoyaltyRepository};
pub use repository::order::OrderRepository;
pub use repository::table::TableRepository;
