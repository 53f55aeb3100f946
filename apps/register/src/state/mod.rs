//! # Register State Module
//!
//! Shared state handed to register commands.
//!
//! ## State Types
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Register State Types                                 │
//! │                                                                         │
//! │  ┌──────────────┐ ┌────────────────┐ ┌──────────────┐ ┌─────────────┐ │
//! │  │   DbState    │ │ RegisterState  │ │ TablesState  │ │ ConfigState │ │
//! │  │              │ │                │ │              │ │             │ │
//! │  │ • SqlitePool │ │ • Ledger       │ │ • Tables     │ │ • Fees      │ │
//! │  │ • Repos      │ │ • Cart         │ │ • Sessions   │ │ • Loyalty   │ │
//! │  └──────────────┘ └────────────────┘ └──────────────┘ └─────────────┘ │
//! │                                                                         │
//! │  Each command takes only the state it needs.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod register;
mod tables;

pub use config::ConfigState;
pub use db::DbState;
pub use register::{CartTotals, Register, RegisterState};
pub use tables::{TableView, TablesState};
