//! # Register Commands Module
//!
//! Every operation exposed to front ends.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── cashier.rs  ◄─── Drawer open, cash movements, shift report, closure
//! ├── cart.rs     ◄─── Cart manipulation
//! ├── table.rs    ◄─── Table configuration and sessions
//! ├── sale.rs     ◄─── Tender preview and checkout
//! ├── order.rs    ◄─── Kitchen queue
//! ├── loyalty.rs  ◄─── Customer lookup and enrollment
//! ├── config.rs   ◄─── Configuration retrieval
//! └── draft.rs    ◄─── Draft persistence and restore
//! ```
//!
//! ## State Injection
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs the register
//! async fn get_cart(register: &RegisterState)
//!
//! // Needs the database too (drafts)
//! async fn add_to_cart(db: &DbState, register: &RegisterState, config: &ConfigState, ...)
//!
//! // Needs everything
//! async fn checkout(db: &DbState, register: &RegisterState, tables: &TablesState, config: &ConfigState, ...)
//! ```
//!
//! Errors are always `ApiError`, serialized as `{ code, message }`.

pub mod cart;
pub mod cashier;
pub mod config;
pub mod draft;
pub mod loyalty;
pub mod order;
pub mod sale;
pub mod table;
