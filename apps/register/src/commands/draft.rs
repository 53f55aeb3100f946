//! # Draft Persistence
//!
//! Parks the volatile register state in the `drafts` table after every
//! mutation, and restores it at startup so a reload mid-shift loses
//! nothing.
//!
//! ## Keys
//! ```text
//! cart:{terminal}     Cart                 in-progress checkout
//! ledger:{terminal}   CashierLedger        open session + transaction log
//! tables:{terminal}   Vec<TableSession>    open table sessions
//! ```
//!
//! Table configuration is not a draft; it lives in `dining_tables`.

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, Register};
use till_core::{Cart, CashierLedger, TableSession, TableSessionRegistry};
use till_db::{Database, DbError};

pub fn cart_key(terminal_id: &str) -> String {
    format!("cart:{}", terminal_id)
}

pub fn ledger_key(terminal_id: &str) -> String {
    format!("ledger:{}", terminal_id)
}

pub fn tables_key(terminal_id: &str) -> String {
    format!("tables:{}", terminal_id)
}

/// Saves the ledger and the cart.
pub async fn persist_register(
    db: &DbState,
    config: &ConfigState,
    register: &Register,
) -> Result<(), ApiError> {
    let drafts = db.inner().drafts();
    drafts
        .save_json(&ledger_key(&config.terminal_id), &register.ledger)
        .await?;
    drafts
        .save_json(&cart_key(&config.terminal_id), &register.cart)
        .await?;
    debug!(terminal = %config.terminal_id, "Register draft saved");
    Ok(())
}

/// Saves the cart only.
pub async fn persist_cart(db: &DbState, config: &ConfigState, cart: &Cart) -> Result<(), ApiError> {
    db.inner()
        .drafts()
        .save_json(&cart_key(&config.terminal_id), cart)
        .await?;
    Ok(())
}

/// Saves the open table sessions.
pub async fn persist_tables(
    db: &DbState,
    config: &ConfigState,
    registry: &TableSessionRegistry,
) -> Result<(), ApiError> {
    db.inner()
        .drafts()
        .save_json(&tables_key(&config.terminal_id), &registry.snapshot())
        .await?;
    debug!(terminal = %config.terminal_id, "Table sessions draft saved");
    Ok(())
}

/// Restores the register and the table registry of a terminal.
///
/// Table configuration comes from `dining_tables`; sessions, ledger and
/// cart from drafts. A corrupt draft is discarded with a warning and the
/// corresponding state starts empty.
pub async fn restore(
    db: &Database,
    terminal_id: &str,
) -> Result<(Register, TableSessionRegistry), ApiError> {
    let ledger: CashierLedger = load_or_default(db, &ledger_key(terminal_id)).await?;
    let cart: Cart = load_or_default(db, &cart_key(terminal_id)).await?;
    let sessions: Vec<TableSession> = load_or_default(db, &tables_key(terminal_id)).await?;

    let mut registry = TableSessionRegistry::new();
    registry.restore_tables(db.tables().list().await?);
    registry.restore(sessions);

    info!(
        terminal = %terminal_id,
        cashier_open = ledger.is_open(),
        cart_lines = cart.item_count(),
        open_tables = registry.open_sessions().len(),
        "Drafts restored"
    );

    Ok((Register::restore(ledger, cart), registry))
}

async fn load_or_default<T>(db: &Database, key: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    match db.drafts().load_json::<T>(key).await {
        Ok(value) => Ok(value.unwrap_or_default()),
        Err(DbError::Serialization(e)) => {
            warn!(key = %key, error = %e, "Discarding corrupt draft");
            db.drafts().delete(key).await?;
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
