//! # Table Commands
//!
//! Table configuration (persisted in `dining_tables`) and table sessions
//! (persisted as a draft).
//!
//! ## Table Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Table Workflow                                       │
//! │                                                                         │
//! │  cart ──save_table──► session on table 3 ──load_table──► cart          │
//! │                              │                                          │
//! │                       transfer_table                                    │
//! │                              ▼                                          │
//! │                       session on table 7 ──checkout (DineIn)──► order  │
//! │                                                                         │
//! │  Transferring into an occupied table is rejected.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::draft::{persist_register, persist_tables};
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, RegisterState, TableView, TablesState};
use till_core::{Cart, CoreError, TableConfig, TableSession};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRequest {
    pub number: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTableRequest {
    pub table_id: String,
    #[serde(default)]
    pub customer_name: String,
    pub customer_whatsapp: Option<String>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Floor view: every configured table with its session.
pub async fn list_tables(tables: &TablesState) -> Vec<TableView> {
    debug!("list_tables command");
    tables.floor().await
}

/// Configures a new table.
pub async fn add_table(
    db: &DbState,
    tables: &TablesState,
    request: TableRequest,
) -> Result<TableConfig, ApiError> {
    debug!(number = %request.number, "add_table command");

    let mut registry = tables.lock().await;
    let table = registry.add_table(&request.number, &request.description)?;

    if let Err(e) = db.inner().tables().insert(&table).await {
        registry.remove_table(&table.id)?;
        return Err(e.into());
    }

    info!(table_id = %table.id, number = %table.number, "Table added");
    Ok(table)
}

/// Renames or re-describes a table. An open session follows the new number.
pub async fn edit_table(
    db: &DbState,
    tables: &TablesState,
    config: &ConfigState,
    table_id: &str,
    request: TableRequest,
) -> Result<TableConfig, ApiError> {
    debug!(table_id = %table_id, number = %request.number, "edit_table command");

    let mut registry = tables.lock().await;
    let previous = registry
        .table(table_id)
        .cloned()
        .ok_or_else(|| CoreError::TableNotFound(table_id.to_string()))?;
    let table = registry.edit_table(table_id, &request.number, &request.description)?;

    if let Err(e) = db.inner().tables().update(&table).await {
        registry.edit_table(table_id, &previous.number, &previous.description)?;
        return Err(e.into());
    }
    persist_tables(db, config, &registry).await?;

    info!(table_id = %table.id, number = %table.number, "Table edited");
    Ok(table)
}

/// Removes a table from the configuration. An open session is kept until
/// it is settled or discarded.
pub async fn remove_table(
    db: &DbState,
    tables: &TablesState,
    table_id: &str,
) -> Result<(), ApiError> {
    debug!(table_id = %table_id, "remove_table command");

    let mut registry = tables.lock().await;
    db.inner().tables().delete(table_id).await?;
    let removed = registry.remove_table(table_id)?;

    if registry.is_occupied(table_id) {
        warn!(table_id = %table_id, "Removed table still has an open session");
    }
    info!(table_id = %table_id, number = %removed.number, "Table removed");
    Ok(())
}

// =============================================================================
// Sessions
// =============================================================================

/// Parks the current cart on a table and empties the cart.
///
/// ## Errors
/// `InvalidState` when the cart was loaded from a different table; moving a
/// session goes through [`transfer_table`].
pub async fn save_table(
    db: &DbState,
    register: &RegisterState,
    tables: &TablesState,
    config: &ConfigState,
    request: SaveTableRequest,
) -> Result<Option<TableSession>, ApiError> {
    debug!(table_id = %request.table_id, "save_table command");

    let mut guard = register.lock().await;
    let mut registry = tables.lock().await;

    let number = registry
        .table(&request.table_id)
        .map(|t| t.number.clone())
        .ok_or_else(|| CoreError::TableNotFound(request.table_id.clone()))?;
    if let Some(origin) = guard.cart.table_id.as_deref() {
        if origin != request.table_id {
            return Err(ApiError::invalid_state(
                "cart was loaded from another table; transfer it instead",
            ));
        }
    }

    let session = registry
        .save(
            &request.table_id,
            &number,
            &request.customer_name,
            guard.cart.items.clone(),
            request.customer_whatsapp,
        )?
        .cloned();
    guard.cart.clear();

    persist_tables(db, config, &registry).await?;
    persist_register(db, config, &guard).await?;

    match &session {
        Some(s) => info!(table = %s.table_number, lines = s.items.len(), "Table saved"),
        None => info!(table = %number, "Table saved empty, session closed"),
    }
    Ok(session)
}

/// Loads a table's session into the cart for editing or settlement.
///
/// ## Errors
/// `InvalidState` when the cart holds lines that were not parked anywhere.
pub async fn load_table(
    db: &DbState,
    register: &RegisterState,
    tables: &TablesState,
    config: &ConfigState,
    table_id: &str,
) -> Result<TableSession, ApiError> {
    debug!(table_id = %table_id, "load_table command");

    let mut guard = register.lock().await;
    let registry = tables.lock().await;

    if !guard.cart.is_empty() {
        return Err(ApiError::invalid_state(
            "cart has unsaved lines; save or clear it first",
        ));
    }

    let session = registry
        .session(table_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Table session", table_id))?;
    guard.cart = Cart::from_table(table_id, session.items.clone());
    persist_register(db, config, &guard).await?;

    Ok(session)
}

/// Moves a session onto a free table. A cart loaded from the old table
/// follows it.
pub async fn transfer_table(
    db: &DbState,
    register: &RegisterState,
    tables: &TablesState,
    config: &ConfigState,
    from_table_id: &str,
    to_table_id: &str,
) -> Result<TableSession, ApiError> {
    debug!(from = %from_table_id, to = %to_table_id, "transfer_table command");

    let mut guard = register.lock().await;
    let mut registry = tables.lock().await;
    let to_number = registry
        .table(to_table_id)
        .map(|t| t.number.clone())
        .ok_or_else(|| CoreError::TableNotFound(to_table_id.to_string()))?;

    let session = registry
        .transfer(from_table_id, to_table_id, &to_number)?
        .clone();
    persist_tables(db, config, &registry).await?;

    if guard.cart.table_id.as_deref() == Some(from_table_id) {
        guard.cart.table_id = Some(session.table_id.clone());
        persist_register(db, config, &guard).await?;
    }

    info!(from = %from_table_id, to = %session.table_number, "Table transferred");
    Ok(session)
}

/// Discards a table's session without settling it. A cart loaded from
/// that table keeps its lines but is no longer bound to it.
pub async fn close_table(
    db: &DbState,
    register: &RegisterState,
    tables: &TablesState,
    config: &ConfigState,
    table_id: &str,
) -> Result<Option<TableSession>, ApiError> {
    debug!(table_id = %table_id, "close_table command");

    let mut guard = register.lock().await;
    let mut registry = tables.lock().await;
    let closed = registry.close(table_id);
    persist_tables(db, config, &registry).await?;

    if guard.cart.table_id.as_deref() == Some(table_id) {
        guard.cart.table_id = None;
        persist_register(db, config, &guard).await?;
    }

    if let Some(session) = &closed {
        info!(table = %session.table_number, lines = session.items.len(), "Table session discarded");
    }
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, AddItemRequest};
    use crate::error::ErrorCode;
    use till_core::Money;
    use till_db::{Database, DbConfig};

    struct Fixture {
        db: DbState,
        register: RegisterState,
        tables: TablesState,
        config: ConfigState,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Fixture {
            db: DbState::new(db),
            register: RegisterState::new(),
            tables: TablesState::new(),
            config: ConfigState::default(),
        }
    }

    async fn table(f: &Fixture, number: &str) -> TableConfig {
        add_table(
            &f.db,
            &f.tables,
            TableRequest {
                number: number.to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap()
    }

    async fn add(f: &Fixture, name: &str, cents: i64) {
        add_to_cart(
            &f.db,
            &f.register,
            &f.config,
            AddItemRequest {
                product_id: name.to_lowercase(),
                name: name.to_string(),
                unit_price: Money::from_cents(cents),
                quantity: 1,
                extras: vec![],
                notes: String::new(),
                needs_preparation: false,
            },
        )
        .await
        .unwrap();
    }

    async fn park(f: &Fixture, table_id: &str) -> Option<TableSession> {
        save_table(
            &f.db,
            &f.register,
            &f.tables,
            &f.config,
            SaveTableRequest {
                table_id: table_id.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_number_leaves_registry_untouched() {
        let f = fixture().await;
        table(&f, "1").await;

        let err = add_table(
            &f.db,
            &f.tables,
            TableRequest {
                number: "1".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(list_tables(&f.tables).await.len(), 1);
        assert_eq!(f.db.inner().tables().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_parks_cart_and_load_brings_it_back() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        add(&f, "Pizza", 4_500).await;

        let session = park(&f, &t3.id).await.unwrap();
        assert_eq!(session.customer_name, "Table 3");
        assert!(f.register.with_register(|r| r.cart.is_empty()).await);

        let loaded = load_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(
            f.register.with_register(|r| r.cart.subtotal()).await,
            Money::from_cents(4_500)
        );
    }

    #[tokio::test]
    async fn test_load_refuses_to_overwrite_unsaved_cart() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;
        add(&f, "Soda", 600).await;

        let err = load_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_transfer_into_occupied_table_fails() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        let t7 = table(&f, "7").await;

        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;
        add(&f, "Soda", 600).await;
        park(&f, &t7.id).await;

        let err = transfer_table(&f.db, &f.register, &f.tables, &f.config, &t3.id, &t7.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_transfer_to_free_table_moves_and_renames() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        let t7 = table(&f, "7").await;
        add(&f, "Pizza", 4_500).await;
        add(&f, "Soda", 600).await;
        park(&f, &t3.id).await;

        let moved = transfer_table(&f.db, &f.register, &f.tables, &f.config, &t3.id, &t7.id)
            .await
            .unwrap();
        assert_eq!(moved.table_number, "7");
        assert_eq!(moved.customer_name, "Table 7");
        assert_eq!(moved.items.len(), 2);

        let floor = list_tables(&f.tables).await;
        assert!(!floor[0].is_occupied());
        assert!(floor[1].is_occupied());
    }

    #[tokio::test]
    async fn test_edit_renames_open_session() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;

        edit_table(
            &f.db,
            &f.tables,
            &f.config,
            &t3.id,
            TableRequest {
                number: "30".to_string(),
                description: "Patio".to_string(),
            },
        )
        .await
        .unwrap();

        let floor = list_tables(&f.tables).await;
        let session = floor[0].session.as_ref().unwrap();
        assert_eq!(session.table_number, "30");
        assert_eq!(f.db.inner().tables().list().await.unwrap()[0].number, "30");
    }

    #[tokio::test]
    async fn test_close_table_discards_session() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;

        let closed = close_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap();
        assert!(closed.is_some());
        assert!(close_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_load_binds_cart_and_close_releases_it() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;

        load_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap();
        let bound = f.register.with_register(|r| r.cart.table_id.clone()).await;
        assert_eq!(bound.as_deref(), Some(t3.id.as_str()));

        close_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap();
        let (bound, lines) = f
            .register
            .with_register(|r| (r.cart.table_id.clone(), r.cart.item_count()))
            .await;
        assert!(bound.is_none());
        assert_eq!(lines, 1);
    }

    #[tokio::test]
    async fn test_save_refuses_a_cart_loaded_from_another_table() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        let t7 = table(&f, "7").await;
        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;
        load_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap();

        let err = save_table(
            &f.db,
            &f.register,
            &f.tables,
            &f.config,
            SaveTableRequest {
                table_id: t7.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(!f.tables.lock().await.is_occupied(&t7.id));
    }

    #[tokio::test]
    async fn test_transfer_moves_the_cart_binding() {
        let f = fixture().await;
        let t3 = table(&f, "3").await;
        let t7 = table(&f, "7").await;
        add(&f, "Pizza", 4_500).await;
        park(&f, &t3.id).await;
        load_table(&f.db, &f.register, &f.tables, &f.config, &t3.id)
            .await
            .unwrap();

        transfer_table(&f.db, &f.register, &f.tables, &f.config, &t3.id, &t7.id)
            .await
            .unwrap();
        let bound = f.register.with_register(|r| r.cart.table_id.clone()).await;
        assert_eq!(bound.as_deref(), Some(t7.id.as_str()));
    }
}
