//! # Table Session Registry
//!
//! Configured tables and the open, unsettled cart parked on each of them.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   FREE ── save(items ≠ ∅) ──► OPEN ── save(items ≠ ∅) ──► OPEN         │
//! │    ▲                           │  │                   (opened_at kept)  │
//! │    │                           │  └── transfer(to) ──► OPEN on `to`    │
//! │    └── close() / save(∅) ──────┘                       (from is FREE)   │
//! │                                                                         │
//! │  At most one session per table id.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Table configuration is independent of occupancy: removing a configured
//! table leaves its open session in place until it is settled.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartItem;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{default_table_customer, TableConfig, TableSession, TableStatus};
use crate::validation::{validate_line_count, validate_table_id, validate_table_number};

/// Open table sessions plus the table configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSessionRegistry {
    tables: BTreeMap<String, TableConfig>,
    sessions: BTreeMap<String, TableSession>,
}

impl TableSessionRegistry {
    pub fn new() -> Self {
        TableSessionRegistry::default()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Configures a new table.
    ///
    /// ## Errors
    /// `Validation` if the number is blank or already used by another table.
    pub fn add_table(&mut self, number: &str, description: &str) -> CoreResult<TableConfig> {
        let number = validate_table_number(number)?;
        self.check_number_free(&number, None)?;

        let config = TableConfig {
            id: Uuid::new_v4().to_string(),
            number,
            description: description.trim().to_string(),
        };
        self.tables.insert(config.id.clone(), config.clone());
        Ok(config)
    }

    /// Renames or re-describes a configured table.
    ///
    /// An open session on the table follows the new number.
    pub fn edit_table(&mut self, id: &str, number: &str, description: &str) -> CoreResult<TableConfig> {
        let number = validate_table_number(number)?;
        if !self.tables.contains_key(id) {
            return Err(CoreError::TableNotFound(id.to_string()));
        }
        self.check_number_free(&number, Some(id))?;

        let config = self
            .tables
            .get_mut(id)
            .ok_or_else(|| CoreError::TableNotFound(id.to_string()))?;
        config.number = number.clone();
        config.description = description.trim().to_string();
        let config = config.clone();

        if let Some(session) = self.sessions.get_mut(id) {
            rename_session(session, number);
        }

        Ok(config)
    }

    /// Removes a table from the configuration.
    pub fn remove_table(&mut self, id: &str) -> CoreResult<TableConfig> {
        self.tables
            .remove(id)
            .ok_or_else(|| CoreError::TableNotFound(id.to_string()))
    }

    /// Configured tables, ordered by number.
    pub fn tables(&self) -> Vec<TableConfig> {
        let mut tables: Vec<TableConfig> = self.tables.values().cloned().collect();
        tables.sort_by(|a, b| natural_cmp(&a.number, &b.number));
        tables
    }

    /// Looks up a configured table.
    pub fn table(&self, id: &str) -> Option<&TableConfig> {
        self.tables.get(id)
    }

    /// Replaces the configuration with persisted rows.
    pub fn restore_tables(&mut self, tables: Vec<TableConfig>) {
        self.tables = tables.into_iter().map(|t| (t.id.clone(), t)).collect();
    }

    fn check_number_free(&self, number: &str, except_id: Option<&str>) -> CoreResult<()> {
        let taken = self
            .tables
            .values()
            .any(|t| t.number == number && Some(t.id.as_str()) != except_id);
        if taken {
            return Err(ValidationError::Duplicate {
                field: "table number".to_string(),
                value: number.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Parks a cart on a table.
    ///
    /// Replaces an existing session but keeps its `opened_at`. A blank
    /// customer name defaults to `"Table {number}"`. Saving no items closes
    /// the session.
    ///
    /// ## Returns
    /// The stored session, or `None` when the save closed it.
    pub fn save(
        &mut self,
        table_id: &str,
        table_number: &str,
        customer_name: &str,
        items: Vec<CartItem>,
        customer_whatsapp: Option<String>,
    ) -> CoreResult<Option<&TableSession>> {
        let table_id = validate_table_id(table_id)?;
        let table_number = validate_table_number(table_number)?;
        validate_line_count(items.len())?;

        if items.is_empty() {
            self.sessions.remove(&table_id);
            return Ok(None);
        }

        let customer_whatsapp = customer_whatsapp
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());
        Ok(Some(self.upsert(
            table_id,
            table_number,
            customer_name,
            items,
            customer_whatsapp,
        )))
    }

    fn upsert(
        &mut self,
        table_id: String,
        table_number: String,
        customer_name: &str,
        items: Vec<CartItem>,
        customer_whatsapp: Option<String>,
    ) -> &TableSession {
        let customer_name = match customer_name.trim() {
            "" => default_table_customer(&table_number),
            name => name.to_string(),
        };
        let opened_at = self
            .sessions
            .get(&table_id)
            .map(|s| s.opened_at)
            .unwrap_or_else(Utc::now);

        let session = TableSession {
            table_id: table_id.clone(),
            table_number,
            customer_name,
            customer_whatsapp,
            items,
            opened_at,
            status: TableStatus::Open,
        };

        self.sessions.insert(table_id.clone(), session);
        &self.sessions[&table_id]
    }

    /// Moves the session of `from` onto the free table `to`.
    ///
    /// ## Errors
    /// - `InvalidState` if `to` already has a session
    /// - `Validation` if `from` has no session
    pub fn transfer(&mut self, from: &str, to: &str, to_number: &str) -> CoreResult<&TableSession> {
        let to_id = validate_table_id(to)?;
        let to_number = validate_table_number(to_number)?;

        if self.sessions.contains_key(&to_id) {
            return Err(CoreError::invalid_state(format!(
                "table {} is occupied",
                to_number
            )));
        }

        let mut session = self.sessions.remove(from).ok_or_else(|| {
            ValidationError::rule(format!("table {} has no open session", from))
        })?;

        session.table_id = to_id.clone();
        rename_session(&mut session, to_number);
        self.sessions.insert(to_id.clone(), session);
        Ok(&self.sessions[&to_id])
    }

    /// Replaces the lines of an open session after part of it was settled.
    /// No lines left closes the session; a free table stays free.
    pub(crate) fn retain_items(&mut self, table_id: &str, items: Vec<CartItem>) {
        if items.is_empty() {
            self.sessions.remove(table_id);
        } else if let Some(session) = self.sessions.get_mut(table_id) {
            session.items = items;
        }
    }

    /// Removes a table's session; no-op when there is none.
    pub fn close(&mut self, table_id: &str) -> Option<TableSession> {
        self.sessions.remove(table_id)
    }

    /// Open session of a table.
    pub fn session(&self, table_id: &str) -> Option<&TableSession> {
        self.sessions.get(table_id)
    }

    pub fn is_occupied(&self, table_id: &str) -> bool {
        self.sessions.contains_key(table_id)
    }

    /// All open sessions, oldest first.
    pub fn open_sessions(&self) -> Vec<&TableSession> {
        let mut sessions: Vec<&TableSession> = self.sessions.values().collect();
        sessions.sort_by_key(|s| s.opened_at);
        sessions
    }

    /// Copies of the open sessions, for draft persistence.
    pub fn snapshot(&self) -> Vec<TableSession> {
        self.sessions.values().cloned().collect()
    }

    /// Replaces the open sessions with a persisted snapshot. Empty
    /// sessions in the snapshot are dropped.
    pub fn restore(&mut self, sessions: Vec<TableSession>) {
        self.sessions = sessions
            .into_iter()
            .filter(|s| !s.items.is_empty())
            .map(|s| (s.table_id.clone(), s))
            .collect();
    }
}

/// Moves a session to a new table number; a defaulted customer name follows.
fn rename_session(session: &mut TableSession, number: String) {
    if session.customer_name == default_table_customer(&session.table_number) {
        session.customer_name = default_table_customer(&number);
    }
    session.table_number = number;
}

/// Orders "2" before "10"; non-numeric labels sort after, alphabetically.
fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn items(n: usize) -> Vec<CartItem> {
        (0..n)
            .map(|i| {
                CartItem::new(
                    format!("p-{i}"),
                    format!("Dish {i}"),
                    Money::from_cents(1000 + i as i64),
                    1,
                    true,
                )
            })
            .collect()
    }

    #[test]
    fn test_save_defaults_customer_and_keeps_opened_at() {
        let mut registry = TableSessionRegistry::new();
        let opened_at = registry
            .save("t3", "3", "", items(2), None)
            .unwrap()
            .unwrap()
            .opened_at;

        let session = registry
            .save("t3", "3", "", items(3), Some(" ".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(session.customer_name, "Table 3");
        assert_eq!(session.opened_at, opened_at);
        assert_eq!(session.items.len(), 3);
        assert!(session.customer_whatsapp.is_none());
    }

    #[test]
    fn test_save_empty_closes_session() {
        let mut registry = TableSessionRegistry::new();
        registry.save("t3", "3", "Ana", items(1), None).unwrap();
        assert!(registry.save("t3", "3", "Ana", vec![], None).unwrap().is_none());
        assert!(!registry.is_occupied("t3"));
    }

    #[test]
    fn test_save_accepts_a_full_cart_and_rejects_more() {
        let mut registry = TableSessionRegistry::new();
        assert!(registry
            .save("t3", "3", "", items(crate::MAX_CART_ITEMS), None)
            .is_ok());

        let err = registry
            .save("t4", "4", "", items(crate::MAX_CART_ITEMS + 1), None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(!registry.is_occupied("t4"));
    }

    #[test]
    fn test_transfer_to_occupied_table_fails() {
        let mut registry = TableSessionRegistry::new();
        registry.save("t3", "3", "", items(2), None).unwrap();
        registry.save("t7", "7", "Bruno", items(1), None).unwrap();

        assert!(matches!(
            registry.transfer("t3", "t7", "7"),
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(registry.session("t3").unwrap().items.len(), 2);
        assert_eq!(registry.session("t7").unwrap().customer_name, "Bruno");
    }

    #[test]
    fn test_transfer_to_free_table_moves_cart() {
        let mut registry = TableSessionRegistry::new();
        let original = items(4);
        registry.save("t3", "3", "", original.clone(), None).unwrap();

        let moved = registry.transfer("t3", "t7", "7").unwrap();
        assert_eq!(moved.table_id, "t7");
        assert_eq!(moved.table_number, "7");
        assert_eq!(moved.customer_name, "Table 7");
        assert_eq!(moved.items, original);

        assert!(!registry.is_occupied("t3"));
        assert!(registry.is_occupied("t7"));
    }

    #[test]
    fn test_transfer_keeps_explicit_customer_name() {
        let mut registry = TableSessionRegistry::new();
        registry.save("t3", "3", "Carla", items(1), None).unwrap();
        let moved = registry.transfer("t3", "t5", "5").unwrap();
        assert_eq!(moved.customer_name, "Carla");
    }

    #[test]
    fn test_transfer_from_free_table_is_validation_error() {
        let mut registry = TableSessionRegistry::new();
        assert!(matches!(
            registry.transfer("t1", "t2", "2"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_close_is_noop_when_absent() {
        let mut registry = TableSessionRegistry::new();
        assert!(registry.close("nope").is_none());
    }

    #[test]
    fn test_table_configuration() {
        let mut registry = TableSessionRegistry::new();
        let t10 = registry.add_table("10", "Window").unwrap();
        let t2 = registry.add_table(" 2 ", "").unwrap();
        registry.add_table("Terrace", "Outside").unwrap();

        assert!(registry.add_table("2", "again").is_err());

        let numbers: Vec<String> = registry.tables().into_iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec!["2", "10", "Terrace"]);

        registry.save(&t2.id, "2", "", items(1), None).unwrap();
        let edited = registry.edit_table(&t2.id, "20", "Back room").unwrap();
        assert_eq!(edited.description, "Back room");
        assert_eq!(registry.session(&t2.id).unwrap().customer_name, "Table 20");

        assert!(registry.edit_table(&t2.id, "10", "").is_err());
        assert!(matches!(
            registry.edit_table("missing", "1", ""),
            Err(CoreError::TableNotFound(_))
        ));

        registry.remove_table(&t2.id).unwrap();
        assert!(registry.is_occupied(&t2.id));
        registry.remove_table(&t10.id).unwrap();
        assert_eq!(registry.tables().len(), 1);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut registry = TableSessionRegistry::new();
        registry.save("t1", "1", "", items(1), None).unwrap();
        registry.save("t2", "2", "", items(2), None).unwrap();

        let mut snapshot = registry.snapshot();
        let ghost = TableSession {
            items: vec![],
            table_id: "t9".to_string(),
            ..snapshot[0].clone()
        };
        snapshot.push(ghost);

        let mut restored = TableSessionRegistry::new();
        restored.restore(snapshot);
        assert_eq!(restored.open_sessions().len(), 2);
        assert!(!restored.is_occupied("t9"));
    }
}
