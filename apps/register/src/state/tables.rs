//! # Tables State
//!
//! The table registry of a terminal: configured tables plus open sessions.
//! Locked after `RegisterState` whenever both are needed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use till_core::{TableConfig, TableSession, TableSessionRegistry};

/// A configured table together with its occupancy, for floor views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub table: TableConfig,
    pub session: Option<TableSession>,
}

impl TableView {
    pub fn is_occupied(&self) -> bool {
        self.session.is_some()
    }
}

/// Shared table registry.
#[derive(Debug, Clone, Default)]
pub struct TablesState {
    inner: Arc<Mutex<TableSessionRegistry>>,
}

impl TablesState {
    pub fn new() -> Self {
        TablesState::default()
    }

    /// Wraps an already restored registry.
    pub fn from_registry(registry: TableSessionRegistry) -> Self {
        TablesState {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Locks the registry for a multi-step operation.
    pub async fn lock(&self) -> MutexGuard<'_, TableSessionRegistry> {
        self.inner.lock().await
    }

    /// Configured tables with their sessions, ordered by number.
    pub async fn floor(&self) -> Vec<TableView> {
        let registry = self.inner.lock().await;
        registry
            .tables()
            .into_iter()
            .map(|table| TableView {
                session: registry.session(&table.id).cloned(),
                table,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{CartItem, Money};

    #[tokio::test]
    async fn test_floor_reports_occupancy() {
        let state = TablesState::new();
        let (two, ten) = {
            let mut registry = state.lock().await;
            let ten = registry.add_table("10", "").unwrap();
            let two = registry.add_table("2", "Window").unwrap();
            registry
                .save(
                    &two.id,
                    &two.number,
                    "",
                    vec![CartItem::new("p-1", "Tea", Money::from_cents(500), 1, false)],
                    None,
                )
                .unwrap();
            (two, ten)
        };

        let floor = state.floor().await;
        assert_eq!(floor.len(), 2);
        assert_eq!(floor[0].table, two);
        assert!(floor[0].is_occupied());
        assert_eq!(floor[1].table, ten);
        assert!(!floor[1].is_occupied());
    }
}
