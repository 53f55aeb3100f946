//! # Database State
//!
//! Wraps the `Database` handle for use in register commands.
//!
//! ## Thread Safety
//! The `Database` from `till-db` holds a `SqlitePool`, which is already
//! thread-safe: commands run queries concurrently without extra locking.

use till_db::Database;

/// Wrapper around `Database` for register state management.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let customer = db_state.inner().loyalty().get_customer(&key).await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
