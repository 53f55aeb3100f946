//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite, plus the one
//! multi-repository write: persisting a settled sale.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Register startup                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers don't block
//! the writer and the last committed sale survives a crash.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::draft::DraftRepository;
use crate::repository::loyalty::{apply_update, LoyaltyRepository};
use crate::repository::order::{insert_order, OrderRepository};
use crate::repository::table::TableRepository;
use till_core::{LoyaltyUpdate, OrderRecord};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/till.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (plenty for one register)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection that never idles out: the database lives exactly
    /// as long as that connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; every repository shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures WAL mode, NORMAL synchronous, foreign keys
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            // Safe from corruption; may lose the last transaction on power loss
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the order repository.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Returns the loyalty repository.
    pub fn loyalty(&self) -> LoyaltyRepository {
        LoyaltyRepository::new(self.pool.clone())
    }

    /// Returns the draft repository.
    pub fn drafts(&self) -> DraftRepository {
        DraftRepository::new(self.pool.clone())
    }

    /// Returns the table configuration repository.
    pub fn tables(&self) -> TableRepository {
        TableRepository::new(self.pool.clone())
    }

    /// Persists a settled sale: the order and, when a customer is attached,
    /// the loyalty update.
    ///
    /// ## Atomicity
    /// ```text
    /// BEGIN
    ///   INSERT INTO orders ...
    ///   upsert customer stats
    ///   debit redeemed points      ← fails if the balance moved underneath
    ///   credit earned points
    /// COMMIT                       ← all or nothing
    /// ```
    pub async fn persist_settlement(
        &self,
        order: &OrderRecord,
        loyalty_update: Option<&LoyaltyUpdate>,
        points_earned: i64,
    ) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        insert_order(&mut tx, order).await?;

        if let Some(update) = loyalty_update {
            apply_update(&mut tx, update, points_earned, &order.id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            order_id = %order.id,
            total = %order.total,
            customer_key = ?order.customer_key,
            points_earned,
            "Settlement persisted"
        );
        Ok(())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use till_core::{CartItem, Money, OrderStatus, OrderType};

    const KEY: &str = "11987654321";

    fn order(points_redeemed: i64) -> OrderRecord {
        OrderRecord {
            id: uuid::Uuid::new_v4().to_string(),
            order_type: OrderType::QuickSale,
            table_id: None,
            table_number: None,
            customer_name: "Dora".to_string(),
            customer_key: Some(KEY.to_string()),
            delivery_address: None,
            items: vec![CartItem::new("p-1", "Juice", Money::from_cents(1000), 1, false)],
            subtotal: Money::from_cents(1000),
            service_fee: Money::zero(),
            cover_charge: Money::zero(),
            discount: Money::zero(),
            points_discount: Money::from_cents(points_redeemed * 5),
            points_redeemed,
            total: Money::from_cents(1000 - points_redeemed * 5),
            payments: vec![],
            change_amount: Money::zero(),
            status: OrderStatus::Delivered,
            created_at: Utc::now(),
            delivered_at: Some(Utc::now()),
        }
    }

    fn update(points_to_debit: i64) -> LoyaltyUpdate {
        LoyaltyUpdate {
            customer_key: KEY.to_string(),
            customer_name: "Dora".to_string(),
            points_to_debit,
            gross_for_points: Money::from_cents(1000),
            sale_total: Money::from_cents(1000 - points_to_debit * 5),
        }
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/till.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_persist_settlement_applies_order_and_loyalty() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = order(0);

        db.persist_settlement(&order, Some(&update(0)), 10).await.unwrap();

        assert!(db.orders().get_by_id(&order.id).await.unwrap().is_some());
        let customer = db.loyalty().get_customer(KEY).await.unwrap().unwrap();
        assert_eq!(customer.points, 10);
        assert_eq!(customer.visit_count, 1);
    }

    #[tokio::test]
    async fn test_persist_settlement_rolls_back_on_short_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.loyalty().register_customer(KEY, "Dora").await.unwrap();
        db.loyalty().credit_points(KEY, 5, "earned").await.unwrap();

        let order = order(20);
        let result = db.persist_settlement(&order, Some(&update(20)), 10).await;
        assert!(matches!(result, Err(DbError::InsufficientPoints { .. })));

        assert!(db.orders().get_by_id(&order.id).await.unwrap().is_none());
        let customer = db.loyalty().get_customer(KEY).await.unwrap().unwrap();
        assert_eq!(customer.points, 5);
        assert_eq!(customer.visit_count, 0);
    }
}
