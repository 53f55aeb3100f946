//! # Loyalty Repository
//!
//! The points ledger: customer balances, aggregate stats, and an audit
//! trail of every debit and credit.
//!
//! ## Settlement Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    apply_update() (inside the sale transaction)         │
//! │                                                                         │
//! │  1. update_customer_stats ── upsert row, total_spent += sale, visits++ │
//! │  2. debit_points ─────────── redeemed points (fails if balance short)  │
//! │  3. credit_points ────────── points earned on the pre-discount gross   │
//! │                                                                         │
//! │  Each debit/credit also appends a loyalty_movements row.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Customers are keyed by their normalised phone number (digits only, see
//! `till_core::validation::normalize_customer_key`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::{Customer, LoyaltyUpdate, Money};

/// One debit or credit of a customer's points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct LoyaltyMovement {
    pub id: String,
    pub customer_key: String,
    /// Signed: negative for redemptions.
    pub points: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for the loyalty points ledger.
#[derive(Debug, Clone)]
pub struct LoyaltyRepository {
    pool: SqlitePool,
}

impl LoyaltyRepository {
    /// Creates a new LoyaltyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoyaltyRepository { pool }
    }

    /// Gets a customer by key.
    pub async fn get_customer(&self, customer_key: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT customer_key, name, points, total_spent_cents, visit_count, last_visit_at
            FROM loyalty_customers
            WHERE customer_key = ?1
            "#,
        )
        .bind(customer_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Points balance; zero for unknown customers.
    pub async fn balance(&self, customer_key: &str) -> DbResult<i64> {
        let points: Option<i64> =
            sqlx::query_scalar("SELECT points FROM loyalty_customers WHERE customer_key = ?1")
                .bind(customer_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(points.unwrap_or(0))
    }

    /// Registers a customer, or renames an existing one.
    pub async fn register_customer(&self, customer_key: &str, name: &str) -> DbResult<Customer> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO loyalty_customers (
                customer_key, name, points, total_spent_cents, visit_count,
                last_visit_at, created_at, updated_at
            ) VALUES (?1, ?2, 0, 0, 0, NULL, ?3, ?3)
            ON CONFLICT (customer_key) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(customer_key)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_customer(customer_key)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_key))
    }

    /// Takes redeemed points off a balance.
    pub async fn debit_points(&self, customer_key: &str, points: i64, reason: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        debit_points(&mut tx, customer_key, points, reason).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Adds earned points to a balance.
    pub async fn credit_points(&self, customer_key: &str, points: i64, reason: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        credit_points(&mut tx, customer_key, points, reason).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Records a visit: creates the customer if needed, adds the sale to
    /// the total spent and bumps the visit count.
    pub async fn update_customer_stats(
        &self,
        name: &str,
        customer_key: &str,
        sale_total: Money,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_customer_stats(&mut conn, name, customer_key, sale_total).await
    }

    /// Movements of a customer, newest first.
    pub async fn movements(&self, customer_key: &str) -> DbResult<Vec<LoyaltyMovement>> {
        let rows: Vec<LoyaltyMovement> = sqlx::query_as(
            r#"
            SELECT id, customer_key, points, reason, created_at
            FROM loyalty_movements
            WHERE customer_key = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(customer_key)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Connection-level operations (composable inside one transaction)
// =============================================================================

/// Applies everything a settled sale owes the loyalty ledger.
pub(crate) async fn apply_update(
    conn: &mut SqliteConnection,
    update: &LoyaltyUpdate,
    points_earned: i64,
    order_id: &str,
) -> DbResult<()> {
    update_customer_stats(conn, &update.customer_name, &update.customer_key, update.sale_total)
        .await?;
    debit_points(
        conn,
        &update.customer_key,
        update.points_to_debit,
        &format!("redeemed on order {order_id}"),
    )
    .await?;
    credit_points(
        conn,
        &update.customer_key,
        points_earned,
        &format!("earned on order {order_id}"),
    )
    .await?;
    Ok(())
}

pub(crate) async fn debit_points(
    conn: &mut SqliteConnection,
    customer_key: &str,
    points: i64,
    reason: &str,
) -> DbResult<()> {
    if points <= 0 {
        return Ok(());
    }

    let available: Option<i64> =
        sqlx::query_scalar("SELECT points FROM loyalty_customers WHERE customer_key = ?1")
            .bind(customer_key)
            .fetch_optional(&mut *conn)
            .await?;
    let available = available.ok_or_else(|| DbError::not_found("Customer", customer_key))?;

    if available < points {
        return Err(DbError::InsufficientPoints {
            customer_key: customer_key.to_string(),
            requested: points,
            available,
        });
    }

    sqlx::query(
        "UPDATE loyalty_customers SET points = points - ?2, updated_at = ?3 WHERE customer_key = ?1",
    )
    .bind(customer_key)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    insert_movement(conn, customer_key, -points, reason).await?;
    debug!(customer_key = %customer_key, points, "Points debited");
    Ok(())
}

pub(crate) async fn credit_points(
    conn: &mut SqliteConnection,
    customer_key: &str,
    points: i64,
    reason: &str,
) -> DbResult<()> {
    if points <= 0 {
        return Ok(());
    }

    let result = sqlx::query(
        "UPDATE loyalty_customers SET points = points + ?2, updated_at = ?3 WHERE customer_key = ?1",
    )
    .bind(customer_key)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_key));
    }

    insert_movement(conn, customer_key, points, reason).await?;
    debug!(customer_key = %customer_key, points, "Points credited");
    Ok(())
}

pub(crate) async fn update_customer_stats(
    conn: &mut SqliteConnection,
    name: &str,
    customer_key: &str,
    sale_total: Money,
) -> DbResult<()> {
    let now = Utc::now();

    // A blank name never overwrites a known one.
    sqlx::query(
        r#"
        INSERT INTO loyalty_customers (
            customer_key, name, points, total_spent_cents, visit_count,
            last_visit_at, created_at, updated_at
        ) VALUES (?1, ?2, 0, ?3, 1, ?4, ?4, ?4)
        ON CONFLICT (customer_key) DO UPDATE SET
            name = CASE WHEN excluded.name = '' THEN loyalty_customers.name ELSE excluded.name END,
            total_spent_cents = loyalty_customers.total_spent_cents + excluded.total_spent_cents,
            visit_count = loyalty_customers.visit_count + 1,
            last_visit_at = excluded.last_visit_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(customer_key)
    .bind(name.trim())
    .bind(sale_total.cents())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_movement(
    conn: &mut SqliteConnection,
    customer_key: &str,
    points: i64,
    reason: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO loyalty_movements (id, customer_key, points, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(customer_key)
    .bind(points)
    .bind(reason)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    customer_key: String,
    name: String,
    points: i64,
    total_spent_cents: i64,
    visit_count: i64,
    last_visit_at: Option<DateTime<Utc>>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            customer_key: row.customer_key,
            name: row.name,
            points: row.points,
            total_spent: Money::from_cents(row.total_spent_cents),
            visit_count: row.visit_count,
            last_visit_at: row.last_visit_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
