//! # Order Repository
//!
//! Durable store of the orders created by completed sales.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  checkout ──► add_order()                                               │
//! │                   │                                                     │
//! │                   ├── status = delivered ──► done (handed over)         │
//! │                   │                                                     │
//! │                   └── status = pending ──► kitchen queue                │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                     mark_delivered() ──► delivered      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines and tenders are frozen at sale time and stored as JSON columns;
//! they are never edited afterwards.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{CartItem, MethodAmount, Money, OrderRecord, OrderStatus, OrderType};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Stores a new order.
    pub async fn add_order(&self, order: &OrderRecord) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_order(&mut conn, order).await
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OrderRecord>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(OrderRecord::try_from).transpose()
    }

    /// Orders with a given status, oldest first (the kitchen queue for
    /// `Pending`).
    pub async fn list_by_status(&self, status: OrderStatus, limit: u32) -> DbResult<Vec<OrderRecord>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE status = ?1 ORDER BY created_at LIMIT ?2"
        ))
        .bind(status)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRecord::try_from).collect()
    }

    /// Marks a pending order as handed over.
    ///
    /// ## Errors
    /// `NotFound` if the order does not exist or is already delivered.
    pub async fn mark_delivered(&self, id: &str) -> DbResult<DateTime<Utc>> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'delivered',
                delivered_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (pending)", id));
        }

        debug!(id = %id, "Order delivered");
        Ok(now)
    }

    /// Number of stored orders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Inserts an order on an existing connection (or open transaction).
pub(crate) async fn insert_order(conn: &mut SqliteConnection, order: &OrderRecord) -> DbResult<()> {
    debug!(id = %order.id, status = ?order.status, total = %order.total, "Inserting order");

    let items_json = serde_json::to_string(&order.items)?;
    let payments_json = serde_json::to_string(&order.payments)?;

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_type, table_id, table_number,
            customer_name, customer_key, delivery_address,
            items_json, subtotal_cents, service_fee_cents, cover_charge_cents,
            discount_cents, points_discount_cents, points_redeemed, total_cents,
            payments_json, change_cents, status, created_at, delivered_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7,
            ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19, ?20
        )
        "#,
    )
    .bind(&order.id)
    .bind(order.order_type)
    .bind(&order.table_id)
    .bind(&order.table_number)
    .bind(&order.customer_name)
    .bind(&order.customer_key)
    .bind(&order.delivery_address)
    .bind(items_json)
    .bind(order.subtotal.cents())
    .bind(order.service_fee.cents())
    .bind(order.cover_charge.cents())
    .bind(order.discount.cents())
    .bind(order.points_discount.cents())
    .bind(order.points_redeemed)
    .bind(order.total.cents())
    .bind(payments_json)
    .bind(order.change_amount.cents())
    .bind(order.status)
    .bind(order.created_at)
    .bind(order.delivered_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

const SELECT_ORDER: &str = r#"
    SELECT
        id, order_type, table_id, table_number,
        customer_name, customer_key, delivery_address,
        items_json, subtotal_cents, service_fee_cents, cover_charge_cents,
        discount_cents, points_discount_cents, points_redeemed, total_cents,
        payments_json, change_cents, status, created_at, delivered_at
    FROM orders
"#;

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    order_type: OrderType,
    table_id: Option<String>,
    table_number: Option<String>,
    customer_name: String,
    customer_key: Option<String>,
    delivery_address: Option<String>,
    items_json: String,
    subtotal_cents: i64,
    service_fee_cents: i64,
    cover_charge_cents: i64,
    discount_cents: i64,
    points_discount_cents: i64,
    points_redeemed: i64,
    total_cents: i64,
    payments_json: String,
    change_cents: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let items: Vec<CartItem> = serde_json::from_str(&row.items_json)?;
        let payments: Vec<MethodAmount> = serde_json::from_str(&row.payments_json)?;

        Ok(OrderRecord {
            id: row.id,
            order_type: row.order_type,
            table_id: row.table_id,
            table_number: row.table_number,
            customer_name: row.customer_name,
            customer_key: row.customer_key,
            delivery_address: row.delivery_address,
            items,
            subtotal: Money::from_cents(row.subtotal_cents),
            service_fee: Money::from_cents(row.service_fee_cents),
            cover_charge: Money::from_cents(row.cover_charge_cents),
            discount: Money::from_cents(row.discount_cents),
            points_discount: Money::from_cents(row.points_discount_cents),
            points_redeemed: row.points_redeemed,
            total: Money::from_cents(row.total_cents),
            payments,
            change_amount: Money::from_cents(row.change_cents),
            status: row.status,
            created_at: row.created_at,
            delivered_at: row.delivered_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use till_core::PaymentMethod;

    fn sample_order(status: OrderStatus) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: uuid::Uuid::new_v4().to_string(),
            order_type: OrderType::DineIn,
            table_id: Some("t3".to_string()),
            table_number: Some("3".to_string()),
            customer_name: "Table 3".to_string(),
            customer_key: None,
            delivery_address: None,
            items: vec![CartItem::new("p-1", "Burger", Money::from_cents(2500), 2, true)],
            subtotal: Money::from_cents(5000),
            service_fee: Money::from_cents(500),
            cover_charge: Money::zero(),
            discount: Money::zero(),
            points_discount: Money::zero(),
            points_redeemed: 0,
            total: Money::from_cents(5500),
            payments: vec![MethodAmount::new(PaymentMethod::Cash, Money::from_cents(6000))],
            change_amount: Money::from_cents(500),
            status,
            created_at: now,
            delivered_at: (status == OrderStatus::Delivered).then_some(now),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = sample_order(OrderStatus::Pending);

        db.orders().add_order(&order).await.unwrap();
        let loaded = db.orders().get_by_id(&order.id).await.unwrap().unwrap();

        assert_eq!(loaded.items, order.items);
        assert_eq!(loaded.payments, order.payments);
        assert_eq!(loaded.total, order.total);
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.order_type, OrderType::DineIn);
        assert!(db.orders().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_kitchen_queue_and_delivery() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let pending = sample_order(OrderStatus::Pending);
        db.orders().add_order(&pending).await.unwrap();
        db.orders()
            .add_order(&sample_order(OrderStatus::Delivered))
            .await
            .unwrap();

        let queue = db.orders().list_by_status(OrderStatus::Pending, 10).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, pending.id);

        db.orders().mark_delivered(&pending.id).await.unwrap();
        assert!(db
            .orders()
            .list_by_status(OrderStatus::Pending, 10)
            .await
            .unwrap()
            .is_empty());

        let again = db.orders().mark_delivered(&pending.id).await;
        assert!(matches!(again, Err(DbError::NotFound { .. })));
        assert_eq!(db.orders().count().await.unwrap(), 2);
    }
}
