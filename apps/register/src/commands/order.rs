//! # Order Commands
//!
//! Kitchen queue: pending orders and their hand-over.

use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use till_core::{OrderRecord, OrderStatus};

/// Orders in a status, oldest first.
pub async fn list_orders(
    db: &DbState,
    status: OrderStatus,
    limit: Option<u32>,
) -> Result<Vec<OrderRecord>, ApiError> {
    debug!(status = ?status, "list_orders command");
    let limit = limit.unwrap_or(50).min(500);
    Ok(db.inner().orders().list_by_status(status, limit).await?)
}

/// Gets one order.
pub async fn get_order(db: &DbState, order_id: &str) -> Result<OrderRecord, ApiError> {
    db.inner()
        .orders()
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))
}

/// Marks a kitchen order as handed over.
pub async fn mark_order_delivered(db: &DbState, order_id: &str) -> Result<OrderRecord, ApiError> {
    debug!(order_id = %order_id, "mark_order_delivered command");

    let delivered_at = db.inner().orders().mark_delivered(order_id).await?;
    info!(order_id = %order_id, %delivered_at, "Order delivered");

    get_order(db, order_id).await
}
