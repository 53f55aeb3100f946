//! # Cart Commands
//!
//! Commands for cart manipulation. Every mutation re-saves the cart draft.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│  Tender  │────►│ Settled  │       │
//! │  │  Cart    │     │          │     │  Screen  │     │  Order   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │       ▲                │                 │                              │
//! │       │           add_to_cart       checkout                           │
//! │       │           update_cart_item  (sale.rs)                          │
//! │       │           remove_from_cart                                      │
//! │       │                │                                                │
//! │       │                ├──► save_table (table.rs): park on a table     │
//! │       │                ▼                                                │
//! │       └──────────  clear_cart                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::draft::persist_cart;
use crate::error::ApiError;
use crate::state::{CartTotals, ConfigState, DbState, RegisterState};
use till_core::{Cart, CartItem, Money, SelectedExtra};

/// Cart response including items and totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        CartResponse {
            items: cart.items.clone(),
            totals: CartTotals::from(cart),
        }
    }
}

/// A product line as the front end sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub extras: Vec<SelectedExtra>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub needs_preparation: bool,
}

impl From<AddItemRequest> for CartItem {
    fn from(request: AddItemRequest) -> Self {
        CartItem {
            product_id: request.product_id,
            name: request.name,
            unit_price: request.unit_price,
            quantity: request.quantity,
            selected_extras: request.extras,
            notes: request.notes.trim().to_string(),
            needs_preparation: request.needs_preparation,
        }
    }
}

/// Gets the current cart contents.
pub async fn get_cart(register: &RegisterState) -> CartResponse {
    debug!("get_cart command");
    register.with_register(|r| CartResponse::from(&r.cart)).await
}

/// Adds a line; an identical configuration merges into the existing line.
pub async fn add_to_cart(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    request: AddItemRequest,
) -> Result<CartResponse, ApiError> {
    debug!(product_id = %request.product_id, quantity = request.quantity, "add_to_cart command");

    let mut guard = register.lock().await;
    guard.cart.add_item(request.into())?;
    persist_cart(db, config, &guard.cart).await?;
    Ok(CartResponse::from(&guard.cart))
}

/// Sets the quantity of a line; zero removes it.
pub async fn update_cart_item(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    index: usize,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(index, quantity, "update_cart_item command");

    let mut guard = register.lock().await;
    guard.cart.update_quantity(index, quantity)?;
    persist_cart(db, config, &guard.cart).await?;
    Ok(CartResponse::from(&guard.cart))
}

/// Removes a line.
pub async fn remove_from_cart(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
    index: usize,
) -> Result<CartResponse, ApiError> {
    debug!(index, "remove_from_cart command");

    let mut guard = register.lock().await;
    guard.cart.remove_line(index)?;
    persist_cart(db, config, &guard.cart).await?;
    Ok(CartResponse::from(&guard.cart))
}

/// Empties the cart.
pub async fn clear_cart(
    db: &DbState,
    register: &RegisterState,
    config: &ConfigState,
) -> Result<CartResponse, ApiError> {
    debug!("clear_cart command");

    let mut guard = register.lock().await;
    guard.cart.clear();
    persist_cart(db, config, &guard.cart).await?;
    Ok(CartResponse::from(&guard.cart))
}
