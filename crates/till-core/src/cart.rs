//! # Cart
//!
//! The in-progress checkout: lines with extras and notes, plus the
//! line-selection helpers used by partial settlement.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Operation               Cart Change           │
//! │  ───────────────          ─────────               ───────────           │
//! │                                                                         │
//! │  Tap product ────────────► add_item() ──────────► push / merge line    │
//! │  Change quantity ────────► update_quantity() ───► items[i].qty = n     │
//! │  Remove line ────────────► remove_line() ───────► items.remove(i)      │
//! │  Pay selected lines ─────► remove_lines() ──────► drop settled lines   │
//! │  Finish sale ────────────► clear() ─────────────► items.clear()        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are owned by value: loading a table into the cart or parking the
//! cart on a table copies the lines, never shares them. A loaded cart
//! remembers the table it came from, so checkout cleans up that table and
//! no other.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_amount, validate_cart_size, validate_extras_count, validate_item_name,
    validate_quantity,
};
use crate::MAX_ITEM_QUANTITY;

/// An extra/add-on chosen for a line (extra cheese, no onion, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SelectedExtra {
    pub id: String,
    pub name: String,
    pub price: Money,
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    /// Product name at time of adding (frozen).
    pub name: String,
    /// Unit price at time of adding (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    pub selected_extras: Vec<SelectedExtra>,
    pub notes: String,
    /// Whether the kitchen has to prepare this line.
    pub needs_preparation: bool,
}

impl CartItem {
    /// Creates a plain line with no extras or notes.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        needs_preparation: bool,
    ) -> Self {
        CartItem {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            selected_extras: Vec::new(),
            notes: String::new(),
            needs_preparation,
        }
    }

    /// Unit price plus the price of every selected extra.
    pub fn unit_total(&self) -> Money {
        self.unit_price + self.selected_extras.iter().map(|e| e.price).sum::<Money>()
    }

    /// `(unit_price + Σ extras) × quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_total().multiply_quantity(self.quantity)
    }

    /// Two lines merge when product, extras and notes are identical.
    fn same_configuration(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id
            && self.unit_price == other.unit_price
            && self.notes == other.notes
            && self.needs_preparation == other.needs_preparation
            && self.selected_extras == other.selected_extras
    }

    fn validate(&self) -> CoreResult<()> {
        validate_item_name(&self.name)?;
        validate_quantity(self.quantity)?;
        validate_amount("unit price", self.unit_price)?;
        validate_extras_count(self.selected_extras.len())?;
        for extra in &self.selected_extras {
            validate_amount("extra price", extra.price)?;
        }
        Ok(())
    }
}

/// Sum of the line totals of a slice of lines.
pub fn subtotal_of(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

/// The checkout cart.
///
/// ## Invariants
/// - Every line has a quantity in `1..=MAX_ITEM_QUANTITY`
/// - Identical configurations are merged into one line
/// - At most `MAX_CART_ITEMS` lines
/// - `table_id` is set only while the lines are a loaded table session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    /// When the cart was created/last cleared.
    pub created_at: DateTime<Utc>,
    /// Table whose session was loaded into this cart.
    #[serde(default)]
    pub table_id: Option<String>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
            table_id: None,
        }
    }

    /// Creates a cart holding copies of `items`, bound to no table.
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Cart {
            items,
            created_at: Utc::now(),
            table_id: None,
        }
    }

    /// Creates a cart from a table session's lines, bound to that table.
    pub fn from_table(table_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        Cart {
            table_id: Some(table_id.into()),
            ..Cart::from_items(items)
        }
    }

    /// Adds a line, merging it into an identical existing line.
    pub fn add_item(&mut self, item: CartItem) -> CoreResult<()> {
        item.validate()?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.same_configuration(&item)) {
            let new_qty = existing.quantity + item.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_ITEM_QUANTITY,
                }
                .into());
            }
            existing.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.items.len())?;
        self.items.push(item);
        Ok(())
    }

    /// Updates the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            self.remove_line(index)?;
            return Ok(());
        }

        validate_quantity(quantity)?;
        let len = self.items.len();
        let line = self
            .items
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index, len })?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a single line and returns it. Removing the last line of a
    /// loaded table releases the table binding; the session itself is only
    /// changed by saving or settling.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<CartItem> {
        if index >= self.items.len() {
            return Err(CoreError::LineNotFound {
                index,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(index);
        if self.items.is_empty() {
            self.table_id = None;
        }
        Ok(removed)
    }

    /// Validates a selection of line indices: non-empty, unique, in range.
    ///
    /// ## Returns
    /// The indices sorted ascending.
    pub fn check_selection(&self, indices: &[usize]) -> CoreResult<Vec<usize>> {
        if indices.is_empty() {
            return Err(ValidationError::rule("select at least one cart line").into());
        }

        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        if unique.len() != indices.len() {
            return Err(ValidationError::rule("cart line selected more than once").into());
        }

        if let Some(&index) = unique.iter().find(|&&i| i >= self.items.len()) {
            return Err(CoreError::LineNotFound {
                index,
                len: self.items.len(),
            });
        }

        Ok(unique.into_iter().collect())
    }

    /// Copies of the selected lines, in cart order.
    pub fn selected_items(&self, sorted_indices: &[usize]) -> Vec<CartItem> {
        sorted_indices
            .iter()
            .filter_map(|&i| self.items.get(i).cloned())
            .collect()
    }

    /// Removes exactly the given lines; the rest keep their order and
    /// contents. Indices that are out of range are ignored.
    pub fn remove_lines(&mut self, indices: &[usize]) -> Vec<CartItem> {
        let selected: BTreeSet<usize> = indices.iter().copied().collect();
        let mut removed = Vec::with_capacity(selected.len());
        let mut kept = Vec::with_capacity(self.items.len());

        for (i, item) in self.items.drain(..).enumerate() {
            if selected.contains(&i) {
                removed.push(item);
            } else {
                kept.push(item);
            }
        }

        self.items = kept;
        removed
    }

    /// Clears all lines and the table binding.
    pub fn clear(&mut self) {
        self.items.clear();
        self.table_id = None;
        self.created_at = Utc::now();
    }

    /// Returns the number of lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Subtotal of the whole cart.
    pub fn subtotal(&self) -> Money {
        subtotal_of(&self.items)
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
