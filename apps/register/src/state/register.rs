//! # Register State
//!
//! The cashier ledger and the in-progress cart of one terminal.
//!
//! ## Thread Safety
//! Ledger and cart share one `Arc<Mutex<Register>>`: a sale touches both,
//! and every operation of a cashier session must be serialised. The mutex
//! is tokio's because checkout holds it across the database write.
//!
//! ## Lock Order
//! ```text
//! RegisterState ──► TablesState      (never the other way round)
//! ```
//!
//! ## Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Register State Operations                            │
//! │                                                                         │
//! │  Operator Action          Command                 State Change          │
//! │  ───────────────          ───────                 ────────────          │
//! │                                                                         │
//! │  Open drawer ────────────► open_cashier() ──────► ledger.open()        │
//! │                                                                         │
//! │  Tap product ────────────► add_to_cart() ───────► cart.add_item()      │
//! │                                                                         │
//! │  Take payment ───────────► checkout() ──────────► ledger.append()      │
//! │                                                   cart cleanup         │
//! │                                                                         │
//! │  Close drawer ───────────► close_cashier() ─────► adjustments, close   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use till_core::{Cart, CashierLedger, Money};

/// Ledger and cart of a terminal.
#[derive(Debug, Default)]
pub struct Register {
    pub ledger: CashierLedger,
    pub cart: Cart,
}

impl Register {
    /// Rebuilds a register from restored drafts.
    pub fn restore(ledger: CashierLedger, cart: Cart) -> Self {
        Register { ledger, cart }
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
        }
    }
}

/// Shared register state.
#[derive(Debug, Clone, Default)]
pub struct RegisterState {
    inner: Arc<Mutex<Register>>,
}

impl RegisterState {
    /// Creates a closed register with an empty cart.
    pub fn new() -> Self {
        RegisterState::default()
    }

    /// Wraps an already restored register.
    pub fn from_register(register: Register) -> Self {
        RegisterState {
            inner: Arc::new(Mutex::new(register)),
        }
    }

    /// Locks the register for a multi-step operation.
    pub async fn lock(&self) -> MutexGuard<'_, Register> {
        self.inner.lock().await
    }

    /// Executes a function with read access to the register.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = register.with_register(|r| CartTotals::from(&r.cart)).await;
    /// ```
    pub async fn with_register<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Register) -> R,
    {
        let register = self.inner.lock().await;
        f(&register)
    }

    /// Executes a function with write access to the register.
    pub async fn with_register_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Register) -> R,
    {
        let mut register = self.inner.lock().await;
        f(&mut register)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::CartItem;

    #[tokio::test]
    async fn test_with_register_mut_is_visible_to_readers() {
        let state = RegisterState::new();

        state
            .with_register_mut(|r| {
                r.cart
                    .add_item(CartItem::new("p-1", "Soda", Money::from_cents(600), 2, false))
            })
            .await
            .unwrap();

        let totals = state.with_register(|r| CartTotals::from(&r.cart)).await;
        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.total_quantity, 2);
        assert_eq!(totals.subtotal, Money::from_cents(1200));
    }

    #[tokio::test]
    async fn test_clones_share_the_register() {
        let state = RegisterState::new();
        let other = state.clone();

        other
            .with_register_mut(|r| r.ledger.open("Ana", Money::from_cents(10_000)).map(|_| ()))
            .await
            .unwrap();

        assert!(state.with_register(|r| r.ledger.is_open()).await);
    }
}
