//! # Sale Commands
//!
//! Tender preview and checkout.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout                                             │
//! │                                                                         │
//! │  1. Look up the loyalty customer (no locks held)                       │
//! │  2. Lock register, then tables                                         │
//! │  3. TransactionDispatcher::prepare()   ← every validation, no mutation │
//! │  4. Database::persist_settlement()     ← order + loyalty, one tx       │
//! │  5. TransactionDispatcher::commit()    ← ledger, cart, table cleanup   │
//! │  6. Re-save drafts                                                     │
//! │                                                                         │
//! │  A failure in 3 or 4 leaves every piece of state untouched.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::draft::{persist_register, persist_tables};
use crate::error::ApiError;
use crate::state::{ConfigState, DbState, Register, RegisterState, TablesState};
use till_core::allocator::{scope_charges, SettlementRequest};
use till_core::cart::subtotal_of;
use till_core::dispatcher::{
    Charges, CheckoutContext, CustomerRef, LineSelection, PaymentIntent, TableRef,
};
use till_core::validation::normalize_customer_key;
use till_core::{
    BalanceStatus, CoreError, DispatchReceipt, Money, OrderType, PaymentAllocator, PaymentMethod,
    TableSessionRegistry, TransactionDispatcher,
};

/// Everything the tender screen submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub order_type: OrderType,
    /// Required for dine-in unless the cart was loaded from a table; must
    /// match that table when both are given.
    pub table_id: Option<String>,
    /// Loyalty customer phone; any punctuation is accepted.
    pub customer_phone: Option<String>,
    pub customer_name: Option<String>,
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub apply_service_fee: bool,
    #[serde(default)]
    pub apply_cover_charge: bool,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub selection: LineSelection,
    #[serde(default)]
    pub tendered: BTreeMap<PaymentMethod, Money>,
    #[serde(default)]
    pub points_requested: i64,
}

impl CheckoutRequest {
    /// Counter sale paying the whole cart.
    pub fn quick_sale(tendered: BTreeMap<PaymentMethod, Money>) -> Self {
        CheckoutRequest {
            order_type: OrderType::QuickSale,
            table_id: None,
            customer_phone: None,
            customer_name: None,
            delivery_address: None,
            apply_service_fee: false,
            apply_cover_charge: false,
            discount: Money::zero(),
            selection: LineSelection::All,
            tendered,
            points_requested: 0,
        }
    }
}

/// Live figures for the tender screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPreview {
    pub subtotal: Money,
    pub service_fee: Money,
    pub cover_charge: Money,
    pub total_due: Money,
    pub tendered: Money,
    pub status: BalanceStatus,
}

/// Computes what the selected lines owe and how the current tenders stand,
/// without failing on underpayment. Points are not considered here.
pub async fn preview_payment(
    register: &RegisterState,
    config: &ConfigState,
    request: &CheckoutRequest,
) -> Result<PaymentPreview, ApiError> {
    let guard = register.lock().await;
    let cart = &guard.cart;

    let items = match &request.selection {
        LineSelection::All => cart.items.clone(),
        LineSelection::Lines(indices) => cart.selected_items(&cart.check_selection(indices)?),
    };
    let charges = charges_for(config, request, cart.subtotal());
    let scoped = scope_charges(
        charges.service_fee,
        charges.cover_charge,
        cart.subtotal(),
        subtotal_of(&items),
    )?;

    let settlement = SettlementRequest {
        subtotal: scoped.subtotal,
        service_fee: scoped.service_fee,
        cover_charge: scoped.cover_charge,
        discount: charges.discount,
        points_discount: Money::zero(),
        tendered: request.tendered.clone(),
    };

    Ok(PaymentPreview {
        subtotal: scoped.subtotal,
        service_fee: scoped.service_fee,
        cover_charge: scoped.cover_charge,
        total_due: settlement.total_due(),
        tendered: settlement.tendered_sum(),
        status: PaymentAllocator::evaluate(&settlement),
    })
}

/// Settles the cart (or the selected lines of it).
///
/// ## Returns
/// The receipt: order, ledger transaction, settlement figures and loyalty
/// points moved.
pub async fn checkout(
    db: &DbState,
    register: &RegisterState,
    tables: &TablesState,
    config: &ConfigState,
    request: CheckoutRequest,
) -> Result<DispatchReceipt, ApiError> {
    debug!(
        order_type = ?request.order_type,
        table_id = ?request.table_id,
        "checkout command"
    );

    let customer = match request.customer_phone.as_deref() {
        Some(phone) if !phone.trim().is_empty() => Some(customer_ref(db, phone).await?),
        _ => None,
    };

    let mut guard = register.lock().await;
    let mut registry = tables.lock().await;
    let Register { ledger, cart } = &mut *guard;

    // A loaded cart settles its own table; a different table id is
    // rejected by prepare()
    let table = match request.table_id.as_deref().or(cart.table_id.as_deref()) {
        Some(id) => Some(table_ref(&registry, id)?),
        None => None,
    };

    let context = CheckoutContext {
        order_type: request.order_type,
        table,
        customer,
        customer_name: request.customer_name.clone(),
        delivery_address: request.delivery_address.clone(),
    };
    let charges = charges_for(config, &request, cart.subtotal());
    let payment = PaymentIntent {
        tendered: request.tendered.clone(),
        points_requested: request.points_requested,
    };

    let plan = TransactionDispatcher::prepare(
        ledger,
        cart,
        &context,
        &charges,
        &request.selection,
        &payment,
        &config.loyalty,
    )?;

    db.inner()
        .persist_settlement(&plan.order, plan.loyalty.as_ref(), plan.points_earned)
        .await?;

    let table_bound = cart.table_id.is_some();
    let receipt = TransactionDispatcher::commit(
        plan,
        ledger,
        cart,
        table_bound.then_some(&mut *registry),
    );

    // The sale is durable at this point; a draft failure must not undo it.
    if let Err(e) = persist_register(db, config, &guard).await {
        warn!(error = %e, "Register draft not saved after checkout");
    }
    if table_bound {
        if let Err(e) = persist_tables(db, config, &registry).await {
            warn!(error = %e, "Table draft not saved after checkout");
        }
    }

    info!(
        order_id = %receipt.order.id,
        order_type = ?receipt.order.order_type,
        status = ?receipt.order.status,
        total = %receipt.settlement.total_due,
        change = %receipt.settlement.change_amount,
        points_redeemed = receipt.points_redeemed,
        points_earned = receipt.points_earned,
        remaining_lines = receipt.remaining_lines,
        "Checkout complete"
    );
    Ok(receipt)
}

/// Whole-cart charges from the configured rules.
fn charges_for(config: &ConfigState, request: &CheckoutRequest, subtotal: Money) -> Charges {
    Charges {
        service_fee: if request.apply_service_fee {
            config.service_fee_for(subtotal)
        } else {
            Money::zero()
        },
        cover_charge: if request.apply_cover_charge {
            config.cover_charge_for(subtotal)
        } else {
            Money::zero()
        },
        discount: request.discount,
    }
}

fn table_ref(registry: &TableSessionRegistry, table_id: &str) -> Result<TableRef, CoreError> {
    let table_number = registry
        .table(table_id)
        .map(|t| t.number.clone())
        .or_else(|| registry.session(table_id).map(|s| s.table_number.clone()))
        .ok_or_else(|| CoreError::TableNotFound(table_id.to_string()))?;

    Ok(TableRef {
        table_id: table_id.to_string(),
        table_number,
    })
}

/// Reads the customer's balance; an unknown phone is a new customer with
/// no points.
async fn customer_ref(db: &DbState, phone: &str) -> Result<CustomerRef, ApiError> {
    let key = normalize_customer_key(phone).map_err(CoreError::from)?;
    let customer = db.inner().loyalty().get_customer(&key).await?;

    Ok(match customer {
        Some(c) => CustomerRef {
            customer_key: c.customer_key,
            name: c.name,
            points_balance: c.points,
        },
        None => CustomerRef {
            customer_key: key,
            name: String::new(),
            points_balance: 0,
        },
    })
}
