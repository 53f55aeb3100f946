//! # Transaction Dispatcher
//!
//! Turns a paid checkout into its effects: one ledger transaction, one
//! order routed to the kitchen or marked delivered, one loyalty update, and
//! the cart/table cleanup.
//!
//! ## Validate, Then Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  prepare()  ── reads ledger, cart ──► DispatchPlan   (may fail)        │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  caller persists plan.order + plan.loyalty in ONE db transaction       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  commit()   ── writes ledger, cart, tables ──► DispatchReceipt         │
//! │                                              (cannot fail)             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! If `prepare` or the persistence step fails, no in-memory state has been
//! touched. The caller must hold its locks from `prepare` through `commit`
//! so the plan still matches the cart it was built from.
//!
//! Table cleanup follows the cart's own binding (`Cart::table_id`), never
//! the table named by the caller: a checkout can only close or trim the
//! session its lines were loaded from.
//!
//! ## Smart Dispatch
//! An order goes to the kitchen (`Pending`) when any settled line needs
//! preparation; otherwise it is handed over at once (`Delivered`).

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::allocator::{scope_charges, PaymentAllocator, Settlement, SettlementRequest};
use crate::cart::{subtotal_of, Cart, CartItem};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::{CashierLedger, TransactionMeta};
use crate::loyalty::{LoyaltyPolicy, LoyaltyUpdate, Redemption};
use crate::money::Money;
use crate::tables::TableSessionRegistry;
use crate::types::{
    default_table_customer, CashTransaction, OrderRecord, OrderStatus, OrderType, PaymentMethod,
    TransactionKind,
};
use crate::validation::validate_amount;

/// Customer name on orders nobody claimed.
pub const WALK_IN_CUSTOMER: &str = "Walk-in";

// =============================================================================
// Inputs
// =============================================================================

/// The table a checkout settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableRef {
    pub table_id: String,
    pub table_number: String,
}

/// Loyalty customer attached to a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRef {
    /// Normalised phone number.
    pub customer_key: String,
    pub name: String,
    /// Points balance read from the loyalty ledger before checkout.
    pub points_balance: i64,
}

/// Who and where a checkout is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutContext {
    pub order_type: OrderType,
    pub table: Option<TableRef>,
    pub customer: Option<CustomerRef>,
    /// Name printed on the order; falls back to the loyalty customer, then
    /// the table label.
    pub customer_name: Option<String>,
    pub delivery_address: Option<String>,
}

impl CheckoutContext {
    /// Counter sale with nobody attached.
    pub fn quick_sale() -> Self {
        CheckoutContext {
            order_type: OrderType::QuickSale,
            table: None,
            customer: None,
            customer_name: None,
            delivery_address: None,
        }
    }

    /// Settlement of a table's session.
    pub fn dine_in(table: TableRef) -> Self {
        CheckoutContext {
            order_type: OrderType::DineIn,
            table: Some(table),
            ..CheckoutContext::quick_sale()
        }
    }

    /// Explicit name, else the loyalty customer's name; blanks are ignored.
    fn claimed_name(&self) -> Option<String> {
        let explicit = self.customer_name.as_deref().map(str::trim);
        let loyalty = self.customer.as_ref().map(|c| c.name.trim());
        explicit
            .filter(|n| !n.is_empty())
            .or(loyalty.filter(|n| !n.is_empty()))
            .map(str::to_string)
    }

    fn resolved_customer_name(&self) -> String {
        self.claimed_name().unwrap_or_else(|| match &self.table {
            Some(table) => default_table_customer(&table.table_number),
            None => WALK_IN_CUSTOMER.to_string(),
        })
    }
}

/// Whole-cart charges, before any line selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Charges {
    pub service_fee: Money,
    pub cover_charge: Money,
    pub discount: Money,
}

/// Which cart lines are being paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", content = "indices", rename_all = "snake_case")]
pub enum LineSelection {
    #[default]
    All,
    /// Partial settlement of the given line indices.
    Lines(Vec<usize>),
}

/// What the customer hands over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentIntent {
    pub tendered: BTreeMap<PaymentMethod, Money>,
    /// Loyalty points the customer wants to redeem; clamped to the balance.
    pub points_requested: i64,
}

// =============================================================================
// Plan & Receipt
// =============================================================================

/// Everything a checkout will do, validated but not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub settlement: Settlement,
    pub redemption: Redemption,
    /// `None` when nothing was tendered (fully paid with points).
    pub transaction: Option<CashTransaction>,
    pub order: OrderRecord,
    pub loyalty: Option<LoyaltyUpdate>,
    pub points_earned: i64,
    /// Settled line indices, ascending.
    settled_lines: Vec<usize>,
    full_settlement: bool,
    table_id: Option<String>,
}

impl DispatchPlan {
    /// Whether the whole cart is being paid.
    pub fn is_full_settlement(&self) -> bool {
        self.full_settlement
    }
}

/// Outcome of a committed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DispatchReceipt {
    pub order: OrderRecord,
    pub transaction: Option<CashTransaction>,
    pub settlement: Settlement,
    pub points_redeemed: i64,
    pub points_earned: i64,
    /// Lines still in the cart (and on the table) after cleanup.
    pub remaining_lines: usize,
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Whether an order made of `items` has to go through the kitchen.
pub fn needs_kitchen(items: &[CartItem]) -> bool {
    items.iter().any(|i| i.needs_preparation)
}

/// Stateless orchestration of a completed payment.
pub struct TransactionDispatcher;

impl TransactionDispatcher {
    /// Validates a checkout and builds its plan. Mutates nothing.
    ///
    /// ## Steps
    /// 1. Ledger must be open, cart non-empty, selection valid
    /// 2. Service fee and cover charge are scoped to the selected lines
    /// 3. Points are redeemed against the customer's balance
    /// 4. The allocator validates the tenders
    /// 5. Transaction, order and loyalty update are built
    ///
    /// ## Errors
    /// - `InvalidState` if the ledger is closed or the context names a table
    ///   other than the one the cart was loaded from
    /// - `Validation`, `LineNotFound`, `Underpayment` or `NoDigitalChange`
    pub fn prepare(
        ledger: &CashierLedger,
        cart: &Cart,
        context: &CheckoutContext,
        charges: &Charges,
        selection: &LineSelection,
        payment: &PaymentIntent,
        policy: &LoyaltyPolicy,
    ) -> CoreResult<DispatchPlan> {
        if !ledger.is_open() {
            return Err(CoreError::invalid_state("cashier is closed"));
        }
        if cart.is_empty() {
            return Err(ValidationError::rule("cart is empty").into());
        }
        validate_amount("service fee", charges.service_fee)?;
        validate_amount("cover charge", charges.cover_charge)?;
        validate_amount("discount", charges.discount)?;

        let (table, delivery_address) = check_context(context)?;
        if let (Some(origin), Some(table)) = (cart.table_id.as_deref(), table) {
            if origin != table.table_id {
                return Err(CoreError::invalid_state(format!(
                    "cart was loaded from another table, not table {}",
                    table.table_number
                )));
            }
        }

        let (settled_lines, full_settlement) = match selection {
            LineSelection::All => ((0..cart.item_count()).collect::<Vec<_>>(), true),
            LineSelection::Lines(indices) => {
                let sorted = cart.check_selection(indices)?;
                let full = sorted.len() == cart.item_count();
                (sorted, full)
            }
        };
        let items = cart.selected_items(&settled_lines);

        let scoped = scope_charges(
            charges.service_fee,
            charges.cover_charge,
            cart.subtotal(),
            subtotal_of(&items),
        )?;

        let redemption = match &context.customer {
            Some(customer) => policy.redeem(payment.points_requested, customer.points_balance),
            None => Redemption::none(),
        };

        let request = SettlementRequest {
            subtotal: scoped.subtotal,
            service_fee: scoped.service_fee,
            cover_charge: scoped.cover_charge,
            discount: charges.discount,
            points_discount: redemption.discount,
            tendered: payment.tendered.clone(),
        };
        let settlement = PaymentAllocator::allocate(&request)?;

        let transaction = if settlement.methods.is_empty() {
            None
        } else {
            Some(ledger.prepare_transaction(
                TransactionKind::Sale,
                settlement.methods.clone(),
                &sale_description(context),
                TransactionMeta::sale(settlement.tendered_sum, settlement.change_amount),
            )?)
        };

        let gross_for_points = scoped.subtotal + scoped.service_fee + scoped.cover_charge;
        let customer_name = context.resolved_customer_name();

        let (loyalty, points_earned) = match &context.customer {
            Some(customer) => (
                Some(LoyaltyUpdate {
                    customer_key: customer.customer_key.clone(),
                    // Table and walk-in labels never become a customer's name
                    customer_name: context.claimed_name().unwrap_or_default(),
                    points_to_debit: redemption.points,
                    gross_for_points,
                    sale_total: settlement.total_due,
                }),
                policy.earn_points(gross_for_points),
            ),
            None => (None, 0),
        };

        let now = Utc::now();
        let (status, delivered_at) = if needs_kitchen(&items) {
            (OrderStatus::Pending, None)
        } else {
            (OrderStatus::Delivered, Some(now))
        };

        let order = OrderRecord {
            id: Uuid::new_v4().to_string(),
            order_type: context.order_type,
            table_id: table.map(|t| t.table_id.clone()),
            table_number: table.map(|t| t.table_number.clone()),
            customer_name,
            customer_key: context.customer.as_ref().map(|c| c.customer_key.clone()),
            delivery_address,
            items,
            subtotal: scoped.subtotal,
            service_fee: scoped.service_fee,
            cover_charge: scoped.cover_charge,
            discount: charges.discount,
            points_discount: redemption.discount,
            points_redeemed: redemption.points,
            total: settlement.total_due,
            payments: settlement.methods.clone(),
            change_amount: settlement.change_amount,
            status,
            created_at: now,
            delivered_at,
        };

        Ok(DispatchPlan {
            settlement,
            redemption,
            transaction,
            order,
            loyalty,
            points_earned,
            settled_lines,
            full_settlement,
            table_id: cart.table_id.clone(),
        })
    }

    /// Applies a plan to the in-memory state.
    ///
    /// Full settlement clears the cart and closes the session the cart was
    /// loaded from; partial settlement removes exactly the settled lines and
    /// re-parks the rest on that table.
    pub fn commit(
        plan: DispatchPlan,
        ledger: &mut CashierLedger,
        cart: &mut Cart,
        tables: Option<&mut TableSessionRegistry>,
    ) -> DispatchReceipt {
        if let Some(tx) = &plan.transaction {
            ledger.append(tx.clone());
        }

        if plan.full_settlement {
            cart.clear();
        } else {
            cart.remove_lines(&plan.settled_lines);
        }

        if let (Some(tables), Some(table_id)) = (tables, plan.table_id.as_deref()) {
            if plan.full_settlement {
                tables.close(table_id);
            } else {
                tables.retain_items(table_id, cart.items.clone());
            }
        }

        DispatchReceipt {
            remaining_lines: cart.item_count(),
            points_redeemed: plan.redemption.points,
            points_earned: plan.points_earned,
            order: plan.order,
            transaction: plan.transaction,
            settlement: plan.settlement,
        }
    }
}

fn check_context(context: &CheckoutContext) -> CoreResult<(Option<&TableRef>, Option<String>)> {
    let delivery_address = context
        .delivery_address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    match context.order_type {
        OrderType::DineIn if context.table.is_none() => {
            Err(ValidationError::required("table").into())
        }
        OrderType::Delivery if delivery_address.is_none() => {
            Err(ValidationError::required("delivery address").into())
        }
        _ => Ok((context.table.as_ref(), delivery_address)),
    }
}

fn sale_description(context: &CheckoutContext) -> String {
    match (context.order_type, &context.table) {
        (OrderType::DineIn, Some(table)) => format!("Table {} sale", table.table_number),
        (OrderType::Delivery, _) => "Delivery sale".to_string(),
        _ => "Quick sale".to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn open_ledger() -> CashierLedger {
        let mut ledger = CashierLedger::new();
        ledger.open("Ana", cents(10000)).unwrap();
        ledger
    }

    fn line(id: &str, price: i64, kitchen: bool) -> CartItem {
        CartItem::new(id, format!("Item {id}"), cents(price), 1, kitchen)
    }

    fn pay(method: PaymentMethod, amount: i64) -> PaymentIntent {
        PaymentIntent {
            tendered: [(method, cents(amount))].into_iter().collect(),
            points_requested: 0,
        }
    }

    fn table3() -> TableRef {
        TableRef {
            table_id: "t3".to_string(),
            table_number: "3".to_string(),
        }
    }

    #[test]
    fn test_quick_sale_with_cash_change() {
        let mut ledger = open_ledger();
        let mut cart = Cart::from_items(vec![line("a", 12000, false)]);

        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Cash, 15000),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert!(ledger.transactions().is_empty());

        let receipt = TransactionDispatcher::commit(plan, &mut ledger, &mut cart, None);
        assert_eq!(receipt.settlement.change_amount.cents(), 3000);
        assert_eq!(receipt.order.status, OrderStatus::Delivered);
        assert!(receipt.order.delivered_at.is_some());
        assert_eq!(receipt.order.customer_name, WALK_IN_CUSTOMER);
        assert!(cart.is_empty());

        let tx = &ledger.transactions()[0];
        assert_eq!(tx.total.cents(), 12000);
        assert_eq!(tx.received_amount, Some(cents(15000)));
        assert_eq!(ledger.cash_in_drawer().cents(), 22000);
    }

    #[test]
    fn test_kitchen_routing() {
        let ledger = open_ledger();
        let cart = Cart::from_items(vec![line("soda", 600, false), line("burger", 2500, true)]);

        let all = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Pix, 3100),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert_eq!(all.order.status, OrderStatus::Pending);
        assert!(all.order.delivered_at.is_none());

        let drinks_only = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::Lines(vec![0]),
            &pay(PaymentMethod::Pix, 600),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert_eq!(drinks_only.order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_partial_settlement_of_two_out_of_five_lines() {
        let mut ledger = open_ledger();
        let items: Vec<CartItem> = (1..=5).map(|i| line(&format!("p{i}"), i * 1000, true)).collect();
        let mut cart = Cart::from_table("t3", items.clone());

        let mut tables = TableSessionRegistry::new();
        tables.save("t3", "3", "", items.clone(), None).unwrap();

        let charges = Charges {
            service_fee: cents(1500),
            cover_charge: Money::zero(),
            discount: Money::zero(),
        };

        // lines 2 and 4 (3000 + 5000) out of 15000: service fee 800
        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::dine_in(table3()),
            &charges,
            &LineSelection::Lines(vec![4, 2]),
            &pay(PaymentMethod::Credit, 8800),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert!(!plan.is_full_settlement());
        assert_eq!(plan.order.service_fee.cents(), 800);
        assert_eq!(plan.order.total.cents(), 8800);

        let receipt = TransactionDispatcher::commit(plan, &mut ledger, &mut cart, Some(&mut tables));
        assert_eq!(receipt.remaining_lines, 3);
        assert_eq!(receipt.order.items, vec![items[2].clone(), items[4].clone()]);

        let expected_rest = vec![items[0].clone(), items[1].clone(), items[3].clone()];
        assert_eq!(cart.items, expected_rest);
        assert_eq!(tables.session("t3").unwrap().items, expected_rest);
    }

    #[test]
    fn test_full_table_settlement_closes_session() {
        let mut ledger = open_ledger();
        let items = vec![line("a", 4000, true)];
        let mut cart = Cart::from_table("t3", items.clone());
        let mut tables = TableSessionRegistry::new();
        tables.save("t3", "3", "Carla", items, None).unwrap();

        let context = CheckoutContext {
            customer_name: Some("Carla".to_string()),
            ..CheckoutContext::dine_in(table3())
        };
        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &context,
            &Charges::default(),
            &LineSelection::Lines(vec![0]),
            &pay(PaymentMethod::Debit, 4000),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert!(plan.is_full_settlement());

        let receipt = TransactionDispatcher::commit(plan, &mut ledger, &mut cart, Some(&mut tables));
        assert_eq!(receipt.order.customer_name, "Carla");
        assert_eq!(receipt.order.table_number.as_deref(), Some("3"));
        assert!(!tables.is_occupied("t3"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_checkout_cannot_name_another_table_than_the_loaded_one() {
        let ledger = open_ledger();
        let cart = Cart::from_table("t3", vec![line("soda", 600, false)]);
        let table7 = TableRef {
            table_id: "t7".to_string(),
            table_number: "7".to_string(),
        };

        let err = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::dine_in(table7),
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Pix, 600),
            &LoyaltyPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn test_quick_sale_of_a_loaded_table_closes_its_session() {
        let mut ledger = open_ledger();
        let items = vec![line("soda", 600, false)];
        let mut cart = Cart::from_table("t3", items.clone());
        let mut tables = TableSessionRegistry::new();
        tables.save("t3", "3", "", items, None).unwrap();

        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Cash, 600),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        TransactionDispatcher::commit(plan, &mut ledger, &mut cart, Some(&mut tables));

        assert!(!tables.is_occupied("t3"));
        assert!(cart.table_id.is_none());
    }

    #[test]
    fn test_unbound_cart_leaves_parked_sessions_alone() {
        let mut ledger = open_ledger();
        let mut cart = Cart::from_items(vec![line("wings", 900, true)]);
        let mut tables = TableSessionRegistry::new();
        tables
            .save("t3", "3", "", vec![line("beer", 1200, false)], None)
            .unwrap();

        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::dine_in(table3()),
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Debit, 900),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        let receipt = TransactionDispatcher::commit(plan, &mut ledger, &mut cart, Some(&mut tables));

        assert_eq!(receipt.order.table_number.as_deref(), Some("3"));
        assert_eq!(tables.session("t3").unwrap().items[0].product_id, "beer");
    }

    #[test]
    fn test_unnamed_loyalty_customer_falls_back_to_table_label() {
        let ledger = open_ledger();
        let cart = Cart::from_table("t3", vec![line("a", 1000, false)]);
        let context = CheckoutContext {
            customer: Some(CustomerRef {
                customer_key: "11987654321".to_string(),
                name: String::new(),
                points_balance: 0,
            }),
            ..CheckoutContext::dine_in(table3())
        };

        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &context,
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Pix, 1000),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert_eq!(plan.order.customer_name, "Table 3");
        assert_eq!(plan.loyalty.unwrap().customer_name, "");

        let walk_in = CheckoutContext {
            order_type: OrderType::QuickSale,
            table: None,
            ..context
        };
        let plan = TransactionDispatcher::prepare(
            &ledger,
            &Cart::from_items(vec![line("a", 1000, false)]),
            &walk_in,
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Pix, 1000),
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert_eq!(plan.order.customer_name, WALK_IN_CUSTOMER);
    }

    #[test]
    fn test_oversized_tender_is_rejected_without_panicking() {
        let ledger = open_ledger();
        let cart = Cart::from_items(vec![line("a", 1000, false)]);
        let payment = PaymentIntent {
            tendered: [
                (PaymentMethod::Cash, cents(i64::MAX)),
                (PaymentMethod::Pix, cents(10)),
            ]
            .into_iter()
            .collect(),
            points_requested: 0,
        };

        let result = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::All,
            &payment,
            &LoyaltyPolicy::default(),
        );
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_loyalty_update_uses_pre_discount_gross() {
        let ledger = open_ledger();
        let cart = Cart::from_items(vec![line("a", 10000, false)]);
        let context = CheckoutContext {
            customer: Some(CustomerRef {
                customer_key: "11987654321".to_string(),
                name: "Dora".to_string(),
                points_balance: 100,
            }),
            ..CheckoutContext::quick_sale()
        };
        let charges = Charges {
            service_fee: cents(1000),
            cover_charge: cents(500),
            discount: cents(1500),
        };
        let payment = PaymentIntent {
            tendered: [(PaymentMethod::Pix, cents(9500))].into_iter().collect(),
            points_requested: 250,
        };

        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &context,
            &charges,
            &LineSelection::All,
            &payment,
            &LoyaltyPolicy::default(),
        )
        .unwrap();

        // 100 points clamped, worth 5.00
        assert_eq!(plan.redemption.points, 100);
        assert_eq!(plan.order.points_discount.cents(), 500);
        assert_eq!(plan.order.total.cents(), 9500);

        let loyalty = plan.loyalty.unwrap();
        assert_eq!(loyalty.points_to_debit, 100);
        assert_eq!(loyalty.gross_for_points.cents(), 11500);
        assert_eq!(loyalty.sale_total.cents(), 9500);
        assert_eq!(loyalty.customer_name, "Dora");
        assert_eq!(plan.points_earned, 115);
    }

    #[test]
    fn test_fully_redeemed_sale_writes_no_transaction() {
        let mut ledger = open_ledger();
        let mut cart = Cart::from_items(vec![line("a", 500, false)]);
        let context = CheckoutContext {
            customer: Some(CustomerRef {
                customer_key: "11987654321".to_string(),
                name: "Dora".to_string(),
                points_balance: 1000,
            }),
            ..CheckoutContext::quick_sale()
        };
        let payment = PaymentIntent {
            tendered: BTreeMap::new(),
            points_requested: 100,
        };

        let plan = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &context,
            &Charges::default(),
            &LineSelection::All,
            &payment,
            &LoyaltyPolicy::default(),
        )
        .unwrap();
        assert!(plan.transaction.is_none());

        let receipt = TransactionDispatcher::commit(plan, &mut ledger, &mut cart, None);
        assert!(receipt.order.total.is_zero());
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn test_prepare_failures_leave_state_untouched() {
        let closed = CashierLedger::new();
        let cart = Cart::from_items(vec![line("a", 1000, false)]);
        assert!(matches!(
            TransactionDispatcher::prepare(
                &closed,
                &cart,
                &CheckoutContext::quick_sale(),
                &Charges::default(),
                &LineSelection::All,
                &pay(PaymentMethod::Cash, 1000),
                &LoyaltyPolicy::default(),
            ),
            Err(CoreError::InvalidState(_))
        ));

        let ledger = open_ledger();
        let underpaid = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Cash, 900),
            &LoyaltyPolicy::default(),
        );
        assert!(matches!(underpaid, Err(CoreError::Underpayment { .. })));

        let bad_line = TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &CheckoutContext::quick_sale(),
            &Charges::default(),
            &LineSelection::Lines(vec![3]),
            &pay(PaymentMethod::Cash, 1000),
            &LoyaltyPolicy::default(),
        );
        assert!(matches!(bad_line, Err(CoreError::LineNotFound { .. })));

        let no_address = CheckoutContext {
            order_type: OrderType::Delivery,
            delivery_address: Some("  ".to_string()),
            ..CheckoutContext::quick_sale()
        };
        assert!(TransactionDispatcher::prepare(
            &ledger,
            &cart,
            &no_address,
            &Charges::default(),
            &LineSelection::All,
            &pay(PaymentMethod::Cash, 1000),
            &LoyaltyPolicy::default(),
        )
        .is_err());

        assert!(ledger.transactions().is_empty());
        assert_eq!(cart.item_count(), 1);
    }
}
