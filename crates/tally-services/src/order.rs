//! # Order Service
//!
//! Order lifecycle and the totals pipeline cache.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Order Lifecycle                                  │
//! │                                                                         │
//! │   create ──► DRAFT ──submit──► PENDING ──confirm──► CONFIRMED          │
//! │                │                  │                     │               │
//! │                │                  └───────fulfill───────┤               │
//! │                │                                        ▼               │
//! │                │                                   FULFILLED            │
//! │                │                                   (stock deducted,     │
//! │                └──cancel (any non-terminal)──►     terminal)            │
//! │                             CANCELLED (terminal)                        │
//! │                                                                         │
//! │   Totals (subtotal/tax/total) are recomputed after every edit; the     │
//! │   pipeline is idempotent so recomputing is always safe.                │
//! │                                                                         │
//! │   Fulfillment is all-or-nothing: EVERY product-backed line is          │
//! │   checked for stock before ANY deduction happens.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use tally_core::totals::document_totals;
use tally_core::validation::{validate_charges, validate_line_items, FieldErrors};
use tally_core::{
    stock, ChargeParams, CoreError, CoreResult, LineItem, Order, OrderStatus, Product,
};
use tally_store::Database;

use crate::events::{AppEvent, EventSink};
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    pub customer_id: Option<String>,
    #[serde(alias = "items")]
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub charges: ChargeParams,
    pub notes: Option<String>,
}

/// Partial update; rejected once the order reaches a terminal state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderUpdate {
    pub customer_id: Option<String>,
    #[serde(alias = "items")]
    pub line_items: Option<Vec<LineItem>>,
    pub charges: Option<ChargeParams>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct OrderService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

impl OrderService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        OrderService { db, events }
    }

    pub fn list(&self) -> Vec<Order> {
        self.db.orders().all()
    }

    pub fn get(&self, id: &str) -> Option<Order> {
        self.db.orders().get(id)
    }

    pub fn create(&self, input: NewOrder) -> ActionResult<Order> {
        let now = Utc::now();
        let mut order = Order {
            id: new_id(),
            customer_id: input.customer_id,
            line_items: input.line_items,
            status: OrderStatus::Draft,
            discount_pct: input.charges.discount_pct,
            discount: input.charges.discount,
            shipping: input.charges.shipping,
            ship_taxable: input.charges.ship_taxable,
            tax_rate: input.charges.tax_rate,
            mfr_coupon: input.charges.mfr_coupon,
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            notes: input.notes,
            created_at: now,
            updated_at: now,
            fulfilled_at: None,
        };

        let errors = validate_document(&order.line_items, &order.charges());
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        apply_totals(&mut order);
        ActionResult::from_result(self.try_create(order))
    }

    pub fn update(&self, id: &str, patch: OrderUpdate) -> ActionResult<Order> {
        let Some(mut order) = self.db.orders().get(id) else {
            return ActionResult::fail(CoreError::not_found("Order", id));
        };
        if order.status.is_terminal() {
            return ActionResult::fail(CoreError::state_conflict(
                "Order",
                id,
                order.status.as_str(),
                "edit",
            ));
        }

        if let Some(customer_id) = patch.customer_id {
            order.customer_id = Some(customer_id);
        }
        if let Some(line_items) = patch.line_items {
            order.line_items = line_items;
        }
        if let Some(charges) = patch.charges {
            order.discount_pct = charges.discount_pct;
            order.discount = charges.discount;
            order.shipping = charges.shipping;
            order.ship_taxable = charges.ship_taxable;
            order.tax_rate = charges.tax_rate;
            order.mfr_coupon = charges.mfr_coupon;
        }
        if let Some(notes) = patch.notes {
            order.notes = Some(notes);
        }

        let errors = validate_document(&order.line_items, &order.charges());
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        apply_totals(&mut order);
        order.updated_at = Utc::now();
        ActionResult::from_result(self.try_save(order))
    }

    /// Draft → pending.
    pub fn submit(&self, id: &str) -> ActionResult<Order> {
        ActionResult::from_result(self.try_transition(id, OrderStatus::Pending, "submit"))
    }

    /// Draft/pending → confirmed.
    pub fn confirm(&self, id: &str) -> ActionResult<Order> {
        ActionResult::from_result(self.try_transition(id, OrderStatus::Confirmed, "confirm"))
    }

    /// Any non-terminal state → cancelled. No stock effect.
    pub fn cancel(&self, id: &str) -> ActionResult<Order> {
        ActionResult::from_result(self.try_transition(id, OrderStatus::Cancelled, "cancel"))
    }

    /// Deducts stock for every product-backed line and marks the order
    /// fulfilled.
    ///
    /// With a location, deduction happens at that location; without one,
    /// each product's aggregate stock is consumed. Sufficiency for every
    /// line is verified before anything is deducted.
    pub fn fulfill(&self, id: &str, location_id: Option<&str>) -> ActionResult<Order> {
        ActionResult::from_result(self.try_fulfill(id, location_id))
    }

    /// Drafts are scratch paper and may be deleted; anything further
    /// along must be cancelled instead so the record survives.
    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, order: Order) -> CoreResult<Order> {
        self.check_customer(order.customer_id.as_deref())?;

        info!(id = %order.id, total = order.total, "Creating order");
        let created = order.clone();
        self.db
            .orders()
            .mutate(move |items| items.push(order))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_save(&self, order: Order) -> CoreResult<Order> {
        self.check_customer(order.customer_id.as_deref())?;

        let saved = order.clone();
        self.db
            .orders()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|o| o.id == order.id) {
                    *slot = order;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn try_transition(
        &self,
        id: &str,
        next: OrderStatus,
        operation: &'static str,
    ) -> CoreResult<Order> {
        let mut order = self
            .db
            .orders()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Order", id))?;
        if !order.status.can_transition_to(next) {
            return Err(CoreError::state_conflict(
                "Order",
                id,
                order.status.as_str(),
                operation,
            ));
        }

        order.status = next;
        order.updated_at = Utc::now();
        info!(id = %id, status = next.as_str(), "Order transition");
        self.try_save(order)
    }

    fn try_fulfill(&self, id: &str, location_id: Option<&str>) -> CoreResult<Order> {
        let order = self
            .db
            .orders()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Order", id))?;
        if !order.status.can_transition_to(OrderStatus::Fulfilled) {
            return Err(CoreError::state_conflict(
                "Order",
                id,
                order.status.as_str(),
                "fulfill",
            ));
        }
        if let Some(location_id) = location_id {
            let location = self
                .db
                .locations()
                .get(location_id)
                .ok_or_else(|| CoreError::not_found("Location", location_id))?;
            if !location.is_active {
                return Err(CoreError::InactiveLocation {
                    name: location.name,
                });
            }
        }

        // Units required per product: one product may span several lines.
        let mut required: HashMap<String, i64> = HashMap::new();
        for item in &order.line_items {
            if let Some(product_id) = &item.product_id {
                *required.entry(product_id.clone()).or_default() += item.qty;
            }
        }

        // Deduct against clones first so an insufficient line anywhere
        // leaves every product untouched.
        let now = Utc::now();
        let mut deducted: Vec<Product> = Vec::with_capacity(required.len());
        for (product_id, units) in &required {
            let mut product = self
                .db
                .products()
                .get(product_id)
                .ok_or_else(|| CoreError::not_found("Product", product_id.as_str()))?;
            match location_id {
                Some(location_id) => stock::consume_units_at(&mut product, location_id, *units)?,
                None => {
                    stock::consume_units(&mut product, *units)?;
                    stock::update_product_total_stock(&mut product);
                }
            }
            product.updated_at = now;
            deducted.push(product);
        }

        self.db
            .products()
            .mutate(move |items| {
                for product in deducted {
                    if let Some(slot) = items.iter_mut().find(|p| p.id == product.id) {
                        *slot = product;
                    }
                }
            })
            .map_err(store_fault)?;

        let mut fulfilled = order;
        fulfilled.status = OrderStatus::Fulfilled;
        fulfilled.fulfilled_at = Some(now);
        fulfilled.updated_at = now;

        let saved = fulfilled.clone();
        self.db
            .orders()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|o| o.id == fulfilled.id) {
                    *slot = fulfilled;
                }
            })
            .map_err(store_fault)?;

        info!(id = %id, lines = saved.line_items.len(), "Order fulfilled");
        for product_id in required.into_keys() {
            self.events
                .emit(AppEvent::ProductStockChanged { product_id });
        }
        self.events.emit(AppEvent::OrderFulfilled {
            order_id: id.to_string(),
        });
        Ok(saved)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let order = self
            .db
            .orders()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Order", id))?;
        if order.status != OrderStatus::Draft {
            return Err(CoreError::state_conflict(
                "Order",
                id,
                order.status.as_str(),
                "delete",
            ));
        }

        self.db
            .orders()
            .mutate(|items| items.retain(|o| o.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    fn check_customer(&self, customer_id: Option<&str>) -> CoreResult<()> {
        if let Some(customer_id) = customer_id {
            if !self.db.customers().contains(customer_id) {
                return Err(CoreError::not_found("Customer", customer_id));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Shared Document Helpers
// =============================================================================

/// Structural validation shared by orders and invoices.
pub(crate) fn validate_document(items: &[LineItem], charges: &ChargeParams) -> FieldErrors {
    let mut errors = validate_line_items(items);
    errors.extend(validate_charges(charges));
    errors
}

fn apply_totals(order: &mut Order) {
    let totals = document_totals(&order.line_items, &order.charges());
    order.subtotal = totals.subtotal;
    order.tax = totals.tax;
    order.total = totals.total;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::product::{NewProduct, ProductService};
    use tally_core::DiscountType;
    use tally_store::MemoryStore;

    fn service() -> (OrderService, ProductService, Arc<RecordingSink>) {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        let sink = Arc::new(RecordingSink::default());
        (
            OrderService::new(db.clone(), sink.clone()),
            ProductService::new(db, sink.clone()),
            sink,
        )
    }

    fn line(product_id: Option<&str>, qty: i64, price: f64) -> LineItem {
        LineItem {
            product_id: product_id.map(str::to_string),
            name: "Line".to_string(),
            qty,
            price,
            discount: 0.0,
            discount_type: DiscountType::Percent,
            tax_rate: 0.0,
        }
    }

    #[test]
    fn test_create_computes_totals() {
        let (orders, _, _) = service();
        let result = orders.create(NewOrder {
            line_items: vec![line(None, 2, 50.0)],
            charges: ChargeParams {
                discount_pct: 10.0,
                discount: 5.0,
                shipping: 10.0,
                ship_taxable: false,
                tax_rate: 0.07,
                mfr_coupon: 0.0,
            },
            ..Default::default()
        });

        let order = result.data.unwrap();
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.subtotal, 100.0);
        // (100 × 0.9 − 5) = 85 → tax 5.95 → total 100.95
        assert_eq!(order.tax, 5.95);
        assert_eq!(order.total, 100.95);
    }

    #[test]
    fn test_update_recomputes_totals() {
        let (orders, _, _) = service();
        let id = orders
            .create(NewOrder {
                line_items: vec![line(None, 1, 100.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        let result = orders.update(
            &id,
            OrderUpdate {
                charges: Some(ChargeParams {
                    tax_rate: 0.07,
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let order = result.data.unwrap();
        assert_eq!(order.tax, 7.0);
        assert_eq!(order.total, 107.0);
    }

    #[test]
    fn test_unknown_customer_rejected() {
        let (orders, _, _) = service();
        let result = orders.create(NewOrder {
            customer_id: Some("ghost".to_string()),
            line_items: vec![line(None, 1, 10.0)],
            ..Default::default()
        });
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "Customer not found: ghost");
    }

    #[test]
    fn test_invalid_charges_rejected() {
        let (orders, _, _) = service();
        let result = orders.create(NewOrder {
            line_items: vec![line(None, 1, 10.0)],
            charges: ChargeParams {
                discount_pct: 150.0,
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(!result.success);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("discountPct")));
    }

    #[test]
    fn test_status_walk_and_terminal_rejection() {
        let (orders, _, _) = service();
        let id = orders
            .create(NewOrder {
                line_items: vec![line(None, 1, 10.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        assert!(orders.submit(&id).success);
        assert!(orders.confirm(&id).success);
        assert!(orders.fulfill(&id, None).success);

        // Terminal: no edits, no cancel, no re-fulfill
        assert!(!orders.cancel(&id).success);
        assert!(!orders.fulfill(&id, None).success);
        let result = orders.update(&id, OrderUpdate::default());
        assert!(result.error.unwrap().contains("cannot edit"));
    }

    #[test]
    fn test_no_skipping_backwards() {
        let (orders, _, _) = service();
        let id = orders
            .create(NewOrder {
                line_items: vec![line(None, 1, 10.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        orders.confirm(&id);

        let result = orders.submit(&id);
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap(),
            format!("Order {id} is confirmed, cannot submit")
        );
    }

    #[test]
    fn test_fulfill_deducts_aggregate_stock() {
        let (orders, products, sink) = service();
        let product_id = products
            .create(NewProduct {
                name: "Widget".to_string(),
                qty: 5,
                units_per_package: 12,
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        let id = orders
            .create(NewOrder {
                line_items: vec![line(Some(&product_id), 20, 9.99)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        orders.submit(&id);

        let result = orders.fulfill(&id, None);
        let order = result.data.unwrap();
        assert_eq!(order.status, OrderStatus::Fulfilled);
        assert!(order.fulfilled_at.is_some());

        // 60 units − 20 = 40 → 3 pkg + 4 loose
        let product = products.get(&product_id).unwrap();
        assert_eq!(product.total_units(), 40);
        assert_eq!(product.qty, 3);
        assert_eq!(product.loose_units, 4);

        assert_eq!(
            sink.names(),
            vec!["product:stock-changed", "order:fulfilled"]
        );
    }

    #[test]
    fn test_fulfill_all_or_nothing() {
        let (orders, products, _) = service();
        let plenty = products
            .create(NewProduct {
                name: "Plenty".to_string(),
                qty: 100,
                units_per_package: 1,
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        let scarce = products
            .create(NewProduct {
                name: "Scarce".to_string(),
                qty: 1,
                units_per_package: 1,
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        let id = orders
            .create(NewOrder {
                line_items: vec![line(Some(&plenty), 10, 1.0), line(Some(&scarce), 5, 1.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        orders.submit(&id);

        let result = orders.fulfill(&id, None);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Insufficient stock"));

        // Neither product was touched
        assert_eq!(products.get(&plenty).unwrap().qty, 100);
        assert_eq!(products.get(&scarce).unwrap().qty, 1);
        assert_eq!(
            orders.get(&id).unwrap().status,
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_fulfill_sums_lines_for_same_product() {
        let (orders, products, _) = service();
        let product_id = products
            .create(NewProduct {
                name: "Widget".to_string(),
                qty: 10,
                units_per_package: 1,
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        // Two lines totalling 12 units against 10 on hand
        let id = orders
            .create(NewOrder {
                line_items: vec![
                    line(Some(&product_id), 8, 1.0),
                    line(Some(&product_id), 4, 1.0),
                ],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        orders.submit(&id);

        let result = orders.fulfill(&id, None);
        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("available 10 units, requested 12 units"));
    }

    #[test]
    fn test_delete_draft_only() {
        let (orders, _, _) = service();
        let id = orders
            .create(NewOrder {
                line_items: vec![line(None, 1, 10.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        orders.submit(&id);
        assert!(!orders.delete(&id).success);

        orders.cancel(&id);
        assert!(orders.get(&id).is_some());
    }

    #[test]
    fn test_delete_draft_succeeds() {
        let (orders, _, _) = service();
        let id = orders
            .create(NewOrder {
                line_items: vec![line(None, 1, 10.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        assert!(orders.delete(&id).success);
        assert!(orders.get(&id).is_none());
    }
}
