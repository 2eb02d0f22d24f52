//! # Invoice Service
//!
//! Billing artifacts: standalone or derived from an order.
//!
//! Unpaid is the only editable state. Paid and cancelled invoices are
//! the financial record and can be neither edited nor deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use tally_core::totals::document_totals;
use tally_core::{ChargeParams, CoreError, CoreResult, Invoice, InvoiceStatus, LineItem};
use tally_store::Database;

use crate::events::{AppEvent, EventSink};
use crate::new_id;
use crate::order::validate_document;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewInvoice {
    pub customer_id: Option<String>,
    #[serde(alias = "items")]
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub charges: ChargeParams,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Partial update; only legal while the invoice is unpaid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceUpdate {
    pub customer_id: Option<String>,
    #[serde(alias = "items")]
    pub line_items: Option<Vec<LineItem>>,
    pub charges: Option<ChargeParams>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct InvoiceService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

impl InvoiceService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        InvoiceService { db, events }
    }

    pub fn list(&self) -> Vec<Invoice> {
        self.db.invoices().all()
    }

    pub fn get(&self, id: &str) -> Option<Invoice> {
        self.db.invoices().get(id)
    }

    pub fn create(&self, input: NewInvoice) -> ActionResult<Invoice> {
        let errors = validate_document(&input.line_items, &input.charges);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }

        let now = Utc::now();
        let mut invoice = Invoice {
            id: new_id(),
            order_id: None,
            customer_id: input.customer_id,
            line_items: input.line_items,
            status: InvoiceStatus::Unpaid,
            discount_pct: input.charges.discount_pct,
            discount: input.charges.discount,
            shipping: input.charges.shipping,
            ship_taxable: input.charges.ship_taxable,
            tax_rate: input.charges.tax_rate,
            mfr_coupon: input.charges.mfr_coupon,
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            due_date: input.due_date,
            paid_date: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        apply_totals(&mut invoice);
        ActionResult::from_result(self.try_create(invoice))
    }

    /// Builds an unpaid invoice carrying the order's lines and charges.
    ///
    /// Totals are recomputed rather than copied; the pipeline is
    /// idempotent so the numbers match the order's exactly.
    pub fn create_from_order(
        &self,
        order_id: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> ActionResult<Invoice> {
        ActionResult::from_result(self.try_create_from_order(order_id, due_date))
    }

    pub fn update(&self, id: &str, patch: InvoiceUpdate) -> ActionResult<Invoice> {
        let Some(mut invoice) = self.db.invoices().get(id) else {
            return ActionResult::fail(CoreError::not_found("Invoice", id));
        };
        if invoice.status != InvoiceStatus::Unpaid {
            return ActionResult::fail(CoreError::state_conflict(
                "Invoice",
                id,
                invoice.status.as_str(),
                "edit",
            ));
        }

        if let Some(customer_id) = patch.customer_id {
            invoice.customer_id = Some(customer_id);
        }
        if let Some(line_items) = patch.line_items {
            invoice.line_items = line_items;
        }
        if let Some(charges) = patch.charges {
            invoice.discount_pct = charges.discount_pct;
            invoice.discount = charges.discount;
            invoice.shipping = charges.shipping;
            invoice.ship_taxable = charges.ship_taxable;
            invoice.tax_rate = charges.tax_rate;
            invoice.mfr_coupon = charges.mfr_coupon;
        }
        if let Some(due_date) = patch.due_date {
            invoice.due_date = Some(due_date);
        }
        if let Some(notes) = patch.notes {
            invoice.notes = Some(notes);
        }

        let errors = validate_document(&invoice.line_items, &invoice.charges());
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        apply_totals(&mut invoice);
        invoice.updated_at = Utc::now();
        ActionResult::from_result(self.try_save(invoice))
    }

    /// Unpaid → paid, stamping the payment date.
    pub fn mark_paid(&self, id: &str) -> ActionResult<Invoice> {
        ActionResult::from_result(self.try_mark_paid(id))
    }

    /// Unpaid → cancelled. Paid invoices stay paid.
    pub fn cancel(&self, id: &str) -> ActionResult<Invoice> {
        ActionResult::from_result(self.try_cancel(id))
    }

    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, invoice: Invoice) -> CoreResult<Invoice> {
        self.check_customer(invoice.customer_id.as_deref())?;

        info!(id = %invoice.id, total = invoice.total, "Creating invoice");
        let created = invoice.clone();
        self.db
            .invoices()
            .mutate(move |items| items.push(invoice))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_create_from_order(
        &self,
        order_id: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> CoreResult<Invoice> {
        let order = self
            .db
            .orders()
            .get(order_id)
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        let now = Utc::now();
        let mut invoice = Invoice {
            id: new_id(),
            order_id: Some(order.id.clone()),
            customer_id: order.customer_id.clone(),
            line_items: order.line_items.clone(),
            status: InvoiceStatus::Unpaid,
            discount_pct: order.discount_pct,
            discount: order.discount,
            shipping: order.shipping,
            ship_taxable: order.ship_taxable,
            tax_rate: order.tax_rate,
            mfr_coupon: order.mfr_coupon,
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            due_date,
            paid_date: None,
            notes: order.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        apply_totals(&mut invoice);
        self.try_create(invoice)
    }

    fn try_save(&self, invoice: Invoice) -> CoreResult<Invoice> {
        self.check_customer(invoice.customer_id.as_deref())?;

        let saved = invoice.clone();
        self.db
            .invoices()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|i| i.id == invoice.id) {
                    *slot = invoice;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn try_mark_paid(&self, id: &str) -> CoreResult<Invoice> {
        let mut invoice = self
            .db
            .invoices()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Invoice", id))?;
        if invoice.status != InvoiceStatus::Unpaid {
            return Err(CoreError::state_conflict(
                "Invoice",
                id,
                invoice.status.as_str(),
                "mark paid",
            ));
        }

        let now = Utc::now();
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_date = Some(now);
        invoice.updated_at = now;

        info!(id = %id, total = invoice.total, "Invoice paid");
        let saved = self.persist(invoice)?;
        self.events.emit(AppEvent::InvoicePaid {
            invoice_id: id.to_string(),
        });
        Ok(saved)
    }

    fn try_cancel(&self, id: &str) -> CoreResult<Invoice> {
        let mut invoice = self
            .db
            .invoices()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Invoice", id))?;
        if invoice.status != InvoiceStatus::Unpaid {
            return Err(CoreError::state_conflict(
                "Invoice",
                id,
                invoice.status.as_str(),
                "cancel",
            ));
        }

        invoice.status = InvoiceStatus::Cancelled;
        invoice.updated_at = Utc::now();
        info!(id = %id, "Invoice cancelled");
        self.persist(invoice)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let invoice = self
            .db
            .invoices()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Invoice", id))?;
        if invoice.status != InvoiceStatus::Unpaid {
            return Err(CoreError::state_conflict(
                "Invoice",
                id,
                invoice.status.as_str(),
                "delete",
            ));
        }

        self.db
            .invoices()
            .mutate(|items| items.retain(|i| i.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    /// Writes an invoice back without re-running document validation
    /// (status-only transitions).
    fn persist(&self, invoice: Invoice) -> CoreResult<Invoice> {
        let saved = invoice.clone();
        self.db
            .invoices()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|i| i.id == invoice.id) {
                    *slot = invoice;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
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

fn apply_totals(invoice: &mut Invoice) {
    let totals = document_totals(&invoice.line_items, &invoice.charges());
    invoice.subtotal = totals.subtotal;
    invoice.tax = totals.tax;
    invoice.total = totals.total;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::order::{NewOrder, OrderService};
    use tally_core::DiscountType;
    use tally_store::MemoryStore;

    fn service() -> (InvoiceService, OrderService, Arc<RecordingSink>) {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        let sink = Arc::new(RecordingSink::default());
        (
            InvoiceService::new(db.clone(), sink.clone()),
            OrderService::new(db, sink.clone()),
            sink,
        )
    }

    fn line(qty: i64, price: f64) -> LineItem {
        LineItem {
            product_id: None,
            name: "Service call".to_string(),
            qty,
            price,
            discount: 0.0,
            discount_type: DiscountType::Percent,
            tax_rate: 0.0,
        }
    }

    #[test]
    fn test_create_unpaid_with_totals() {
        let (invoices, _, _) = service();
        let result = invoices.create(NewInvoice {
            line_items: vec![line(2, 50.0)],
            charges: ChargeParams {
                tax_rate: 0.07,
                ..Default::default()
            },
            ..Default::default()
        });

        let invoice = result.data.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.subtotal, 100.0);
        assert_eq!(invoice.tax, 7.0);
        assert_eq!(invoice.total, 107.0);
        assert!(invoice.paid_date.is_none());
    }

    #[test]
    fn test_create_from_order_matches_order_totals() {
        let (invoices, orders, _) = service();
        let order = orders
            .create(NewOrder {
                line_items: vec![line(3, 40.0)],
                charges: ChargeParams {
                    discount_pct: 10.0,
                    shipping: 10.0,
                    ship_taxable: true,
                    tax_rate: 0.07,
                    ..Default::default()
                },
                notes: Some("rush job".to_string()),
                ..Default::default()
            })
            .data
            .unwrap();

        let invoice = invoices
            .create_from_order(&order.id, None)
            .data
            .unwrap();
        assert_eq!(invoice.order_id.as_deref(), Some(order.id.as_str()));
        assert_eq!(invoice.subtotal, order.subtotal);
        assert_eq!(invoice.tax, order.tax);
        assert_eq!(invoice.total, order.total);
        assert_eq!(invoice.notes.as_deref(), Some("rush job"));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
    }

    #[test]
    fn test_create_from_unknown_order() {
        let (invoices, _, _) = service();
        let result = invoices.create_from_order("nope", None);
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "Order not found: nope");
    }

    #[test]
    fn test_mark_paid_stamps_date_and_emits() {
        let (invoices, _, sink) = service();
        let id = invoices
            .create(NewInvoice {
                line_items: vec![line(1, 99.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        let result = invoices.mark_paid(&id);
        let invoice = result.data.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.paid_date.is_some());
        assert_eq!(sink.names(), vec!["invoice:paid"]);
    }

    #[test]
    fn test_paid_is_terminal() {
        let (invoices, _, _) = service();
        let id = invoices
            .create(NewInvoice {
                line_items: vec![line(1, 99.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        invoices.mark_paid(&id);

        assert!(!invoices.mark_paid(&id).success);
        assert!(!invoices.cancel(&id).success);
        assert!(!invoices.delete(&id).success);
        let result = invoices.update(&id, InvoiceUpdate::default());
        assert_eq!(
            result.error.unwrap(),
            format!("Invoice {id} is paid, cannot edit")
        );
    }

    #[test]
    fn test_update_unpaid_recomputes() {
        let (invoices, _, _) = service();
        let id = invoices
            .create(NewInvoice {
                line_items: vec![line(1, 100.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        let result = invoices.update(
            &id,
            InvoiceUpdate {
                line_items: Some(vec![line(2, 100.0)]),
                ..Default::default()
            },
        );
        assert_eq!(result.data.unwrap().total, 200.0);
    }

    #[test]
    fn test_delete_unpaid_only() {
        let (invoices, _, _) = service();
        let id = invoices
            .create(NewInvoice {
                line_items: vec![line(1, 10.0)],
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        assert!(invoices.delete(&id).success);
        assert!(invoices.get(&id).is_none());
    }
}
