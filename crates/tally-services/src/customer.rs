//! # Customer Service
//!
//! Customer CRUD. Deletion is blocked while open documents still
//! reference the customer; the financial trail outlives the record.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use tally_core::validation::validate_customer;
use tally_core::{
    CoreError, CoreResult, Customer, InvoiceStatus, RentalStatus, SubscriptionStatus,
};
use tally_store::Database;

use crate::events::EventSink;
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct CustomerService {
    db: Arc<Database>,
    #[allow(dead_code)]
    events: Arc<dyn EventSink>,
}

impl CustomerService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        CustomerService { db, events }
    }

    pub fn list(&self) -> Vec<Customer> {
        self.db.customers().all()
    }

    pub fn get(&self, id: &str) -> Option<Customer> {
        self.db.customers().get(id)
    }

    pub fn create(&self, input: NewCustomer) -> ActionResult<Customer> {
        let customer = Customer {
            id: new_id(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            notes: input.notes,
            created_at: Utc::now(),
        };

        let errors = validate_customer(&customer);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_create(customer))
    }

    pub fn update(&self, id: &str, patch: CustomerUpdate) -> ActionResult<Customer> {
        let Some(mut customer) = self.db.customers().get(id) else {
            return ActionResult::fail(CoreError::not_found("Customer", id));
        };

        if let Some(name) = patch.name {
            customer.name = name;
        }
        if let Some(email) = patch.email {
            customer.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            customer.phone = Some(phone);
        }
        if let Some(notes) = patch.notes {
            customer.notes = Some(notes);
        }

        let errors = validate_customer(&customer);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.persist(customer))
    }

    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, customer: Customer) -> CoreResult<Customer> {
        info!(id = %customer.id, name = %customer.name, "Creating customer");
        let created = customer.clone();
        self.db
            .customers()
            .mutate(move |items| items.push(customer))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let customer = self
            .db
            .customers()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Customer", id))?;

        if let Some(reason) = self.open_reference(id) {
            return Err(CoreError::DeleteBlocked {
                entity: "Customer",
                id: id.to_string(),
                reason: reason.to_string(),
            });
        }

        info!(id = %id, name = %customer.name, "Deleting customer");
        self.db
            .customers()
            .mutate(|items| items.retain(|c| c.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    /// The first open document still referencing the customer, if any.
    /// Terminal documents (fulfilled/cancelled orders, paid invoices,
    /// returned rentals, cancelled subscriptions) don't block deletion.
    fn open_reference(&self, id: &str) -> Option<&'static str> {
        let open_order = self.db.orders().with(|items| {
            items
                .iter()
                .any(|o| o.customer_id.as_deref() == Some(id) && !o.status.is_terminal())
        });
        if open_order {
            return Some("an open order references them");
        }
        let unpaid_invoice = self.db.invoices().with(|items| {
            items.iter().any(|i| {
                i.customer_id.as_deref() == Some(id) && i.status == InvoiceStatus::Unpaid
            })
        });
        if unpaid_invoice {
            return Some("an unpaid invoice references them");
        }
        let open_rental = self.db.rentals().with(|items| {
            items.iter().any(|r| {
                r.customer_id.as_deref() == Some(id) && r.status != RentalStatus::Returned
            })
        });
        if open_rental {
            return Some("an open rental references them");
        }
        let live_subscription = self.db.subscriptions().with(|items| {
            items.iter().any(|s| {
                s.customer_id.as_deref() == Some(id)
                    && s.status != SubscriptionStatus::Cancelled
            })
        });
        if live_subscription {
            return Some("a live subscription references them");
        }
        None
    }

    fn persist(&self, customer: Customer) -> CoreResult<Customer> {
        let saved = customer.clone();
        self.db
            .customers()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|c| c.id == customer.id) {
                    *slot = customer;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
