//! # tally-services: UI-Facing Service Layer for Tally
//!
//! The invocation contract: one service per entity, every operation
//! returning an [`ActionResult`] envelope the UI can render directly.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI Collaborator                                                        │
//! │       │  plain-data DTOs in, { success, data, error } out              │
//! │       ▼                                                                 │
//! │  ★ tally-services (THIS CRATE) ★                                        │
//! │                                                                         │
//! │   ProductService    TransferService    OrderService    ...             │
//! │       │                  │                  │                           │
//! │       │   structural → business → state validation,                    │
//! │       │   ALL before any mutation                                      │
//! │       ▼                  ▼                  ▼                           │
//! │  tally-core (pure rules)      tally-store (snapshots)                  │
//! │                                                                         │
//! │   after persist: AppEvent through the EventSink                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Services never panic for expected failures; everything expected
//!   arrives in the envelope.
//! - Ids are UUID v4 strings minted here, never by the caller.
//! - Timestamps come from `Utc::now()` at the boundary; pure derivations
//!   (overdue, billing-due) take `now` as a parameter instead.

pub mod customer;
pub mod events;
pub mod invoice;
pub mod location;
pub mod order;
pub mod product;
pub mod rental;
pub mod result;
pub mod subscription;
pub mod transfer;

pub use customer::{CustomerService, CustomerUpdate, NewCustomer};
pub use events::{AppEvent, EventSink, NullSink, RecordingSink};
pub use invoice::{InvoiceService, InvoiceUpdate, NewInvoice};
pub use location::{LocationService, LocationUpdate, NewLocation};
pub use order::{NewOrder, OrderService, OrderUpdate};
pub use product::{NewProduct, ProductService, ProductUpdate, ReorderSuggestion};
pub use rental::{NewRental, RentalService, RentalUpdate};
pub use result::ActionResult;
pub use subscription::{NewSubscription, SubscriptionService, SubscriptionUpdate};
pub use transfer::{NewTransfer, TransferService, TransferUpdate};

use std::sync::Arc;

use tally_store::Database;
use uuid::Uuid;

/// Every service over one database, for hosts that want the whole set.
pub struct Services {
    pub products: ProductService,
    pub locations: LocationService,
    pub transfers: TransferService,
    pub orders: OrderService,
    pub invoices: InvoiceService,
    pub rentals: RentalService,
    pub subscriptions: SubscriptionService,
    pub customers: CustomerService,
}

impl Services {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        Services {
            products: ProductService::new(db.clone(), events.clone()),
            locations: LocationService::new(db.clone(), events.clone()),
            transfers: TransferService::new(db.clone(), events.clone()),
            orders: OrderService::new(db.clone(), events.clone()),
            invoices: InvoiceService::new(db.clone(), events.clone()),
            rentals: RentalService::new(db.clone(), events.clone()),
            subscriptions: SubscriptionService::new(db.clone(), events.clone()),
            customers: CustomerService::new(db, events),
        }
    }

    /// Services with no event subscribers.
    pub fn without_events(db: Arc<Database>) -> Self {
        Services::new(db, Arc::new(NullSink))
    }
}

/// Mints an entity id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::MemoryStore;

    #[test]
    fn test_services_share_one_database() {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        let services = Services::without_events(db);

        let customer = services
            .customers
            .create(NewCustomer {
                name: "Ada".to_string(),
                ..Default::default()
            })
            .data
            .unwrap();

        // Another service sees the customer through the shared database
        let order = services.orders.create(NewOrder {
            customer_id: Some(customer.id),
            ..Default::default()
        });
        assert!(order.success);
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
