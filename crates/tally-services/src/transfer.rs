//! # Transfer Service
//!
//! The transfer engine: moving a product's stock between two locations
//! through a strict pending → completed/cancelled state machine.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transfer Lifecycle                                 │
//! │                                                                         │
//! │   create ──► PENDING ──complete──► COMPLETED (stock moves, terminal)   │
//! │                 │                                                       │
//! │                 └──────cancel────► CANCELLED (no stock effect,         │
//! │                                               terminal)                 │
//! │                                                                         │
//! │   Only PENDING transfers can be edited, completed, cancelled or        │
//! │   deleted. Stock is checked at creation AND re-checked at completion:  │
//! │   the world may have changed while the transfer sat pending.           │
//! │                                                                         │
//! │   Completion conserves units: deduct-from-source and add-to-dest are   │
//! │   the same amounts, so Σ units across locations never changes.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use tally_core::validation::validate_transfer;
use tally_core::{stock, CoreError, CoreResult, Product, Transfer, TransferStatus, ValidationError};
use tally_store::Database;

use crate::events::{AppEvent, EventSink};
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTransfer {
    pub product_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    /// Whole packages to move.
    pub quantity: i64,
    /// Loose units to move.
    pub loose_units: i64,
    pub notes: Option<String>,
}

/// Partial update; only legal while the transfer is pending.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferUpdate {
    pub from_location_id: Option<String>,
    pub to_location_id: Option<String>,
    pub quantity: Option<i64>,
    pub loose_units: Option<i64>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct TransferService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

impl TransferService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        TransferService { db, events }
    }

    pub fn list(&self) -> Vec<Transfer> {
        self.db.transfers().all()
    }

    pub fn get(&self, id: &str) -> Option<Transfer> {
        self.db.transfers().get(id)
    }

    pub fn create(&self, input: NewTransfer) -> ActionResult<Transfer> {
        let transfer = Transfer {
            id: new_id(),
            product_id: input.product_id,
            from_location_id: input.from_location_id,
            to_location_id: input.to_location_id,
            quantity: input.quantity,
            loose_units: input.loose_units,
            status: TransferStatus::Pending,
            notes: input.notes,
            created_at: Utc::now(),
            completed_at: None,
        };

        let errors = validate_transfer(&transfer);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_create(transfer))
    }

    pub fn update(&self, id: &str, patch: TransferUpdate) -> ActionResult<Transfer> {
        let Some(mut transfer) = self.db.transfers().get(id) else {
            return ActionResult::fail(CoreError::not_found("Transfer", id));
        };
        if transfer.status != TransferStatus::Pending {
            return ActionResult::fail(CoreError::state_conflict(
                "Transfer",
                id,
                transfer.status.as_str(),
                "edit",
            ));
        }

        if let Some(from_location_id) = patch.from_location_id {
            transfer.from_location_id = from_location_id;
        }
        if let Some(to_location_id) = patch.to_location_id {
            transfer.to_location_id = to_location_id;
        }
        if let Some(quantity) = patch.quantity {
            transfer.quantity = quantity;
        }
        if let Some(loose_units) = patch.loose_units {
            transfer.loose_units = loose_units;
        }
        if let Some(notes) = patch.notes {
            transfer.notes = Some(notes);
        }

        let errors = validate_transfer(&transfer);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_save(transfer))
    }

    /// Moves the stock and marks the transfer completed.
    pub fn complete(&self, id: &str) -> ActionResult<Transfer> {
        ActionResult::from_result(self.try_complete(id))
    }

    /// Abandons a pending transfer without touching stock.
    pub fn cancel(&self, id: &str, reason: Option<&str>) -> ActionResult<Transfer> {
        ActionResult::from_result(self.try_cancel(id, reason))
    }

    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, transfer: Transfer) -> CoreResult<Transfer> {
        self.check_business(&transfer)?;

        info!(
            id = %transfer.id,
            product_id = %transfer.product_id,
            from = %transfer.from_location_id,
            to = %transfer.to_location_id,
            "Creating transfer"
        );
        let created = transfer.clone();
        self.db
            .transfers()
            .mutate(move |items| items.push(transfer))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_save(&self, transfer: Transfer) -> CoreResult<Transfer> {
        self.check_business(&transfer)?;

        let saved = transfer.clone();
        self.db
            .transfers()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|t| t.id == transfer.id) {
                    *slot = transfer;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn try_complete(&self, id: &str) -> CoreResult<Transfer> {
        let transfer = self
            .db
            .transfers()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Transfer", id))?;
        if transfer.status != TransferStatus::Pending {
            return Err(CoreError::state_conflict(
                "Transfer",
                id,
                transfer.status.as_str(),
                "complete",
            ));
        }

        // Re-validate: stock or locations may have changed since creation.
        let mut product = self.check_business(&transfer)?;
        let now = Utc::now();

        stock::deduct_at(
            &mut product,
            &transfer.from_location_id,
            transfer.quantity,
            transfer.loose_units,
        )?;
        stock::add_at(
            &mut product,
            &transfer.to_location_id,
            transfer.quantity,
            transfer.loose_units,
        );
        stock::update_product_total_stock(&mut product);
        product.updated_at = now;

        // Product first; if this write fails the transfer stays pending.
        let product_id = product.id.clone();
        self.db
            .products()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|p| p.id == product.id) {
                    *slot = product;
                }
            })
            .map_err(store_fault)?;

        let mut completed = transfer;
        completed.status = TransferStatus::Completed;
        completed.completed_at = Some(now);

        let saved = completed.clone();
        self.db
            .transfers()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|t| t.id == completed.id) {
                    *slot = completed;
                }
            })
            .map_err(store_fault)?;

        info!(id = %id, product_id = %product_id, "Transfer completed");
        self.events
            .emit(AppEvent::ProductStockChanged { product_id });
        self.events.emit(AppEvent::TransferCompleted {
            transfer_id: id.to_string(),
        });
        Ok(saved)
    }

    fn try_cancel(&self, id: &str, reason: Option<&str>) -> CoreResult<Transfer> {
        let transfer = self
            .db
            .transfers()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Transfer", id))?;
        if transfer.status != TransferStatus::Pending {
            return Err(CoreError::state_conflict(
                "Transfer",
                id,
                transfer.status.as_str(),
                "cancel",
            ));
        }

        let mut cancelled = transfer;
        cancelled.status = TransferStatus::Cancelled;
        if let Some(reason) = reason {
            let line = format!("Cancelled: {reason}");
            cancelled.notes = Some(match cancelled.notes.take() {
                Some(notes) => format!("{notes}\n{line}"),
                None => line,
            });
        }

        info!(id = %id, "Transfer cancelled");
        let saved = cancelled.clone();
        self.db
            .transfers()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|t| t.id == cancelled.id) {
                    *slot = cancelled;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let transfer = self
            .db
            .transfers()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Transfer", id))?;
        if transfer.status != TransferStatus::Pending {
            // Completed/cancelled transfers are the audit trail.
            return Err(CoreError::state_conflict(
                "Transfer",
                id,
                transfer.status.as_str(),
                "delete",
            ));
        }

        self.db
            .transfers()
            .mutate(|items| items.retain(|t| t.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    /// Business validation: the product and both endpoints exist, both
    /// endpoints are active, and the source holds enough units.
    ///
    /// Rejects products whose `units_per_package` predates the `>= 1`
    /// invariant (possible via imported snapshots): the unit conversion
    /// would make any request look free.
    fn check_business(&self, transfer: &Transfer) -> CoreResult<Product> {
        let product = self
            .db
            .products()
            .get(&transfer.product_id)
            .ok_or_else(|| CoreError::not_found("Product", transfer.product_id.as_str()))?;
        if product.units_per_package < 1 {
            return Err(ValidationError::MustBeAtLeast {
                field: "unitsPerPackage",
                min: 1,
            }
            .into());
        }

        for location_id in [&transfer.from_location_id, &transfer.to_location_id] {
            let location = self
                .db
                .locations()
                .get(location_id)
                .ok_or_else(|| CoreError::not_found("Location", location_id.as_str()))?;
            if !location.is_active {
                return Err(CoreError::InactiveLocation {
                    name: location.name,
                });
            }
        }

        let requested = transfer.requested_units(product.units_per_package);
        let available = stock::available_units_at(&product, &transfer.from_location_id);
        if requested > available {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available,
                requested,
            });
        }
        Ok(product)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::location::{LocationService, NewLocation};
    use crate::product::{NewProduct, ProductService};
    use tally_store::MemoryStore;

    struct Fixture {
        db: Arc<Database>,
        transfers: TransferService,
        products: ProductService,
        sink: Arc<RecordingSink>,
        product_id: String,
        warehouse: String,
        store: String,
    }

    /// One product with 10 packages + 4 loose (upp 12) at the warehouse.
    fn fixture() -> Fixture {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let products = ProductService::new(db.clone(), sink.clone());
        let locations = LocationService::new(db.clone(), sink.clone());
        let transfers = TransferService::new(db.clone(), sink.clone());

        let warehouse = locations
            .create(NewLocation {
                name: "Warehouse".to_string(),
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        let store = locations
            .create(NewLocation {
                name: "Store".to_string(),
                ..Default::default()
            })
            .data
            .unwrap()
            .id;

        let product_id = products
            .create(NewProduct {
                name: "Cola 12-pack".to_string(),
                units_per_package: 12,
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        products.set_stock_at(&product_id, &warehouse, 10, 4);
        sink.clear(); // fixture stocking emits; tests only care about their own events

        Fixture {
            db,
            transfers,
            products,
            sink,
            product_id,
            warehouse,
            store,
        }
    }

    fn request(f: &Fixture, quantity: i64, loose_units: i64) -> NewTransfer {
        NewTransfer {
            product_id: f.product_id.clone(),
            from_location_id: f.warehouse.clone(),
            to_location_id: f.store.clone(),
            quantity,
            loose_units,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_pending_checks_stock() {
        let f = fixture();
        let result = f.transfers.create(request(&f, 2, 0));
        let transfer = result.data.unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert!(transfer.completed_at.is_none());

        // Stock untouched until completion
        let product = f.products.get(&f.product_id).unwrap();
        assert_eq!(product.stock_at(&f.warehouse).qty, 10);
    }

    #[test]
    fn test_create_rejects_insufficient_stock_with_shortfall() {
        let f = fixture();
        // 10 pkg + 4 loose = 124 units available; ask for 11 pkg = 132
        let result = f.transfers.create(request(&f, 11, 0));
        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("available 124 units, requested 132 units"));
    }

    #[test]
    fn test_create_rejects_same_endpoints() {
        let f = fixture();
        let mut input = request(&f, 1, 0);
        input.to_location_id = input.from_location_id.clone();
        let result = f.transfers.create(input);
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.contains("must differ")));
    }

    #[test]
    fn test_rejects_legacy_zero_package_size() {
        let f = fixture();
        // Imported snapshots may carry records that predate the >= 1 rule
        f.db.products()
            .mutate(|items| {
                if let Some(p) = items.iter_mut().find(|p| p.id == f.product_id) {
                    p.units_per_package = 0;
                }
            })
            .unwrap();

        // quantity × 0 + 0 loose would read as a free move; refuse it
        let result = f.transfers.create(request(&f, 2, 0));
        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("unitsPerPackage must be at least 1"));
    }

    #[test]
    fn test_complete_moves_stock_and_conserves_units() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 2, 6)).data.unwrap().id;
        let before = f.products.get(&f.product_id).unwrap().total_units();

        let result = f.transfers.complete(&id);
        let transfer = result.data.unwrap();
        assert_eq!(transfer.status, TransferStatus::Completed);
        assert!(transfer.completed_at.is_some());

        let product = f.products.get(&f.product_id).unwrap();
        // warehouse: 10 pkg 4 loose − (2 pkg 6 loose) → borrow → 7 pkg 10 loose
        assert_eq!(product.stock_at(&f.warehouse).qty, 7);
        assert_eq!(product.stock_at(&f.warehouse).loose_units, 10);
        assert_eq!(product.stock_at(&f.store).qty, 2);
        assert_eq!(product.stock_at(&f.store).loose_units, 6);
        assert_eq!(product.total_units(), before);

        assert_eq!(
            f.sink.names(),
            vec!["product:stock-changed", "transfer:completed"]
        );
    }

    #[test]
    fn test_complete_rechecks_stock() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 10, 0)).data.unwrap().id;

        // Stock drains while the transfer sits pending
        f.products.set_stock_at(&f.product_id, &f.warehouse, 1, 0);

        let result = f.transfers.complete(&id);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Insufficient stock"));
        // Still pending, retryable
        assert_eq!(
            f.transfers.get(&id).unwrap().status,
            TransferStatus::Pending
        );
    }

    #[test]
    fn test_complete_is_not_repeatable() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 1, 0)).data.unwrap().id;
        assert!(f.transfers.complete(&id).success);

        let result = f.transfers.complete(&id);
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap(),
            format!("Transfer {id} is completed, cannot complete")
        );
        // No double deduction
        let product = f.products.get(&f.product_id).unwrap();
        assert_eq!(product.stock_at(&f.warehouse).qty, 9);
    }

    #[test]
    fn test_cancel_appends_reason_and_leaves_stock() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 3, 0)).data.unwrap().id;

        let result = f.transfers.cancel(&id, Some("van broke down"));
        let transfer = result.data.unwrap();
        assert_eq!(transfer.status, TransferStatus::Cancelled);
        assert_eq!(transfer.notes.unwrap(), "Cancelled: van broke down");

        let product = f.products.get(&f.product_id).unwrap();
        assert_eq!(product.stock_at(&f.warehouse).qty, 10);
    }

    #[test]
    fn test_cancelled_transfer_cannot_complete() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 1, 0)).data.unwrap().id;
        f.transfers.cancel(&id, None);

        let result = f.transfers.complete(&id);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("is cancelled"));
    }

    #[test]
    fn test_update_pending_revalidates_stock() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 2, 0)).data.unwrap().id;

        let result = f.transfers.update(
            &id,
            TransferUpdate {
                quantity: Some(50),
                ..Default::default()
            },
        );
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Insufficient stock"));
        // Original quantity kept
        assert_eq!(f.transfers.get(&id).unwrap().quantity, 2);
    }

    #[test]
    fn test_delete_only_pending() {
        let f = fixture();
        let id = f.transfers.create(request(&f, 1, 0)).data.unwrap().id;
        f.transfers.complete(&id);

        let result = f.transfers.delete(&id);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("cannot delete"));
        assert!(f.transfers.get(&id).is_some());
    }
}
