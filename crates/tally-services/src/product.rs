//! # Product Service
//!
//! CRUD plus stock adjustments and the restock report.
//!
//! ## Validation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create/update                                                          │
//! │                                                                         │
//! │  1. STRUCTURAL  validate_product (all field errors collected)          │
//! │  2. BUSINESS    name unique case-insensitively                         │
//! │  3. apply: normalize stock, refresh aggregate cache, persist           │
//! │                                                                         │
//! │  Nothing mutates until every layer passes.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use tally_core::reorder::{product_stock_level, suggested_reorder_qty};
use tally_core::validation::validate_product;
use tally_core::{stock, CoreError, CoreResult, Product, StockLevel, TransferStatus, ValidationError};
use tally_store::Database;

use crate::events::{AppEvent, EventSink};
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub qty: i64,
    pub loose_units: i64,
    pub units_per_package: i64,
    pub cost: f64,
    pub price: f64,
    pub reorder_point: i64,
}

impl Default for NewProduct {
    fn default() -> Self {
        NewProduct {
            name: String::new(),
            sku: String::new(),
            category: None,
            supplier: None,
            qty: 0,
            loose_units: 0,
            // Single-unit products are the common case.
            units_per_package: 1,
            cost: 0.0,
            price: 0.0,
            reorder_point: 0,
        }
    }
}

/// Partial update: only the fields present are applied.
///
/// Stock counts are deliberately absent; they move through
/// [`ProductService::adjust_stock`] and [`ProductService::set_stock_at`]
/// so every stock change goes through the ledger arithmetic.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub units_per_package: Option<i64>,
    pub cost: Option<f64>,
    pub price: Option<f64>,
    pub reorder_point: Option<i64>,
}

/// One row of the restock report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderSuggestion {
    pub product_id: String,
    pub name: String,
    pub qty: i64,
    pub reorder_point: i64,
    pub level: StockLevel,
    pub suggested_qty: i64,
}

// =============================================================================
// Service
// =============================================================================

pub struct ProductService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

impl ProductService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        ProductService { db, events }
    }

    pub fn list(&self) -> Vec<Product> {
        self.db.products().all()
    }

    pub fn get(&self, id: &str) -> Option<Product> {
        self.db.products().get(id)
    }

    pub fn create(&self, input: NewProduct) -> ActionResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: new_id(),
            name: input.name,
            sku: input.sku,
            category: input.category,
            supplier: input.supplier,
            qty: input.qty,
            loose_units: input.loose_units,
            units_per_package: input.units_per_package,
            cost: input.cost,
            price: input.price,
            reorder_point: input.reorder_point,
            stock_by_location: Default::default(),
            created_at: now,
            updated_at: now,
        };

        let errors = validate_product(&product);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_create(product))
    }

    pub fn update(&self, id: &str, patch: ProductUpdate) -> ActionResult<Product> {
        let Some(mut product) = self.db.products().get(id) else {
            return ActionResult::fail(CoreError::not_found("Product", id));
        };

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(sku) = patch.sku {
            product.sku = sku;
        }
        if let Some(category) = patch.category {
            product.category = Some(category);
        }
        if let Some(supplier) = patch.supplier {
            product.supplier = Some(supplier);
        }
        if let Some(units_per_package) = patch.units_per_package {
            product.units_per_package = units_per_package;
        }
        if let Some(cost) = patch.cost {
            product.cost = cost;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(reorder_point) = patch.reorder_point {
            product.reorder_point = reorder_point;
        }

        let errors = validate_product(&product);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        product.updated_at = Utc::now();
        ActionResult::from_result(self.try_save(product))
    }

    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    /// Adjusts the package count by `delta`, clamped at zero.
    ///
    /// Location-tracked products must name the location; products without
    /// per-location entries adjust the aggregate count directly.
    pub fn adjust_stock(
        &self,
        id: &str,
        delta: i64,
        location_id: Option<&str>,
    ) -> ActionResult<Product> {
        ActionResult::from_result(self.try_adjust_stock(id, delta, location_id))
    }

    /// Overwrites one location's stock entry (stocktake correction).
    pub fn set_stock_at(
        &self,
        id: &str,
        location_id: &str,
        quantity: i64,
        loose_units: i64,
    ) -> ActionResult<Product> {
        if quantity < 0 || loose_units < 0 {
            return ActionResult::invalid(vec![ValidationError::MustBeNonNegative {
                field: "quantity",
            }]);
        }
        ActionResult::from_result(self.try_set_stock_at(id, location_id, quantity, loose_units))
    }

    /// Every product whose stock level needs attention, most urgent first.
    pub fn low_stock_report(&self) -> Vec<ReorderSuggestion> {
        let mut report: Vec<ReorderSuggestion> = self.db.products().with(|items| {
            items
                .iter()
                .filter_map(|p| {
                    let level = product_stock_level(p);
                    level.needs_attention().then(|| ReorderSuggestion {
                        product_id: p.id.clone(),
                        name: p.name.clone(),
                        qty: p.qty,
                        reorder_point: p.reorder_point,
                        level,
                        suggested_qty: suggested_reorder_qty(p.qty, p.reorder_point),
                    })
                })
                .collect()
        });
        // Out < Critical < Low by declaration order
        report.sort_by(|a, b| (a.level as u8, &a.name).cmp(&(b.level as u8, &b.name)));
        report
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, mut product: Product) -> CoreResult<Product> {
        self.check_unique_name(&product.name, None)?;
        stock::normalize_units(&mut product);

        info!(id = %product.id, name = %product.name, "Creating product");
        let created = product.clone();
        self.db
            .products()
            .mutate(move |items| items.push(product))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_save(&self, mut product: Product) -> CoreResult<Product> {
        self.check_unique_name(&product.name, Some(&product.id))?;
        stock::update_product_total_stock(&mut product);

        let saved = product.clone();
        self.db
            .products()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|p| p.id == product.id) {
                    *slot = product;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let product = self
            .db
            .products()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Product", id))?;

        if product.has_stock() {
            return Err(CoreError::DeleteBlocked {
                entity: "Product",
                id: id.to_string(),
                reason: "it still holds stock".to_string(),
            });
        }
        let pending_transfer = self.db.transfers().with(|items| {
            items
                .iter()
                .any(|t| t.product_id == id && t.status == TransferStatus::Pending)
        });
        if pending_transfer {
            return Err(CoreError::DeleteBlocked {
                entity: "Product",
                id: id.to_string(),
                reason: "a pending transfer references it".to_string(),
            });
        }

        info!(id = %id, name = %product.name, "Deleting product");
        self.db
            .products()
            .mutate(|items| items.retain(|p| p.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    fn try_adjust_stock(
        &self,
        id: &str,
        delta: i64,
        location_id: Option<&str>,
    ) -> CoreResult<Product> {
        let mut product = self
            .db
            .products()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Product", id))?;

        match location_id {
            Some(location_id) => {
                if !self.db.locations().contains(location_id) {
                    return Err(CoreError::not_found("Location", location_id));
                }
                let entry = product.stock_at(location_id);
                stock::set_stock_at(
                    &mut product,
                    location_id,
                    (entry.qty + delta).max(0),
                    entry.loose_units,
                );
            }
            None => {
                if !product.stock_by_location.is_empty() {
                    return Err(ValidationError::Required {
                        field: "locationId",
                    }
                    .into());
                }
                stock::adjust_quantity(&mut product, delta);
            }
        }

        product.updated_at = Utc::now();
        let saved = self.try_save_stock(product)?;
        self.events.emit(AppEvent::ProductStockChanged {
            product_id: saved.id.clone(),
        });
        Ok(saved)
    }

    fn try_set_stock_at(
        &self,
        id: &str,
        location_id: &str,
        quantity: i64,
        loose_units: i64,
    ) -> CoreResult<Product> {
        let mut product = self
            .db
            .products()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Product", id))?;
        if !self.db.locations().contains(location_id) {
            return Err(CoreError::not_found("Location", location_id));
        }

        stock::set_stock_at(&mut product, location_id, quantity, loose_units);
        product.updated_at = Utc::now();
        let saved = self.try_save_stock(product)?;
        self.events.emit(AppEvent::ProductStockChanged {
            product_id: saved.id.clone(),
        });
        Ok(saved)
    }

    /// Persists a stock mutation without re-running uniqueness checks.
    fn try_save_stock(&self, product: Product) -> CoreResult<Product> {
        let saved = product.clone();
        self.db
            .products()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|p| p.id == product.id) {
                    *slot = product;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn check_unique_name(&self, name: &str, exclude_id: Option<&str>) -> CoreResult<()> {
        let needle = name.trim().to_lowercase();
        let taken = self.db.products().with(|items| {
            items.iter().any(|p| {
                Some(p.id.as_str()) != exclude_id && p.name.trim().to_lowercase() == needle
            })
        });
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "Product",
                name: name.to_string(),
            });
        }
        Ok(())
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
    use tally_store::MemoryStore;

    fn service() -> (ProductService, Arc<RecordingSink>) {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        let sink = Arc::new(RecordingSink::default());
        (ProductService::new(db, sink.clone()), sink)
    }

    fn widget() -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            sku: "WID-1".to_string(),
            qty: 10,
            units_per_package: 12,
            cost: 4.0,
            price: 9.99,
            reorder_point: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_assigns_id_and_persists() {
        let (svc, _) = service();
        let result = svc.create(widget());
        assert!(result.success);

        let product = result.data.unwrap();
        assert!(!product.id.is_empty());
        assert_eq!(svc.get(&product.id).unwrap().name, "Widget");
    }

    #[test]
    fn test_create_rejects_invalid_with_all_errors() {
        let (svc, _) = service();
        let result = svc.create(NewProduct {
            name: String::new(),
            units_per_package: 0,
            price: -1.0,
            ..Default::default()
        });
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.errors.len() >= 3);
        assert_eq!(svc.list().len(), 0);
    }

    #[test]
    fn test_create_normalizes_loose_overflow() {
        let (svc, _) = service();
        let result = svc.create(NewProduct {
            loose_units: 30,
            ..widget()
        });
        let product = result.data.unwrap();
        assert_eq!(product.qty, 12); // 10 + 30/12
        assert_eq!(product.loose_units, 6);
    }

    #[test]
    fn test_duplicate_name_rejected_case_insensitively() {
        let (svc, _) = service();
        svc.create(widget());
        let result = svc.create(NewProduct {
            name: "  WIDGET ".to_string(),
            ..widget()
        });
        assert!(!result.success);
        assert!(result.error.unwrap().contains("already exists"));
    }

    #[test]
    fn test_update_whitelist_only() {
        let (svc, _) = service();
        let id = svc.create(widget()).data.unwrap().id;

        let result = svc.update(
            &id,
            ProductUpdate {
                price: Some(12.50),
                reorder_point: Some(8),
                ..Default::default()
            },
        );
        let product = result.data.unwrap();
        assert_eq!(product.price, 12.50);
        assert_eq!(product.reorder_point, 8);
        assert_eq!(product.qty, 10); // untouched
    }

    #[test]
    fn test_update_package_size_renormalizes_location_entries() {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let svc = ProductService::new(db.clone(), sink.clone());
        let locations = LocationService::new(db, sink);

        let loc = locations
            .create(NewLocation {
                name: "Warehouse".to_string(),
                ..Default::default()
            })
            .data
            .unwrap()
            .id;
        let id = svc.create(widget()).data.unwrap().id; // upp 12
        svc.set_stock_at(&id, &loc, 0, 10);

        let product = svc
            .update(
                &id,
                ProductUpdate {
                    units_per_package: Some(4),
                    ..Default::default()
                },
            )
            .data
            .unwrap();

        // 10 loose under the new size of 4 folds into 2 packages + 2
        let entry = product.stock_at(&loc);
        assert_eq!(entry.qty, 2);
        assert_eq!(entry.loose_units, 2);
        assert_eq!(product.qty, 2);
        assert_eq!(product.loose_units, 2);
    }

    #[test]
    fn test_update_unknown_id() {
        let (svc, _) = service();
        let result = svc.update("nope", ProductUpdate::default());
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "Product not found: nope");
    }

    #[test]
    fn test_delete_blocked_while_stocked() {
        let (svc, _) = service();
        let id = svc.create(widget()).data.unwrap().id;

        let result = svc.delete(&id);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("still holds stock"));
        assert!(svc.get(&id).is_some());
    }

    #[test]
    fn test_delete_empty_product() {
        let (svc, _) = service();
        let id = svc
            .create(NewProduct {
                qty: 0,
                ..widget()
            })
            .data
            .unwrap()
            .id;

        assert!(svc.delete(&id).success);
        assert!(svc.get(&id).is_none());
    }

    #[test]
    fn test_adjust_stock_clamps_and_emits() {
        let (svc, sink) = service();
        let id = svc.create(widget()).data.unwrap().id;

        let result = svc.adjust_stock(&id, -3, None);
        assert_eq!(result.data.unwrap().qty, 7);

        let result = svc.adjust_stock(&id, -999, None);
        assert_eq!(result.data.unwrap().qty, 0);

        assert_eq!(
            sink.names(),
            vec!["product:stock-changed", "product:stock-changed"]
        );
    }

    #[test]
    fn test_set_stock_at_requires_known_location() {
        let (svc, _) = service();
        let id = svc.create(widget()).data.unwrap().id;

        let result = svc.set_stock_at(&id, "nowhere", 5, 0);
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "Location not found: nowhere");
    }

    #[test]
    fn test_low_stock_report_orders_by_urgency() {
        let (svc, _) = service();
        svc.create(NewProduct {
            name: "Healthy".to_string(),
            qty: 50,
            reorder_point: 5,
            ..widget()
        });
        svc.create(NewProduct {
            name: "Low".to_string(),
            qty: 8,
            reorder_point: 10,
            ..widget()
        });
        svc.create(NewProduct {
            name: "Gone".to_string(),
            qty: 0,
            reorder_point: 10,
            ..widget()
        });

        let report = svc.low_stock_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "Gone");
        assert_eq!(report[0].level, StockLevel::Out);
        assert_eq!(report[0].suggested_qty, 20);
        assert_eq!(report[1].name, "Low");
        assert_eq!(report[1].suggested_qty, 12);
    }
}
