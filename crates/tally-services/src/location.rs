//! # Location Service
//!
//! CRUD for stocking locations plus the single-default rule.
//!
//! ## Invariants Enforced Here
//! - Names are unique case-insensitively.
//! - At most one location is the default; setting a new default unsets
//!   the rest in the same mutation.
//! - A location holding stock, or referenced by a pending transfer,
//!   cannot be deleted.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use tally_core::validation::validate_location;
use tally_core::{CoreError, CoreResult, Location, LocationType, TransferStatus};
use tally_store::Database;

use crate::events::EventSink;
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLocation {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationType,
    pub is_default: bool,
}

impl Default for NewLocation {
    fn default() -> Self {
        NewLocation {
            name: String::new(),
            kind: LocationType::default(),
            is_default: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<LocationType>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Service
// =============================================================================

pub struct LocationService {
    db: Arc<Database>,
    #[allow(dead_code)]
    events: Arc<dyn EventSink>,
}

impl LocationService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        LocationService { db, events }
    }

    pub fn list(&self) -> Vec<Location> {
        self.db.locations().all()
    }

    pub fn get(&self, id: &str) -> Option<Location> {
        self.db.locations().get(id)
    }

    pub fn create(&self, input: NewLocation) -> ActionResult<Location> {
        let location = Location {
            id: new_id(),
            name: input.name,
            kind: input.kind,
            is_active: true,
            is_default: input.is_default,
            created_at: Utc::now(),
        };

        let errors = validate_location(&location);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_create(location))
    }

    pub fn update(&self, id: &str, patch: LocationUpdate) -> ActionResult<Location> {
        let Some(mut location) = self.db.locations().get(id) else {
            return ActionResult::fail(CoreError::not_found("Location", id));
        };

        if let Some(name) = patch.name {
            location.name = name;
        }
        if let Some(kind) = patch.kind {
            location.kind = kind;
        }
        if let Some(is_active) = patch.is_active {
            location.is_active = is_active;
        }

        let errors = validate_location(&location);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_save(location))
    }

    /// Makes this location the default, unsetting every other.
    pub fn set_default(&self, id: &str) -> ActionResult<Location> {
        ActionResult::from_result(self.try_set_default(id))
    }

    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, location: Location) -> CoreResult<Location> {
        self.check_unique_name(&location.name, None)?;

        // The first location is always the default.
        let make_default = location.is_default || self.db.locations().is_empty();
        let mut location = location;
        location.is_default = make_default;

        info!(id = %location.id, name = %location.name, "Creating location");
        let created = location.clone();
        self.db
            .locations()
            .mutate(move |items| {
                if location.is_default {
                    for existing in items.iter_mut() {
                        existing.is_default = false;
                    }
                }
                items.push(location);
            })
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_save(&self, location: Location) -> CoreResult<Location> {
        self.check_unique_name(&location.name, Some(&location.id))?;

        let saved = location.clone();
        self.db
            .locations()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|l| l.id == location.id) {
                    *slot = location;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }

    fn try_set_default(&self, id: &str) -> CoreResult<Location> {
        if !self.db.locations().contains(id) {
            return Err(CoreError::not_found("Location", id));
        }
        self.db
            .locations()
            .mutate(|items| {
                for location in items.iter_mut() {
                    location.is_default = location.id == id;
                }
            })
            .map_err(store_fault)?;
        self.db
            .locations()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Location", id))
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let location = self
            .db
            .locations()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Location", id))?;

        let holds_stock = self.db.products().with(|items| {
            items
                .iter()
                .any(|p| p.stock_at(id).total_units(p.units_per_package) > 0)
        });
        if holds_stock {
            return Err(CoreError::DeleteBlocked {
                entity: "Location",
                id: id.to_string(),
                reason: "it still holds stock".to_string(),
            });
        }
        let pending_transfer = self.db.transfers().with(|items| {
            items.iter().any(|t| {
                t.status == TransferStatus::Pending
                    && (t.from_location_id == id || t.to_location_id == id)
            })
        });
        if pending_transfer {
            return Err(CoreError::DeleteBlocked {
                entity: "Location",
                id: id.to_string(),
                reason: "a pending transfer references it".to_string(),
            });
        }

        info!(id = %id, name = %location.name, "Deleting location");
        self.db
            .locations()
            .mutate(|items| items.retain(|l| l.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    fn check_unique_name(&self, name: &str, exclude_id: Option<&str>) -> CoreResult<()> {
        let needle = name.trim().to_lowercase();
        let taken = self.db.locations().with(|items| {
            items.iter().any(|l| {
                Some(l.id.as_str()) != exclude_id && l.name.trim().to_lowercase() == needle
            })
        });
        if taken {
            return Err(CoreError::DuplicateName {
                entity: "Location",
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
    use tally_store::MemoryStore;

    fn service() -> LocationService {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        LocationService::new(db, Arc::new(RecordingSink::default()))
    }

    fn named(name: &str) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_location_becomes_default() {
        let svc = service();
        let first = svc.create(named("Warehouse")).data.unwrap();
        assert!(first.is_default);

        let second = svc.create(named("Store")).data.unwrap();
        assert!(!second.is_default);
    }

    #[test]
    fn test_duplicate_name_rejected_case_insensitively() {
        let svc = service();
        svc.create(named("Warehouse"));
        let result = svc.create(named(" WAREHOUSE "));
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap(),
            "Location name ' WAREHOUSE ' already exists"
        );
    }

    #[test]
    fn test_set_default_unsets_others() {
        let svc = service();
        let a = svc.create(named("A")).data.unwrap();
        let b = svc.create(named("B")).data.unwrap();
        assert!(a.is_default);

        let result = svc.set_default(&b.id);
        assert!(result.data.unwrap().is_default);
        assert!(!svc.get(&a.id).unwrap().is_default);

        let defaults = svc.list().iter().filter(|l| l.is_default).count();
        assert_eq!(defaults, 1);
    }

    #[test]
    fn test_creating_new_default_unsets_previous() {
        let svc = service();
        let a = svc.create(named("A")).data.unwrap();
        svc.create(NewLocation {
            is_default: true,
            ..named("B")
        });
        assert!(!svc.get(&a.id).unwrap().is_default);
    }

    #[test]
    fn test_deactivate_via_update() {
        let svc = service();
        let id = svc.create(named("Van")).data.unwrap().id;

        let result = svc.update(
            &id,
            LocationUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        );
        assert!(!result.data.unwrap().is_active);
    }

    #[test]
    fn test_delete_unknown() {
        let svc = service();
        let result = svc.delete("nope");
        assert!(!result.success);
        assert_eq!(result.error.unwrap(), "Location not found: nope");
    }

    #[test]
    fn test_empty_name_rejected() {
        let svc = service();
        let result = svc.create(named("   "));
        assert!(!result.success);
        assert_eq!(result.errors, vec!["name is required"]);
    }
}
