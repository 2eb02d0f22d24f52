//! # Rental Service
//!
//! Time-boxed rentals with date-driven overdue status.
//!
//! Overdue is derived, not commanded: `refresh_overdue` sweeps active
//! rentals past their due date. The sweep takes `now` as a parameter so
//! hosts control the clock and tests can pin it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use tally_core::validation::validate_rental;
use tally_core::{CoreError, CoreResult, Rental, RentalStatus};
use tally_store::Database;

use crate::events::EventSink;
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRental {
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub item_name: String,
    pub rate: f64,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Default for NewRental {
    fn default() -> Self {
        let now = Utc::now();
        NewRental {
            customer_id: None,
            product_id: None,
            item_name: String::new(),
            rate: 0.0,
            start_date: now,
            due_date: now,
            notes: None,
        }
    }
}

/// Partial update; rejected once the rental is returned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RentalUpdate {
    pub item_name: Option<String>,
    pub rate: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct RentalService {
    db: Arc<Database>,
    #[allow(dead_code)]
    events: Arc<dyn EventSink>,
}

impl RentalService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        RentalService { db, events }
    }

    pub fn list(&self) -> Vec<Rental> {
        self.db.rentals().all()
    }

    pub fn get(&self, id: &str) -> Option<Rental> {
        self.db.rentals().get(id)
    }

    /// Rentals out past their due date as of `now`, returned ones excluded.
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<Rental> {
        self.db
            .rentals()
            .with(|items| items.iter().filter(|r| r.is_overdue(now)).cloned().collect())
    }

    pub fn create(&self, input: NewRental) -> ActionResult<Rental> {
        let rental = Rental {
            id: new_id(),
            customer_id: input.customer_id,
            product_id: input.product_id,
            item_name: input.item_name,
            rate: input.rate,
            status: RentalStatus::Active,
            start_date: input.start_date,
            due_date: input.due_date,
            returned_date: None,
            notes: input.notes,
            created_at: Utc::now(),
        };

        let errors = validate_rental(&rental);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_create(rental))
    }

    pub fn update(&self, id: &str, patch: RentalUpdate) -> ActionResult<Rental> {
        let Some(mut rental) = self.db.rentals().get(id) else {
            return ActionResult::fail(CoreError::not_found("Rental", id));
        };
        if rental.status == RentalStatus::Returned {
            return ActionResult::fail(CoreError::state_conflict(
                "Rental",
                id,
                rental.status.as_str(),
                "edit",
            ));
        }

        if let Some(item_name) = patch.item_name {
            rental.item_name = item_name;
        }
        if let Some(rate) = patch.rate {
            rental.rate = rate;
        }
        if let Some(due_date) = patch.due_date {
            rental.due_date = due_date;
        }
        if let Some(notes) = patch.notes {
            rental.notes = Some(notes);
        }

        let errors = validate_rental(&rental);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.persist(rental))
    }

    /// Marks the rental returned, stamping the return date. Works from
    /// both active and overdue.
    pub fn return_rental(&self, id: &str) -> ActionResult<Rental> {
        ActionResult::from_result(self.try_return(id))
    }

    /// Sweeps active rentals past their due date into overdue.
    /// Returns how many were flipped.
    pub fn refresh_overdue(&self, now: DateTime<Utc>) -> ActionResult<usize> {
        ActionResult::from_result(self.try_refresh_overdue(now))
    }

    /// Only returned rentals may be deleted; open rentals are the
    /// record of who has what.
    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, rental: Rental) -> CoreResult<Rental> {
        if let Some(customer_id) = rental.customer_id.as_deref() {
            if !self.db.customers().contains(customer_id) {
                return Err(CoreError::not_found("Customer", customer_id));
            }
        }
        if let Some(product_id) = rental.product_id.as_deref() {
            if !self.db.products().contains(product_id) {
                return Err(CoreError::not_found("Product", product_id));
            }
        }

        info!(id = %rental.id, item = %rental.item_name, "Creating rental");
        let created = rental.clone();
        self.db
            .rentals()
            .mutate(move |items| items.push(rental))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_return(&self, id: &str) -> CoreResult<Rental> {
        let mut rental = self
            .db
            .rentals()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Rental", id))?;
        if rental.status == RentalStatus::Returned {
            return Err(CoreError::state_conflict(
                "Rental",
                id,
                rental.status.as_str(),
                "return",
            ));
        }

        rental.status = RentalStatus::Returned;
        rental.returned_date = Some(Utc::now());
        info!(id = %id, item = %rental.item_name, "Rental returned");
        self.persist(rental)
    }

    fn try_refresh_overdue(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let stale = self.db.rentals().with(|items| {
            items
                .iter()
                .any(|r| r.status == RentalStatus::Active && r.is_overdue(now))
        });
        if !stale {
            return Ok(0);
        }

        let flipped = self
            .db
            .rentals()
            .mutate(|items| {
                let mut count = 0;
                for rental in items.iter_mut() {
                    if rental.status == RentalStatus::Active && rental.is_overdue(now) {
                        rental.status = RentalStatus::Overdue;
                        count += 1;
                    }
                }
                count
            })
            .map_err(store_fault)?;
        info!(count = flipped, "Rentals marked overdue");
        Ok(flipped)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let rental = self
            .db
            .rentals()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Rental", id))?;
        if rental.status != RentalStatus::Returned {
            return Err(CoreError::state_conflict(
                "Rental",
                id,
                rental.status.as_str(),
                "delete",
            ));
        }

        self.db
            .rentals()
            .mutate(|items| items.retain(|r| r.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    fn persist(&self, rental: Rental) -> CoreResult<Rental> {
        let saved = rental.clone();
        self.db
            .rentals()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|r| r.id == rental.id) {
                    *slot = rental;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use chrono::{Duration, TimeZone};
    use tally_store::MemoryStore;

    fn service() -> RentalService {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        RentalService::new(db, Arc::new(RecordingSink::default()))
    }

    fn sander(due: DateTime<Utc>) -> NewRental {
        NewRental {
            item_name: "Floor sander".to_string(),
            rate: 45.0,
            start_date: due - Duration::days(7),
            due_date: due,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_active() {
        let svc = service();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let rental = svc.create(sander(due)).data.unwrap();
        assert_eq!(rental.status, RentalStatus::Active);
        assert!(rental.returned_date.is_none());
    }

    #[test]
    fn test_due_before_start_rejected() {
        let svc = service();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let result = svc.create(NewRental {
            start_date: due + Duration::days(1),
            ..sander(due)
        });
        assert!(!result.success);
        assert!(result.errors[0].contains("dueDate"));
    }

    #[test]
    fn test_refresh_overdue_sweeps_only_past_due() {
        let svc = service();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let late = svc.create(sander(due)).data.unwrap().id;
        let on_time = svc
            .create(NewRental {
                item_name: "Pressure washer".to_string(),
                ..sander(due + Duration::days(30))
            })
            .data
            .unwrap()
            .id;

        let now = due + Duration::days(2);
        assert_eq!(svc.refresh_overdue(now).data.unwrap(), 1);
        assert_eq!(svc.get(&late).unwrap().status, RentalStatus::Overdue);
        assert_eq!(svc.get(&on_time).unwrap().status, RentalStatus::Active);

        // Second sweep finds nothing new
        assert_eq!(svc.refresh_overdue(now).data.unwrap(), 0);
    }

    #[test]
    fn test_return_from_overdue() {
        let svc = service();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let id = svc.create(sander(due)).data.unwrap().id;
        svc.refresh_overdue(due + Duration::days(1));

        let rental = svc.return_rental(&id).data.unwrap();
        assert_eq!(rental.status, RentalStatus::Returned);
        assert!(rental.returned_date.is_some());

        // Returned rentals never read overdue again
        assert!(svc.overdue(due + Duration::days(99)).is_empty());
    }

    #[test]
    fn test_return_twice_rejected() {
        let svc = service();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let id = svc.create(sander(due)).data.unwrap().id;
        svc.return_rental(&id);

        let result = svc.return_rental(&id);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("cannot return"));
    }

    #[test]
    fn test_delete_requires_returned() {
        let svc = service();
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let id = svc.create(sander(due)).data.unwrap().id;

        assert!(!svc.delete(&id).success);
        svc.return_rental(&id);
        assert!(svc.delete(&id).success);
        assert!(svc.get(&id).is_none());
    }
}
