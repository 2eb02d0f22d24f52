//! # Subscription Service
//!
//! Recurring billing arrangements: pause/resume/cancel lifecycle,
//! billing-date advancement and the MRR rollup.
//!
//! ## Lifecycle
//! ```text
//! ACTIVE ⇄ PAUSED        either ──cancel──► CANCELLED (terminal)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Deserialize;
use tracing::info;

use tally_core::money::round_cents;
use tally_core::validation::validate_subscription;
use tally_core::{BillingCycle, CoreError, CoreResult, Subscription, SubscriptionStatus};
use tally_store::Database;

use crate::events::EventSink;
use crate::new_id;
use crate::result::{store_fault, ActionResult};

// =============================================================================
// Input DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSubscription {
    pub customer_id: Option<String>,
    pub plan: String,
    pub amount: f64,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Default for NewSubscription {
    fn default() -> Self {
        NewSubscription {
            customer_id: None,
            plan: String::new(),
            amount: 0.0,
            billing_cycle: BillingCycle::default(),
            next_billing_date: Utc::now(),
            notes: None,
        }
    }
}

/// Partial update; rejected once the subscription is cancelled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionUpdate {
    pub plan: Option<String>,
    pub amount: Option<f64>,
    pub billing_cycle: Option<BillingCycle>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

pub struct SubscriptionService {
    db: Arc<Database>,
    #[allow(dead_code)]
    events: Arc<dyn EventSink>,
}

impl SubscriptionService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        SubscriptionService { db, events }
    }

    pub fn list(&self) -> Vec<Subscription> {
        self.db.subscriptions().all()
    }

    pub fn get(&self, id: &str) -> Option<Subscription> {
        self.db.subscriptions().get(id)
    }

    /// Active subscriptions whose billing date has arrived as of `now`.
    pub fn billing_due(&self, now: DateTime<Utc>) -> Vec<Subscription> {
        self.db.subscriptions().with(|items| {
            items
                .iter()
                .filter(|s| s.is_billing_due(now))
                .cloned()
                .collect()
        })
    }

    /// Monthly Recurring Revenue: every active subscription's cycle
    /// amount normalized to a per-month figure, rounded to cents.
    pub fn monthly_recurring_revenue(&self) -> f64 {
        let total: f64 = self.db.subscriptions().with(|items| {
            items
                .iter()
                .filter(|s| s.status == SubscriptionStatus::Active)
                .map(Subscription::monthly_revenue)
                .sum()
        });
        round_cents(total)
    }

    pub fn create(&self, input: NewSubscription) -> ActionResult<Subscription> {
        let subscription = Subscription {
            id: new_id(),
            customer_id: input.customer_id,
            plan: input.plan,
            amount: input.amount,
            billing_cycle: input.billing_cycle,
            status: SubscriptionStatus::Active,
            next_billing_date: input.next_billing_date,
            notes: input.notes,
            created_at: Utc::now(),
        };

        let errors = validate_subscription(&subscription);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.try_create(subscription))
    }

    pub fn update(&self, id: &str, patch: SubscriptionUpdate) -> ActionResult<Subscription> {
        let Some(mut subscription) = self.db.subscriptions().get(id) else {
            return ActionResult::fail(CoreError::not_found("Subscription", id));
        };
        if subscription.status == SubscriptionStatus::Cancelled {
            return ActionResult::fail(CoreError::state_conflict(
                "Subscription",
                id,
                subscription.status.as_str(),
                "edit",
            ));
        }

        if let Some(plan) = patch.plan {
            subscription.plan = plan;
        }
        if let Some(amount) = patch.amount {
            subscription.amount = amount;
        }
        if let Some(billing_cycle) = patch.billing_cycle {
            subscription.billing_cycle = billing_cycle;
        }
        if let Some(next_billing_date) = patch.next_billing_date {
            subscription.next_billing_date = next_billing_date;
        }
        if let Some(notes) = patch.notes {
            subscription.notes = Some(notes);
        }

        let errors = validate_subscription(&subscription);
        if !errors.is_empty() {
            return ActionResult::invalid(errors);
        }
        ActionResult::from_result(self.persist(subscription))
    }

    /// Active → paused. Billing stops; the date freezes where it is.
    pub fn pause(&self, id: &str) -> ActionResult<Subscription> {
        ActionResult::from_result(self.try_set_status(
            id,
            SubscriptionStatus::Active,
            SubscriptionStatus::Paused,
            "pause",
        ))
    }

    /// Paused → active.
    pub fn resume(&self, id: &str) -> ActionResult<Subscription> {
        ActionResult::from_result(self.try_set_status(
            id,
            SubscriptionStatus::Paused,
            SubscriptionStatus::Active,
            "resume",
        ))
    }

    /// Any non-cancelled state → cancelled. Terminal.
    pub fn cancel(&self, id: &str) -> ActionResult<Subscription> {
        ActionResult::from_result(self.try_cancel(id))
    }

    /// Records a successful charge: advances the billing date one cycle.
    pub fn record_billing(&self, id: &str) -> ActionResult<Subscription> {
        ActionResult::from_result(self.try_record_billing(id))
    }

    /// Only cancelled subscriptions may be deleted.
    pub fn delete(&self, id: &str) -> ActionResult<()> {
        ActionResult::from_result(self.try_delete(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn try_create(&self, subscription: Subscription) -> CoreResult<Subscription> {
        if let Some(customer_id) = subscription.customer_id.as_deref() {
            if !self.db.customers().contains(customer_id) {
                return Err(CoreError::not_found("Customer", customer_id));
            }
        }

        info!(id = %subscription.id, plan = %subscription.plan, "Creating subscription");
        let created = subscription.clone();
        self.db
            .subscriptions()
            .mutate(move |items| items.push(subscription))
            .map_err(store_fault)?;
        Ok(created)
    }

    fn try_set_status(
        &self,
        id: &str,
        expected: SubscriptionStatus,
        next: SubscriptionStatus,
        operation: &'static str,
    ) -> CoreResult<Subscription> {
        let mut subscription = self
            .db
            .subscriptions()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Subscription", id))?;
        if subscription.status != expected {
            return Err(CoreError::state_conflict(
                "Subscription",
                id,
                subscription.status.as_str(),
                operation,
            ));
        }

        subscription.status = next;
        info!(id = %id, status = next.as_str(), "Subscription transition");
        self.persist(subscription)
    }

    fn try_cancel(&self, id: &str) -> CoreResult<Subscription> {
        let mut subscription = self
            .db
            .subscriptions()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Subscription", id))?;
        if subscription.status == SubscriptionStatus::Cancelled {
            return Err(CoreError::state_conflict(
                "Subscription",
                id,
                subscription.status.as_str(),
                "cancel",
            ));
        }

        subscription.status = SubscriptionStatus::Cancelled;
        info!(id = %id, plan = %subscription.plan, "Subscription cancelled");
        self.persist(subscription)
    }

    fn try_record_billing(&self, id: &str) -> CoreResult<Subscription> {
        let mut subscription = self
            .db
            .subscriptions()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Subscription", id))?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(CoreError::state_conflict(
                "Subscription",
                id,
                subscription.status.as_str(),
                "bill",
            ));
        }

        subscription.next_billing_date =
            advance_billing_date(subscription.next_billing_date, subscription.billing_cycle);
        info!(
            id = %id,
            next = %subscription.next_billing_date,
            "Billing recorded"
        );
        self.persist(subscription)
    }

    fn try_delete(&self, id: &str) -> CoreResult<()> {
        let subscription = self
            .db
            .subscriptions()
            .get(id)
            .ok_or_else(|| CoreError::not_found("Subscription", id))?;
        if subscription.status != SubscriptionStatus::Cancelled {
            return Err(CoreError::state_conflict(
                "Subscription",
                id,
                subscription.status.as_str(),
                "delete",
            ));
        }

        self.db
            .subscriptions()
            .mutate(|items| items.retain(|s| s.id != id))
            .map_err(store_fault)?;
        Ok(())
    }

    fn persist(&self, subscription: Subscription) -> CoreResult<Subscription> {
        let saved = subscription.clone();
        self.db
            .subscriptions()
            .mutate(move |items| {
                if let Some(slot) = items.iter_mut().find(|s| s.id == subscription.id) {
                    *slot = subscription;
                }
            })
            .map_err(store_fault)?;
        Ok(saved)
    }
}

/// One billing cycle forward. Month-based cycles use calendar months
/// (Jan 31 + 1 month = Feb 28/29).
fn advance_billing_date(date: DateTime<Utc>, cycle: BillingCycle) -> DateTime<Utc> {
    match cycle {
        BillingCycle::Weekly => date + Duration::weeks(1),
        BillingCycle::Monthly => date.checked_add_months(Months::new(1)).unwrap_or(date),
        BillingCycle::Quarterly => date.checked_add_months(Months::new(3)).unwrap_or(date),
        BillingCycle::Yearly => date.checked_add_months(Months::new(12)).unwrap_or(date),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use chrono::TimeZone;
    use tally_store::MemoryStore;

    fn service() -> SubscriptionService {
        let db = Arc::new(Database::open(Arc::new(MemoryStore::new())).unwrap());
        SubscriptionService::new(db, Arc::new(RecordingSink::default()))
    }

    fn plan(name: &str, amount: f64, cycle: BillingCycle) -> NewSubscription {
        NewSubscription {
            plan: name.to_string(),
            amount,
            billing_cycle: cycle,
            next_billing_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pause_resume_cycle() {
        let svc = service();
        let id = svc
            .create(plan("Maintenance", 99.0, BillingCycle::Monthly))
            .data
            .unwrap()
            .id;

        assert_eq!(
            svc.pause(&id).data.unwrap().status,
            SubscriptionStatus::Paused
        );
        // Pausing twice is a conflict
        assert!(!svc.pause(&id).success);
        assert_eq!(
            svc.resume(&id).data.unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn test_cancel_is_terminal() {
        let svc = service();
        let id = svc
            .create(plan("Maintenance", 99.0, BillingCycle::Monthly))
            .data
            .unwrap()
            .id;
        svc.cancel(&id);

        assert!(!svc.pause(&id).success);
        assert!(!svc.resume(&id).success);
        assert!(!svc.cancel(&id).success);
        let result = svc.update(&id, SubscriptionUpdate::default());
        assert!(result.error.unwrap().contains("cannot edit"));
    }

    #[test]
    fn test_mrr_counts_active_only() {
        let svc = service();
        svc.create(plan("Monthly", 120.0, BillingCycle::Monthly));
        svc.create(plan("Quarterly", 120.0, BillingCycle::Quarterly)); // 40/mo
        svc.create(plan("Yearly", 120.0, BillingCycle::Yearly)); // 10/mo
        let paused = svc
            .create(plan("Paused", 500.0, BillingCycle::Monthly))
            .data
            .unwrap()
            .id;
        svc.pause(&paused);

        assert_eq!(svc.monthly_recurring_revenue(), 170.0);
    }

    #[test]
    fn test_billing_due_excludes_paused() {
        let svc = service();
        let due = svc
            .create(plan("Due", 10.0, BillingCycle::Monthly))
            .data
            .unwrap();
        let paused = svc
            .create(plan("Paused", 10.0, BillingCycle::Monthly))
            .data
            .unwrap()
            .id;
        svc.pause(&paused);

        let now = due.next_billing_date + Duration::days(1);
        let list = svc.billing_due(now);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].plan, "Due");
    }

    #[test]
    fn test_record_billing_advances_one_cycle() {
        let svc = service();
        let id = svc
            .create(plan("Monthly", 10.0, BillingCycle::Monthly))
            .data
            .unwrap()
            .id;

        let next = svc.record_billing(&id).data.unwrap().next_billing_date;
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_advance_clamps_to_month_end() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let advanced = advance_billing_date(jan31, BillingCycle::Monthly);
        assert_eq!(advanced, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_delete_requires_cancelled() {
        let svc = service();
        let id = svc
            .create(plan("Maintenance", 99.0, BillingCycle::Monthly))
            .data
            .unwrap()
            .id;

        assert!(!svc.delete(&id).success);
        svc.cancel(&id);
        assert!(svc.delete(&id).success);
        assert!(svc.get(&id).is_none());
    }
}
