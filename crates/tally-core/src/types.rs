//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Location     │   │    Transfer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  qty / loose    │   │  name (unique)  │   │  product_id     │       │
//! │  │  units_per_pkg  │   │  kind           │   │  from / to      │       │
//! │  │  stock_by_loc   │   │  is_default     │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Order/Invoice  │   │     Rental      │   │  Subscription   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  line_items[]   │   │  due_date       │   │  billing_cycle  │       │
//! │  │  charges        │   │  returned_date  │   │  next_billing   │       │
//! │  │  subtotal/tax/  │   │  status derived │   │  status         │       │
//! │  │  total (cached) │   │  from dates     │   │  MRR helper     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authoritative vs Derived Stock
//! `Product.stock_by_location` is the per-location truth. The top-level
//! `qty`/`loose_units` pair is a cache recomputed as the normalized sum of
//! all location entries after every mutation (see [`crate::stock`]).
//!
//! ## Field Naming
//! Earlier revisions of this system carried legacy aliases
//! (`reorderAt`, `order.items`). The canonical names are `reorder_point`
//! and `line_items`; the aliases are accepted on deserialization only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::totals::ChargeParams;

// =============================================================================
// Stock Representation
// =============================================================================

/// Stock held at a single location: whole packages plus loose units.
///
/// Invariant after any mutation: `0 <= loose_units < units_per_package`
/// (normalization folds overflow into `qty`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LocationStock {
    /// Whole packages at this location.
    pub qty: i64,
    /// Partial-package units at this location.
    pub loose_units: i64,
}

impl LocationStock {
    /// Total loose-unit equivalent of this entry.
    #[inline]
    pub const fn total_units(&self, units_per_package: i64) -> i64 {
        self.qty * units_per_package + self.loose_units
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Stock Keeping Unit - business identifier (may be empty).
    #[serde(default)]
    pub sku: String,

    /// Free-form category label.
    pub category: Option<String>,

    /// Supplier name.
    pub supplier: Option<String>,

    /// Whole packages across all locations (derived cache).
    pub qty: i64,

    /// Loose units across all locations (derived cache).
    #[serde(default)]
    pub loose_units: i64,

    /// How many loose units one package holds. Hard invariant: >= 1.
    /// Enforced at creation so stock arithmetic never divides by zero.
    pub units_per_package: i64,

    /// Unit cost (what we pay).
    pub cost: f64,

    /// Unit price (what we charge).
    pub price: f64,

    /// Package threshold at/below which restocking is suggested.
    /// 0 means "no monitoring". Legacy snapshots used `reorderAt`.
    #[serde(default, alias = "reorderAt")]
    pub reorder_point: i64,

    /// Per-location stock - the authoritative truth.
    #[serde(default)]
    pub stock_by_location: HashMap<String, LocationStock>,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Total stock in loose-unit equivalent:
    /// `qty × units_per_package + loose_units`.
    #[inline]
    pub const fn total_units(&self) -> i64 {
        self.qty * self.units_per_package + self.loose_units
    }

    /// Stock entry for a location, zero if the location holds nothing.
    pub fn stock_at(&self, location_id: &str) -> LocationStock {
        self.stock_by_location
            .get(location_id)
            .copied()
            .unwrap_or_default()
    }

    /// True when any location (or the aggregate cache) holds stock.
    pub fn has_stock(&self) -> bool {
        if self.total_units() > 0 {
            return true;
        }
        self.stock_by_location
            .values()
            .any(|s| s.total_units(self.units_per_package) > 0)
    }
}

// =============================================================================
// Location
// =============================================================================

/// What kind of place a location is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LocationType {
    Warehouse,
    Store,
    Vehicle,
    Other,
}

impl Default for LocationType {
    fn default() -> Self {
        LocationType::Warehouse
    }
}

/// A stocking location (warehouse, storefront, service vehicle...).
///
/// ## Invariants
/// - `name` is unique case-insensitively across all locations
/// - At most one location has `is_default == true` at any time
///   (setting a new default unsets all others)
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationType,
    pub is_active: bool,
    pub is_default: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transfer
// =============================================================================

/// The status of a stock transfer.
///
/// Strict state machine: `Pending → Completed` (stock adjusted) or
/// `Pending → Cancelled` (no stock effect). Both end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TransferStatus {
    /// Created but stock not yet moved. The only editable state.
    Pending,
    /// Stock has moved. Terminal.
    Completed,
    /// Abandoned without stock effect. Terminal.
    Cancelled,
}

impl TransferStatus {
    /// True for states that permit no further transitions.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for TransferStatus {
    fn default() -> Self {
        TransferStatus::Pending
    }
}

/// A stock movement of a single product between two locations.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transfer {
    pub id: String,
    pub product_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    /// Whole packages to move (>= 0).
    pub quantity: i64,
    /// Loose units to move (>= 0). `quantity + loose_units > 0` required.
    #[serde(default)]
    pub loose_units: i64,
    pub status: TransferStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Units this transfer moves, in loose-unit equivalent.
    #[inline]
    pub const fn requested_units(&self, units_per_package: i64) -> i64 {
        self.quantity * units_per_package + self.loose_units
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// How a line-level discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DiscountType {
    /// Discount is a percentage of the line subtotal.
    Percent,
    /// Discount is a flat dollar amount, capped at the line subtotal.
    Fixed,
}

impl Default for DiscountType {
    fn default() -> Self {
        DiscountType::Percent
    }
}

/// A priced line on an order or invoice.
///
/// `product_id` is optional: ad-hoc lines (labor, fees) carry only a name.
/// Legacy snapshots used `order.items`; the canonical field is `line_items`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub product_id: Option<String>,
    pub name: String,
    pub qty: i64,
    /// Unit price in dollars.
    pub price: f64,
    /// Line-level discount value, interpreted per `discount_type`.
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_type: DiscountType,
    /// Line-level tax rate as a fraction (0.07 = 7%).
    #[serde(default)]
    pub tax_rate: f64,
}

// =============================================================================
// Order
// =============================================================================

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    /// Being assembled; freely editable and deletable.
    Draft,
    /// Submitted, awaiting confirmation.
    Pending,
    /// Confirmed, awaiting fulfillment.
    Confirmed,
    /// Stock deducted. Terminal.
    Fulfilled,
    /// Abandoned. Terminal.
    Cancelled,
}

impl OrderStatus {
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }

    /// Whether the state machine permits moving to `next`.
    ///
    /// Forward-only: draft → pending/confirmed → fulfilled, with cancel
    /// allowed from any non-terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Draft, Pending) | (Draft, Confirmed) => true,
            (Pending, Confirmed) | (Pending, Fulfilled) => true,
            (Confirmed, Fulfilled) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

/// A customer order (pre-fulfillment document).
///
/// `subtotal`, `tax` and `total` are caches of the totals pipeline output,
/// recomputed after every edit (the pipeline is idempotent, so recomputing
/// an already-computed order is a no-op).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: Option<String>,
    #[serde(alias = "items")]
    pub line_items: Vec<LineItem>,
    pub status: OrderStatus,

    /// Percentage discount of the subtotal (10 = 10%). Applied first.
    #[serde(default)]
    pub discount_pct: f64,
    /// Flat dollar discount. Applied after the percentage discount.
    #[serde(default)]
    pub discount: f64,
    /// Shipping charge; joins the total always, the tax base only when
    /// `ship_taxable`.
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub ship_taxable: bool,
    /// Document tax rate as a fraction (0.07 = 7%).
    #[serde(default)]
    pub tax_rate: f64,
    /// Post-tax manufacturer coupon, subtracted last.
    #[serde(default)]
    pub mfr_coupon: f64,

    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,

    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Document-level charge parameters for the totals pipeline.
    pub fn charges(&self) -> ChargeParams {
        ChargeParams {
            discount_pct: self.discount_pct,
            discount: self.discount,
            shipping: self.shipping,
            ship_taxable: self.ship_taxable,
            tax_rate: self.tax_rate,
            mfr_coupon: self.mfr_coupon,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// The status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InvoiceStatus {
    /// Issued, awaiting payment. The only editable state.
    Unpaid,
    /// Paid in full; `paid_date` recorded. Terminal.
    Paid,
    /// Withdrawn. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

/// A billing artifact, optionally derived from an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Order this invoice was derived from, if any.
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    #[serde(alias = "items")]
    pub line_items: Vec<LineItem>,
    pub status: InvoiceStatus,

    #[serde(default)]
    pub discount_pct: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub ship_taxable: bool,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub mfr_coupon: f64,

    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,

    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Document-level charge parameters for the totals pipeline.
    pub fn charges(&self) -> ChargeParams {
        ChargeParams {
            discount_pct: self.discount_pct,
            discount: self.discount,
            shipping: self.shipping,
            ship_taxable: self.ship_taxable,
            tax_rate: self.tax_rate,
            mfr_coupon: self.mfr_coupon,
        }
    }
}

// =============================================================================
// Rental
// =============================================================================

/// The status of a rental.
///
/// Unlike transfers and orders, rental status is date-driven: an active
/// rental past its due date reads as overdue without an explicit transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RentalStatus {
    Active,
    Returned,
    Overdue,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Active => "active",
            RentalStatus::Returned => "returned",
            RentalStatus::Overdue => "overdue",
        }
    }
}

impl Default for RentalStatus {
    fn default() -> Self {
        RentalStatus::Active
    }
}

/// A time-boxed rental of a product to a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Rental {
    pub id: String,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    /// What is rented, as shown on paperwork.
    pub item_name: String,
    /// Rate per billing period in dollars.
    pub rate: f64,
    pub status: RentalStatus,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub returned_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Rental {
    /// True when the rental is out past its due date.
    ///
    /// `now` is passed in so status derivation stays deterministic
    /// (callers in tests can pin the clock).
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !matches!(self.status, RentalStatus::Returned) && now > self.due_date
    }

    /// Status as derived from the dates, not the stored field.
    pub fn derived_status(&self, now: DateTime<Utc>) -> RentalStatus {
        if matches!(self.status, RentalStatus::Returned) {
            RentalStatus::Returned
        } else if self.is_overdue(now) {
            RentalStatus::Overdue
        } else {
            RentalStatus::Active
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// How often a subscription bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum BillingCycle {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Default for BillingCycle {
    fn default() -> Self {
        BillingCycle::Monthly
    }
}

/// The status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SubscriptionStatus {
    Active,
    Paused,
    /// Terminal.
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        SubscriptionStatus::Active
    }
}

/// A recurring billing arrangement with a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Subscription {
    pub id: String,
    pub customer_id: Option<String>,
    /// Plan or service name.
    pub plan: String,
    /// Amount charged per billing cycle, in dollars.
    pub amount: f64,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    #[ts(as = "String")]
    pub next_billing_date: DateTime<Utc>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// True when an active subscription's billing date has arrived.
    pub fn is_billing_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, SubscriptionStatus::Active) && now >= self.next_billing_date
    }

    /// Monthly Recurring Revenue contribution: the cycle amount
    /// normalized to a per-month figure.
    pub fn monthly_revenue(&self) -> f64 {
        match self.billing_cycle {
            BillingCycle::Weekly => self.amount * 52.0 / 12.0,
            BillingCycle::Monthly => self.amount,
            BillingCycle::Quarterly => self.amount / 3.0,
            BillingCycle::Yearly => self.amount / 12.0,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_product_total_units() {
        let mut product = test_product(10, 5, 12);
        assert_eq!(product.total_units(), 125);

        product.units_per_package = 1;
        product.loose_units = 0;
        assert_eq!(product.total_units(), 10);
    }

    #[test]
    fn test_transfer_status_terminality() {
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;
        assert!(Draft.can_transition_to(Pending));
        assert!(Draft.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Fulfilled));
        assert!(Confirmed.can_transition_to(Fulfilled));
        assert!(Pending.can_transition_to(Cancelled));

        // Terminal states go nowhere
        assert!(!Fulfilled.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Draft));
        // No moving backwards
        assert!(!Confirmed.can_transition_to(Draft));
        assert!(!Fulfilled.can_transition_to(Pending));
    }

    #[test]
    fn test_rental_overdue_derivation() {
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let rental = Rental {
            id: "r-1".to_string(),
            customer_id: None,
            product_id: None,
            item_name: "Floor sander".to_string(),
            rate: 45.0,
            status: RentalStatus::Active,
            start_date: due - chrono::Duration::days(7),
            due_date: due,
            returned_date: None,
            notes: None,
            created_at: due - chrono::Duration::days(7),
        };

        let before = due - chrono::Duration::hours(1);
        let after = due + chrono::Duration::hours(1);
        assert!(!rental.is_overdue(before));
        assert!(rental.is_overdue(after));
        assert_eq!(rental.derived_status(before), RentalStatus::Active);
        assert_eq!(rental.derived_status(after), RentalStatus::Overdue);

        let returned = Rental {
            status: RentalStatus::Returned,
            returned_date: Some(due),
            ..rental
        };
        assert!(!returned.is_overdue(after));
        assert_eq!(returned.derived_status(after), RentalStatus::Returned);
    }

    #[test]
    fn test_subscription_mrr_normalization() {
        let base = test_subscription(120.0, BillingCycle::Monthly);
        assert_eq!(base.monthly_revenue(), 120.0);

        let quarterly = Subscription {
            billing_cycle: BillingCycle::Quarterly,
            ..base.clone()
        };
        assert_eq!(quarterly.monthly_revenue(), 40.0);

        let yearly = Subscription {
            billing_cycle: BillingCycle::Yearly,
            ..base
        };
        assert_eq!(yearly.monthly_revenue(), 10.0);
    }

    #[test]
    fn test_line_items_accepts_legacy_items_field() {
        let json = r#"{
            "id": "o-1",
            "customerId": null,
            "items": [{"productId": null, "name": "Labor", "qty": 1, "price": 50.0}],
            "status": "draft",
            "subtotal": 0.0, "tax": 0.0, "total": 0.0,
            "notes": null,
            "createdAt": "2024-06-01T00:00:00Z",
            "updatedAt": "2024-06-01T00:00:00Z",
            "fulfilledAt": null
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.line_items[0].name, "Labor");
    }

    pub(crate) fn test_product(qty: i64, loose_units: i64, units_per_package: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Test product".to_string(),
            sku: "TEST-1".to_string(),
            category: None,
            supplier: None,
            qty,
            loose_units,
            units_per_package,
            cost: 4.0,
            price: 9.99,
            reorder_point: 0,
            stock_by_location: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_subscription(amount: f64, billing_cycle: BillingCycle) -> Subscription {
        Subscription {
            id: "s-1".to_string(),
            customer_id: None,
            plan: "Maintenance".to_string(),
            amount,
            billing_cycle,
            status: SubscriptionStatus::Active,
            next_billing_date: Utc::now(),
            notes: None,
            created_at: Utc::now(),
        }
    }
}
