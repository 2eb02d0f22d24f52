//! # Validation Module
//!
//! Structural validation for Tally entities.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: STRUCTURAL (this module)                                     │
//! │  ├── Required fields present, numbers in range                         │
//! │  ├── Runs first, collects ALL field errors for the UI                  │
//! │  └── Failure short-circuits: business checks never run                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: BUSINESS (service layer)                                     │
//! │  ├── Locations exist and are active                                    │
//! │  ├── Stock is sufficient, names are unique                             │
//! │  └── Needs repository access, so it lives above the core               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: STATE (service layer)                                        │
//! │  └── Lifecycle permits the operation (pending/draft/unpaid only)       │
//! │                                                                         │
//! │  No partial application: every layer passes before anything mutates.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::totals::ChargeParams;
use crate::types::{Customer, LineItem, Location, Product, Rental, Subscription, Transfer};
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_NAME_LEN};

/// Result of an entity-level structural check: empty vec means valid.
pub type FieldErrors = Vec<ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a display name: required, bounded length.
pub fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Validates a required id reference (opaque string, must be non-empty).
pub fn validate_id(field: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Validates a monetary amount: must not be negative.
pub fn validate_money(field: &'static str, amount: f64) -> Result<(), ValidationError> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(ValidationError::MustBeNonNegative { field });
    }
    Ok(())
}

/// Validates a line quantity: positive and bounded.
pub fn validate_quantity(field: &'static str, qty: i64) -> Result<(), ValidationError> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field });
    }
    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field,
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Structural validation for a product.
///
/// `units_per_package >= 1` is a hard invariant: every stock conversion
/// divides or takes a modulus by it, so zero is rejected at the door
/// rather than guarded at every call site.
pub fn validate_product(product: &Product) -> FieldErrors {
    let mut errors = Vec::new();

    if let Err(e) = validate_name("name", &product.name) {
        errors.push(e);
    }
    if product.units_per_package < 1 {
        errors.push(ValidationError::MustBeAtLeast {
            field: "unitsPerPackage",
            min: 1,
        });
    }
    if product.qty < 0 {
        errors.push(ValidationError::MustBeNonNegative { field: "qty" });
    }
    if product.loose_units < 0 {
        errors.push(ValidationError::MustBeNonNegative {
            field: "looseUnits",
        });
    }
    if let Err(e) = validate_money("cost", product.cost) {
        errors.push(e);
    }
    if let Err(e) = validate_money("price", product.price) {
        errors.push(e);
    }
    if product.reorder_point < 0 {
        errors.push(ValidationError::MustBeNonNegative {
            field: "reorderPoint",
        });
    }
    for stock in product.stock_by_location.values() {
        if stock.qty < 0 || stock.loose_units < 0 {
            errors.push(ValidationError::MustBeNonNegative {
                field: "stockByLocation",
            });
            break;
        }
    }

    errors
}

/// Structural validation for a location.
pub fn validate_location(location: &Location) -> FieldErrors {
    let mut errors = Vec::new();
    if let Err(e) = validate_name("name", &location.name) {
        errors.push(e);
    }
    errors
}

/// Structural validation for a transfer.
///
/// Checks only the shape: ids present, endpoints differ, quantities
/// non-negative and bounded with at least one unit moving. Whether the
/// locations exist, are active, and hold enough stock is business
/// validation.
pub fn validate_transfer(transfer: &Transfer) -> FieldErrors {
    let mut errors = Vec::new();

    if let Err(e) = validate_id("productId", &transfer.product_id) {
        errors.push(e);
    }
    if let Err(e) = validate_id("fromLocationId", &transfer.from_location_id) {
        errors.push(e);
    }
    if let Err(e) = validate_id("toLocationId", &transfer.to_location_id) {
        errors.push(e);
    }
    if !transfer.from_location_id.trim().is_empty()
        && transfer.from_location_id == transfer.to_location_id
    {
        errors.push(ValidationError::MustDiffer {
            field_a: "fromLocationId",
            field_b: "toLocationId",
        });
    }
    if transfer.quantity < 0 {
        errors.push(ValidationError::MustBeNonNegative { field: "quantity" });
    } else if transfer.quantity > MAX_ITEM_QUANTITY {
        errors.push(ValidationError::OutOfRange {
            field: "quantity",
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }
    if transfer.loose_units < 0 {
        errors.push(ValidationError::MustBeNonNegative {
            field: "looseUnits",
        });
    } else if transfer.loose_units > MAX_ITEM_QUANTITY {
        errors.push(ValidationError::OutOfRange {
            field: "looseUnits",
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }
    if transfer.quantity >= 0 && transfer.loose_units >= 0 && transfer.quantity + transfer.loose_units == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "quantity + looseUnits",
        });
    }

    errors
}

/// Structural validation for a document's line items.
pub fn validate_line_items(items: &[LineItem]) -> FieldErrors {
    let mut errors = Vec::new();

    if items.len() > MAX_LINE_ITEMS {
        errors.push(ValidationError::OutOfRange {
            field: "lineItems",
            min: 0,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    for item in items {
        if let Err(e) = validate_name("lineItems.name", &item.name) {
            errors.push(e);
            continue;
        }
        if let Err(e) = validate_quantity("lineItems.qty", item.qty) {
            errors.push(e);
        }
        if let Err(e) = validate_money("lineItems.price", item.price) {
            errors.push(e);
        }
        if item.discount < 0.0 {
            errors.push(ValidationError::MustBeNonNegative {
                field: "lineItems.discount",
            });
        }
        if item.tax_rate < 0.0 {
            errors.push(ValidationError::MustBeNonNegative {
                field: "lineItems.taxRate",
            });
        }
    }

    errors
}

/// Structural validation for document-level charges.
///
/// `discount_pct` is a percentage (0-100); everything else is a
/// non-negative dollar amount or fraction.
pub fn validate_charges(charges: &ChargeParams) -> FieldErrors {
    let mut errors = Vec::new();

    if !(0.0..=100.0).contains(&charges.discount_pct) {
        errors.push(ValidationError::OutOfRange {
            field: "discountPct",
            min: 0,
            max: 100,
        });
    }
    if let Err(e) = validate_money("discount", charges.discount) {
        errors.push(e);
    }
    if let Err(e) = validate_money("shipping", charges.shipping) {
        errors.push(e);
    }
    if charges.tax_rate < 0.0 || !charges.tax_rate.is_finite() {
        errors.push(ValidationError::MustBeNonNegative { field: "taxRate" });
    }
    if let Err(e) = validate_money("mfrCoupon", charges.mfr_coupon) {
        errors.push(e);
    }

    errors
}

/// Structural validation for a rental.
pub fn validate_rental(rental: &Rental) -> FieldErrors {
    let mut errors = Vec::new();
    if let Err(e) = validate_name("itemName", &rental.item_name) {
        errors.push(e);
    }
    if let Err(e) = validate_money("rate", rental.rate) {
        errors.push(e);
    }
    if rental.due_date < rental.start_date {
        errors.push(ValidationError::InvalidFormat {
            field: "dueDate",
            reason: "must not be before the start date",
        });
    }
    errors
}

/// Structural validation for a subscription.
pub fn validate_subscription(subscription: &Subscription) -> FieldErrors {
    let mut errors = Vec::new();
    if let Err(e) = validate_name("plan", &subscription.plan) {
        errors.push(e);
    }
    if let Err(e) = validate_money("amount", subscription.amount) {
        errors.push(e);
    }
    errors
}

/// Structural validation for a customer.
pub fn validate_customer(customer: &Customer) -> FieldErrors {
    let mut errors = Vec::new();
    if let Err(e) = validate_name("name", &customer.name) {
        errors.push(e);
    }
    if let Some(email) = customer.email.as_deref() {
        // Light check only; real verification happens by sending mail.
        if !email.trim().is_empty() && !email.contains('@') {
            errors.push(ValidationError::InvalidFormat {
                field: "email",
                reason: "must contain '@'",
            });
        }
    }
    errors
}

// =============================================================================
// Unit Tests
// =============================================================================
