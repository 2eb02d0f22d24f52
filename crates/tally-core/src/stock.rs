//! # Stock Ledger
//!
//! Per-location and aggregate stock arithmetic for a product.
//!
//! ## Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Representation                                 │
//! │                                                                         │
//! │  Product (units_per_package = 12)                                       │
//! │                                                                         │
//! │  stock_by_location (AUTHORITATIVE)        top-level cache (DERIVED)     │
//! │  ┌──────────────────────────────┐         ┌───────────────────────┐     │
//! │  │ "warehouse" → 8 pkg, 3 loose │         │ qty = 10              │     │
//! │  │ "van"       → 2 pkg, 1 loose │  ─sum─► │ loose_units = 4       │     │
//! │  └──────────────────────────────┘         └───────────────────────┘     │
//! │                                                                         │
//! │  total_units = 10 × 12 + 4 = 124                                        │
//! │                                                                         │
//! │  INVARIANT (everywhere, after every mutation):                          │
//! │    0 <= loose_units < units_per_package                                 │
//! │                                                                         │
//! │  INVARIANT (cache consistency):                                         │
//! │    Σ location units == qty × units_per_package + loose_units            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Borrowing and Overflow
//! Deduction may drive a location's loose units negative; we then "borrow"
//! whole packages (`ceil(deficit / units_per_package)`) to cover it.
//! Addition may push loose units to or past a full package; overflow folds
//! into whole packages. Both directions converge on the invariant above.
//!
//! All functions here are pure with respect to I/O: they mutate the passed
//! product in place and return. Persistence and event notification happen
//! at the service layer.

use crate::error::{CoreError, CoreResult};
use crate::types::{LocationStock, Product};

// =============================================================================
// Aggregate Operations
// =============================================================================

/// Adjusts the top-level package count by `delta`, clamping the result
/// to zero. Loose units are untouched.
///
/// ## Example
/// ```rust,ignore
/// adjust_quantity(&mut product, -3);       // qty: 10 → 7
/// adjust_quantity(&mut product, -999_999); // qty clamps to 0, loose untouched
/// ```
pub fn adjust_quantity(product: &mut Product, delta: i64) {
    product.qty = (product.qty + delta).max(0);
}

/// Consumes `units` loose units from aggregate stock: loose units first,
/// then whole packages, with the unconsumed remainder of the last opened
/// package returned to loose units.
///
/// Fails with `InsufficientStock` (and touches nothing) when `units`
/// exceeds `total_units`.
pub fn consume_units(product: &mut Product, units: i64) -> CoreResult<()> {
    if units <= 0 {
        return Ok(());
    }

    let available = product.total_units();
    if units > available {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available,
            requested: units,
        });
    }

    let mut remaining = units;

    let from_loose = remaining.min(product.loose_units);
    product.loose_units -= from_loose;
    remaining -= from_loose;

    if remaining > 0 {
        // Open just enough packages to cover the rest; leftovers go loose.
        let packages = div_ceil(remaining, product.units_per_package);
        product.qty -= packages;
        product.loose_units += packages * product.units_per_package - remaining;
    }

    debug_assert!(product.qty >= 0);
    debug_assert!(product.loose_units < product.units_per_package);
    Ok(())
}

/// Folds loose-unit overflow into whole packages until
/// `loose_units < units_per_package`. Idempotent.
pub fn normalize_units(product: &mut Product) {
    if product.units_per_package < 1 {
        // Legacy records may predate the >= 1 invariant; leave them alone
        // rather than divide by zero.
        return;
    }
    if product.loose_units >= product.units_per_package {
        product.qty += product.loose_units / product.units_per_package;
        product.loose_units %= product.units_per_package;
    }
}

/// Recomputes the top-level `qty`/`loose_units` cache as the normalized
/// sum over all `stock_by_location` entries.
///
/// Each entry is re-normalized under the current `units_per_package`
/// first: entries written under a larger package size may carry loose
/// overflow after the size shrinks.
///
/// Products with no per-location entries keep their standalone counts
/// (single-location businesses never populate the map).
pub fn update_product_total_stock(product: &mut Product) {
    if product.stock_by_location.is_empty() {
        normalize_units(product);
        return;
    }

    let upp = product.units_per_package;
    let mut qty = 0;
    let mut loose = 0;
    for entry in product.stock_by_location.values_mut() {
        if upp >= 1 && entry.loose_units >= upp {
            entry.qty += entry.loose_units / upp;
            entry.loose_units %= upp;
        }
        qty += entry.qty;
        loose += entry.loose_units;
    }

    product.qty = qty;
    product.loose_units = loose;
    normalize_units(product);
}

// =============================================================================
// Per-Location Operations
// =============================================================================

/// Units available at one location, in loose-unit equivalent.
pub fn available_units_at(product: &Product, location_id: &str) -> i64 {
    product
        .stock_at(location_id)
        .total_units(product.units_per_package)
}

/// Deducts `quantity` packages and `loose_units` from a location,
/// borrowing whole packages when the loose count goes negative.
///
/// ## Borrowing
/// ```text
/// location: 5 pkg, 2 loose (upp = 12)   deduct 0 pkg, 8 loose
///      │
///      ▼
/// loose = 2 - 8 = -6  → borrow ceil(6/12) = 1 package
///      │
///      ▼
/// location: 4 pkg, 6 loose   (invariant restored)
/// ```
///
/// Fails with `InsufficientStock` (and touches nothing) when the location
/// holds fewer units than requested. The error names the shortfall in
/// loose-unit terms.
pub fn deduct_at(
    product: &mut Product,
    location_id: &str,
    quantity: i64,
    loose_units: i64,
) -> CoreResult<()> {
    let upp = product.units_per_package;
    let requested = quantity * upp + loose_units;
    if requested <= 0 {
        return Ok(());
    }

    let available = available_units_at(product, location_id);
    if requested > available {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available,
            requested,
        });
    }

    let entry = product
        .stock_by_location
        .entry(location_id.to_string())
        .or_default();

    entry.qty -= quantity;
    entry.loose_units -= loose_units;

    if entry.loose_units < 0 {
        let deficit = -entry.loose_units;
        let borrow = div_ceil(deficit, upp);
        entry.qty -= borrow;
        entry.loose_units += borrow * upp;
    }

    debug_assert!(entry.qty >= 0);
    debug_assert!((0..upp).contains(&entry.loose_units));
    Ok(())
}

/// Adds `quantity` packages and `loose_units` to a location,
/// folding loose overflow into whole packages.
pub fn add_at(product: &mut Product, location_id: &str, quantity: i64, loose_units: i64) {
    let upp = product.units_per_package;
    let entry = product
        .stock_by_location
        .entry(location_id.to_string())
        .or_default();

    entry.qty += quantity;
    entry.loose_units += loose_units;

    if upp >= 1 && entry.loose_units >= upp {
        entry.qty += entry.loose_units / upp;
        entry.loose_units %= upp;
    }
}

/// Overwrites a location's stock entry, normalizing overflow, and refreshes
/// the aggregate cache.
pub fn set_stock_at(product: &mut Product, location_id: &str, quantity: i64, loose_units: i64) {
    let upp = product.units_per_package;
    let mut entry = LocationStock {
        qty: quantity.max(0),
        loose_units: loose_units.max(0),
    };
    if upp >= 1 && entry.loose_units >= upp {
        entry.qty += entry.loose_units / upp;
        entry.loose_units %= upp;
    }
    product
        .stock_by_location
        .insert(location_id.to_string(), entry);
    update_product_total_stock(product);
}

/// Consumes `units` loose units from a specific location, borrowing
/// packages as needed, then refreshes the aggregate cache.
pub fn consume_units_at(product: &mut Product, location_id: &str, units: i64) -> CoreResult<()> {
    deduct_at(product, location_id, 0, units)?;
    update_product_total_stock(product);
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Ceiling division for non-negative operands.
#[inline]
const fn div_ceil(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}

// =============================================================================
// Unit Tests
// =============================================================================
