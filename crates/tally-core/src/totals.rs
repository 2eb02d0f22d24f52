//! # Order/Invoice Totals Engine
//!
//! The deterministic pipeline that turns priced line items plus
//! document-level charges into subtotal / tax / total.
//!
//! ## Pipeline Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Document Totals Pipeline                             │
//! │                                                                         │
//! │  1. subtotal       = Σ (item.qty × item.price)                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  2. after_discount = subtotal × (1 − pct/100) − flat      clamp ≥ 0     │
//! │         │             (percentage FIRST, then flat)                     │
//! │         ▼                                                               │
//! │  3. tax_base       = after_discount (+ shipping if ship_taxable)        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  4. tax            = tax_base × tax_rate                                │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  5. total          = after_discount + shipping + tax − mfr_coupon       │
//! │         │                                               clamp ≥ 0       │
//! │         ▼                                                               │
//! │  6. round subtotal / tax / total to cents (NOTHING else is rounded)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pipeline is stateless and idempotent: it is re-run after every
//! document edit, so re-running on an already-computed document must yield
//! the same numbers. That falls out of rounding only at the boundary.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{clamp_money, round_cents};
use crate::types::{DiscountType, LineItem};

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Document-level charge parameters.
///
/// `discount_pct` is a percentage (10 = 10%); `tax_rate` is a fraction
/// (0.07 = 7%). The asymmetry is historical but frozen: snapshots in the
/// wild carry both shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChargeParams {
    pub discount_pct: f64,
    pub discount: f64,
    pub shipping: f64,
    pub ship_taxable: bool,
    pub tax_rate: f64,
    pub mfr_coupon: f64,
}

/// The rounded output of the document pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// The rounded output of the line-level pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineTotals {
    pub subtotal: f64,
    /// Discount amount actually applied (rounded for display).
    pub discount: f64,
    pub tax: f64,
    pub total: f64,
}

// =============================================================================
// Document Pipeline
// =============================================================================

/// Computes document totals for a set of line items and charges.
///
/// ## Ordering Rules
/// - Percentage discount applies to the subtotal, flat discount applies
///   to the already-percentage-discounted amount:
///   subtotal 100, pct 10, flat 5 → `100 × 0.9 − 5 = 85`, not `(100−5) × 0.9`.
/// - Shipping always joins the grand total but enters the tax base only
///   when `ship_taxable` is set.
/// - The manufacturer coupon is post-tax: it reduces the final total and
///   never shrinks the tax base.
pub fn document_totals(items: &[LineItem], charges: &ChargeParams) -> DocumentTotals {
    let subtotal: f64 = items
        .iter()
        .map(|item| item.qty as f64 * item.price)
        .sum();

    let after_pct = subtotal * (1.0 - charges.discount_pct / 100.0);
    let after_discount = clamp_money(after_pct - charges.discount);

    let tax_base = if charges.ship_taxable {
        after_discount + charges.shipping
    } else {
        after_discount
    };
    let tax = tax_base * charges.tax_rate;

    let total = clamp_money(after_discount + charges.shipping + tax - charges.mfr_coupon);

    DocumentTotals {
        subtotal: round_cents(subtotal),
        tax: round_cents(tax),
        total: round_cents(total),
    }
}

// =============================================================================
// Line-Level Pipeline
// =============================================================================

/// Computes totals for a single line item.
///
/// Same shape as the document pipeline but per line and without
/// shipping or coupon: subtotal → discount (percent, or fixed capped at
/// the line subtotal) → tax on the after-discount amount → total.
pub fn line_totals(item: &LineItem) -> LineTotals {
    let subtotal = item.qty as f64 * item.price;

    let discount_amount = match item.discount_type {
        DiscountType::Percent => subtotal * item.discount / 100.0,
        DiscountType::Fixed => item.discount.min(subtotal),
    };
    let after_discount = clamp_money(subtotal - discount_amount);

    let tax = after_discount * item.tax_rate;
    let total = after_discount + tax;

    LineTotals {
        subtotal: round_cents(subtotal),
        discount: round_cents(discount_amount),
        tax: round_cents(tax),
        total: round_cents(total),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
