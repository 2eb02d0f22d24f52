//! # Money Primitives
//!
//! Rounding and clamping helpers for monetary amounts.
//!
//! ## Why Floats With Boundary Rounding?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUNDING DISCIPLINE                                                    │
//! │                                                                         │
//! │  The totals pipeline chains several fractional steps:                   │
//! │    subtotal → % discount → flat discount → shipping → tax → coupon      │
//! │                                                                         │
//! │  Rounding INSIDE the chain compounds error:                             │
//! │    round($0.825) then round(...) then round(...)  → drift per step      │
//! │                                                                         │
//! │  OUR RULE: full f64 precision through the chain, one rounding pass      │
//! │  at the boundary (subtotal / tax / total), half-up to cents.            │
//! │                                                                         │
//! │  Re-running the pipeline on its own output is then a no-op, which       │
//! │  matters because totals are recomputed after every document edit.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{round_cents, clamp_money};
//!
//! assert_eq!(round_cents(7.700000000000001), 7.70);
//! assert_eq!(clamp_money(-3.5), 0.0);
//! ```

// =============================================================================
// Rounding
// =============================================================================

/// Rounds a monetary amount to 2 decimal places, half-up away from zero.
///
/// ## Example
/// ```rust
/// use tally_core::money::round_cents;
///
/// assert_eq!(round_cents(10.994), 10.99);
/// assert_eq!(round_cents(10.995000001), 11.00);
/// ```
///
/// ## Note
/// Only `subtotal`, `tax` and `total` pass through here. Intermediate
/// discount amounts stay at full precision (see module docs).
#[inline]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Clamps a monetary amount to be non-negative.
///
/// Used after discounts and the post-tax manufacturer coupon, both of
/// which may legitimately exceed the remaining amount.
///
/// ## Example
/// ```rust
/// use tally_core::money::clamp_money;
///
/// assert_eq!(clamp_money(12.5), 12.5);
/// assert_eq!(clamp_money(0.0), 0.0);
/// assert_eq!(clamp_money(-0.01), 0.0);
/// ```
#[inline]
pub fn clamp_money(amount: f64) -> f64 {
    if amount < 0.0 {
        0.0
    } else {
        amount
    }
}

// =============================================================================
// Display
// =============================================================================

/// Formats an amount as a dollar string for logs and debugging.
///
/// UI display formatting (localization, currency symbol) belongs to the
/// frontend; this is only for internal messages.
pub fn format_money(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(10.0), 10.0);
        assert_eq!(round_cents(10.994), 10.99);
        assert_eq!(round_cents(7.700000000000001), 7.70);
        assert_eq!(round_cents(0.0), 0.0);
    }

    #[test]
    fn test_round_cents_is_idempotent() {
        for amount in [0.0, 0.01, 85.0, 7.7, 117.7, 1234.56] {
            assert_eq!(round_cents(round_cents(amount)), round_cents(amount));
        }
    }

    #[test]
    fn test_clamp_money() {
        assert_eq!(clamp_money(5.25), 5.25);
        assert_eq!(clamp_money(0.0), 0.0);
        assert_eq!(clamp_money(-100.0), 0.0);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(10.99), "$10.99");
        assert_eq!(format_money(5.0), "$5.00");
        assert_eq!(format_money(-5.5), "-$5.50");
        assert_eq!(format_money(0.0), "$0.00");
    }
}
