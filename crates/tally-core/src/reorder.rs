//! # Reorder / Stock-Level Analyzer
//!
//! Pure classification of how healthy a product's stock is, plus the
//! suggested reorder quantity.
//!
//! ## Classification Thresholds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 qty / reorder_point ratio                               │
//! │                                                                         │
//! │   qty == 0 ──────────────────────────────────────────► Out             │
//! │   reorder_point == 0 (no monitoring) ────────────────► Adequate        │
//! │   ratio <= 0.5 ──────────────────────────────────────► Critical        │
//! │   ratio <= 1.0 ──────────────────────────────────────► Low             │
//! │   ratio <= 2.0 ──────────────────────────────────────► Adequate        │
//! │   otherwise ─────────────────────────────────────────► Good            │
//! │                                                                         │
//! │   Boundaries are inclusive: qty == reorder_point reads as Low,         │
//! │   qty == reorder_point/2 reads as Critical.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The restock target is double the trigger point, so a product sitting
//! exactly at its reorder point gets a suggestion that carries it well
//! clear of the threshold instead of bouncing back next week.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;

// =============================================================================
// Stock Level
// =============================================================================

/// Health classification of a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockLevel {
    /// Nothing on hand.
    Out,
    /// At or below half the reorder point.
    Critical,
    /// At or below the reorder point.
    Low,
    /// Healthy, or not monitored.
    Adequate,
    /// More than double the reorder point.
    Good,
}

impl StockLevel {
    /// True for levels that should appear on a restock report.
    #[inline]
    pub const fn needs_attention(&self) -> bool {
        matches!(self, StockLevel::Out | StockLevel::Critical | StockLevel::Low)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classifies a package count against a reorder point.
///
/// `reorder_point == 0` means monitoring is off; anything non-zero on hand
/// then reads as Adequate.
pub fn stock_level(qty: i64, reorder_point: i64) -> StockLevel {
    if qty <= 0 {
        return StockLevel::Out;
    }
    if reorder_point <= 0 {
        return StockLevel::Adequate;
    }

    let ratio = qty as f64 / reorder_point as f64;
    if ratio <= 0.5 {
        StockLevel::Critical
    } else if ratio <= 1.0 {
        StockLevel::Low
    } else if ratio <= 2.0 {
        StockLevel::Adequate
    } else {
        StockLevel::Good
    }
}

/// Suggested packages to reorder: restock to double the trigger point,
/// but never less than the immediate shortage.
///
/// `max(shortage, 2 × reorder_point − qty)`, floored at zero;
/// zero when monitoring is off.
pub fn suggested_reorder_qty(qty: i64, reorder_point: i64) -> i64 {
    if reorder_point <= 0 {
        return 0;
    }
    let shortage = (reorder_point - qty).max(0);
    let to_target = reorder_point * 2 - qty;
    shortage.max(to_target).max(0)
}

/// Convenience: classify a product directly.
pub fn product_stock_level(product: &Product) -> StockLevel {
    stock_level(product.qty, product.reorder_point)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_regardless_of_reorder_point() {
        assert_eq!(stock_level(0, 0), StockLevel::Out);
        assert_eq!(stock_level(0, 10), StockLevel::Out);
        assert_eq!(stock_level(0, 1000), StockLevel::Out);
    }

    #[test]
    fn test_no_monitoring_reads_adequate() {
        assert_eq!(stock_level(1, 0), StockLevel::Adequate);
        assert_eq!(stock_level(500, 0), StockLevel::Adequate);
    }

    #[test]
    fn test_boundary_exactly_at_reorder_point_is_low() {
        assert_eq!(stock_level(10, 10), StockLevel::Low);
    }

    #[test]
    fn test_boundary_exactly_half_is_critical() {
        assert_eq!(stock_level(5, 10), StockLevel::Critical);
        assert_eq!(stock_level(1, 2), StockLevel::Critical);
    }

    #[test]
    fn test_ratio_bands() {
        assert_eq!(stock_level(4, 10), StockLevel::Critical); // 0.4
        assert_eq!(stock_level(6, 10), StockLevel::Low); // 0.6
        assert_eq!(stock_level(15, 10), StockLevel::Adequate); // 1.5
        assert_eq!(stock_level(20, 10), StockLevel::Adequate); // 2.0 inclusive
        assert_eq!(stock_level(21, 10), StockLevel::Good); // 2.1
    }

    #[test]
    fn test_suggested_reorder_restocks_to_double() {
        // qty 4, reorder 10: shortage 6, to-target 16 → 16
        assert_eq!(suggested_reorder_qty(4, 10), 16);
        // qty 10 (at the trigger): to-target 10
        assert_eq!(suggested_reorder_qty(10, 10), 10);
        // qty 0: full 2× target
        assert_eq!(suggested_reorder_qty(0, 10), 20);
    }

    #[test]
    fn test_suggested_reorder_never_negative() {
        assert_eq!(suggested_reorder_qty(50, 10), 0);
        assert_eq!(suggested_reorder_qty(20, 10), 0);
    }

    #[test]
    fn test_suggested_reorder_off_when_unmonitored() {
        assert_eq!(suggested_reorder_qty(0, 0), 0);
        assert_eq!(suggested_reorder_qty(3, 0), 0);
    }

    #[test]
    fn test_needs_attention() {
        assert!(StockLevel::Out.needs_attention());
        assert!(StockLevel::Critical.needs_attention());
        assert!(StockLevel::Low.needs_attention());
        assert!(!StockLevel::Adequate.needs_attention());
        assert!(!StockLevel::Good.needs_attention());
    }
}
