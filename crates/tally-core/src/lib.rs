//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tally Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  UI Collaborator (browser)                      │   │
//! │  │    Forms ──► Dialogs ──► Tables ──► re-render on result        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ActionResult envelopes                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                     tally-services                              │   │
//! │  │    create/update/delete per entity, workflows, events           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   stock   │  │  totals   │  │  reorder  │  │ validation│  │   │
//! │  │   │  ledger   │  │ pipeline  │  │ analyzer  │  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO CLOCK READS • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                      tally-store                                │   │
//! │  │          collection snapshots, repositories, export             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Location, Transfer, Order, ...)
//! - [`money`] - Rounding/clamping primitives for monetary amounts
//! - [`stock`] - Stock ledger: per-location and aggregate arithmetic
//! - [`totals`] - Order/invoice totals pipeline
//! - [`reorder`] - Stock-level classification and reorder suggestions
//! - [`validation`] - Structural validation rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Storage, network, file system access is FORBIDDEN here
//! 3. **No Clock Reads**: Date-driven derivations take `now` as a parameter
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::totals::{document_totals, ChargeParams};
//! use tally_core::types::{DiscountType, LineItem};
//!
//! let items = vec![LineItem {
//!     product_id: None,
//!     name: "Widget".to_string(),
//!     qty: 2,
//!     price: 50.0,
//!     discount: 0.0,
//!     discount_type: DiscountType::Percent,
//!     tax_rate: 0.0,
//! }];
//! let charges = ChargeParams {
//!     discount_pct: 10.0,
//!     tax_rate: 0.07,
//!     ..Default::default()
//! };
//!
//! let totals = document_totals(&items, &charges);
//! assert_eq!(totals.subtotal, 100.0);
//! assert_eq!(totals.tax, 6.30);
//! assert_eq!(totals.total, 96.30);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reorder;
pub mod stock;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Product` instead of
// `use tally_core::types::Product`

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use reorder::StockLevel;
pub use totals::{ChargeParams, DocumentTotals, LineTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single order or invoice.
///
/// ## Business Reason
/// Prevents runaway documents and keeps whole-collection persistence
/// snapshots a reasonable size.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity on a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length for names (products, locations, customers, plans).
pub const MAX_NAME_LEN: usize = 200;
