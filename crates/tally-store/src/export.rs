//! # Bulk Export / Import
//!
//! The envelope that wraps every collection for backup and migration.
//!
//! ## Bundle Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Export Bundle (JSON)                               │
//! │                                                                         │
//! │  {                                                                      │
//! │    "version": 1,                  ← rejected when > 1                   │
//! │    "ts": "2024-06-01T12:00:00Z",  ← ISO-8601 export timestamp           │
//! │    "products":      [ ... ],      ┐                                     │
//! │    "locations":     [ ... ],      │  every declared collection          │
//! │    "transfers":     [ ... ],      │  must actually be an array;         │
//! │    "orders":        [ ... ],      │  missing collections default        │
//! │    "invoices":      [ ... ],      │  to empty                           │
//! │    "rentals":       [ ... ],      │                                     │
//! │    "subscriptions": [ ... ],      │                                     │
//! │    "customers":     [ ... ]       ┘                                     │
//! │  }                                                                      │
//! │                                                                         │
//! │  Import is validated BEFORE any collection is touched, so a bad        │
//! │  bundle can never half-replace the database.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{
    Customer, Invoice, Location, Order, Product, Rental, Subscription, Transfer,
};

use crate::error::{StoreError, StoreResult};

/// Current export format version. Bundles declaring a greater version
/// come from a future build and are rejected rather than misread.
pub const EXPORT_VERSION: i64 = 1;

/// The collection fields a bundle may declare.
pub const COLLECTION_FIELDS: [&str; 8] = [
    "products",
    "locations",
    "transfers",
    "orders",
    "invoices",
    "rentals",
    "subscriptions",
    "customers",
];

// =============================================================================
// Bundle
// =============================================================================

/// A full-database snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default = "default_version")]
    pub version: i64,
    /// ISO-8601 export timestamp.
    pub ts: String,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub rentals: Vec<Rental>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub customers: Vec<Customer>,
}

fn default_version() -> i64 {
    // Early exports predate the version field; read them as v1.
    EXPORT_VERSION
}

impl ExportBundle {
    /// An empty bundle stamped `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        ExportBundle {
            version: EXPORT_VERSION,
            ts: now.to_rfc3339(),
            products: Vec::new(),
            locations: Vec::new(),
            transfers: Vec::new(),
            orders: Vec::new(),
            invoices: Vec::new(),
            rentals: Vec::new(),
            subscriptions: Vec::new(),
            customers: Vec::new(),
        }
    }
}

// =============================================================================
// Import Validation
// =============================================================================

/// Validates the shape of an incoming bundle, then parses it.
///
/// Shape checks run on the raw JSON first so error messages name the
/// offending field instead of surfacing a generic serde failure:
/// - the bundle must be an object
/// - `version` must not exceed [`EXPORT_VERSION`]
/// - every declared collection field must actually be an array
pub fn parse_bundle(value: serde_json::Value) -> StoreResult<ExportBundle> {
    let object = value.as_object().ok_or(StoreError::NotAnObject)?;

    if let Some(version) = object.get("version") {
        let found = version.as_i64().unwrap_or(i64::MAX);
        if found > EXPORT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found,
                max: EXPORT_VERSION,
            });
        }
    }

    for field in COLLECTION_FIELDS {
        if let Some(declared) = object.get(field) {
            if !declared.is_array() {
                return Err(StoreError::InvalidCollection {
                    field: field.to_string(),
                });
            }
        }
    }

    let bundle = serde_json::from_value(value)?;
    Ok(bundle)
}

// =============================================================================
// Unit Tests
// =============================================================================
