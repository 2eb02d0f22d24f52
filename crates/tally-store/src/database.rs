//! # Database
//!
//! The aggregate of every collection repository, plus bulk export/import.
//!
//! One `Database` lives for the life of the host. Services borrow the
//! repositories they need per operation; there is no connection pool or
//! session concept because storage is just blob snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use tally_core::{
    Customer, Invoice, Location, Order, Product, Rental, Subscription, Transfer,
};

use crate::error::StoreResult;
use crate::export::{parse_bundle, ExportBundle, EXPORT_VERSION};
use crate::repository::Repository;
use crate::store::BlobStore;

/// All entity collections over one blob store.
pub struct Database {
    products: Repository<Product>,
    locations: Repository<Location>,
    transfers: Repository<Transfer>,
    orders: Repository<Order>,
    invoices: Repository<Invoice>,
    rentals: Repository<Rental>,
    subscriptions: Repository<Subscription>,
    customers: Repository<Customer>,
}

impl Database {
    /// Loads every collection from the store (empty where absent).
    ///
    /// Fails fast on a corrupt snapshot rather than silently starting
    /// with partial data.
    pub fn open(store: Arc<dyn BlobStore>) -> StoreResult<Self> {
        let db = Database {
            products: Repository::load("products", store.clone())?,
            locations: Repository::load("locations", store.clone())?,
            transfers: Repository::load("transfers", store.clone())?,
            orders: Repository::load("orders", store.clone())?,
            invoices: Repository::load("invoices", store.clone())?,
            rentals: Repository::load("rentals", store.clone())?,
            subscriptions: Repository::load("subscriptions", store.clone())?,
            customers: Repository::load("customers", store)?,
        };
        info!(
            products = db.products.len(),
            locations = db.locations.len(),
            transfers = db.transfers.len(),
            "Database opened"
        );
        Ok(db)
    }

    pub fn products(&self) -> &Repository<Product> {
        &self.products
    }

    pub fn locations(&self) -> &Repository<Location> {
        &self.locations
    }

    pub fn transfers(&self) -> &Repository<Transfer> {
        &self.transfers
    }

    pub fn orders(&self) -> &Repository<Order> {
        &self.orders
    }

    pub fn invoices(&self) -> &Repository<Invoice> {
        &self.invoices
    }

    pub fn rentals(&self) -> &Repository<Rental> {
        &self.rentals
    }

    pub fn subscriptions(&self) -> &Repository<Subscription> {
        &self.subscriptions
    }

    pub fn customers(&self) -> &Repository<Customer> {
        &self.customers
    }

    // =========================================================================
    // Bulk Export / Import
    // =========================================================================

    /// Snapshots every collection into a bundle stamped `now`.
    pub fn export(&self, now: DateTime<Utc>) -> ExportBundle {
        ExportBundle {
            version: EXPORT_VERSION,
            ts: now.to_rfc3339(),
            products: self.products.all(),
            locations: self.locations.all(),
            transfers: self.transfers.all(),
            orders: self.orders.all(),
            invoices: self.invoices.all(),
            rentals: self.rentals.all(),
            subscriptions: self.subscriptions.all(),
            customers: self.customers.all(),
        }
    }

    /// Validates and applies a bundle, replacing every collection.
    ///
    /// Validation completes before anything is touched; a malformed
    /// bundle can never half-replace the database.
    pub fn import(&self, value: serde_json::Value) -> StoreResult<()> {
        let bundle = parse_bundle(value)?;
        info!(
            version = bundle.version,
            ts = %bundle.ts,
            products = bundle.products.len(),
            "Importing bundle"
        );

        self.products.replace_all(bundle.products)?;
        self.locations.replace_all(bundle.locations)?;
        self.transfers.replace_all(bundle.transfers)?;
        self.orders.replace_all(bundle.orders)?;
        self.invoices.replace_all(bundle.invoices)?;
        self.rentals.replace_all(bundle.rentals)?;
        self.subscriptions.replace_all(bundle.subscriptions)?;
        self.customers.replace_all(bundle.customers)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
