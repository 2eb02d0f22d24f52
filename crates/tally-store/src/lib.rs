//! # tally-store: Persistence Layer for Tally
//!
//! Whole-collection snapshot persistence over a key-value blob store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-services                                                         │
//! │       │  (reads/mutates collections, surfaces faults in envelopes)     │
//! │       ▼                                                                 │
//! │  Database ── Repository<Product> ─┐                                    │
//! │          ├── Repository<Order>    ├──► BlobStore (put/get)             │
//! │          └── Repository<...>      ┘        │                            │
//! │                                            ├── MemoryStore             │
//! │                                            └── FileStore               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees (and Non-Guarantees)
//! - Synchronous, best-effort snapshots: every mutation rewrites the whole
//!   collection. No ACID, no write-ahead log, last writer wins.
//! - A corrupt snapshot fails the load loudly instead of starting empty.
//! - Bulk export/import wraps all collections in a versioned bundle;
//!   imports are validated before any collection is replaced.

pub mod database;
pub mod error;
pub mod export;
pub mod repository;
pub mod store;

pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use export::{parse_bundle, ExportBundle, EXPORT_VERSION};
pub use repository::{HasId, Repository};
pub use store::{BlobStore, FileStore, MemoryStore};
