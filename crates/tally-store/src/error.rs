//! # Store Error Types
//!
//! Error types for persistence operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io / serde_json errors                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds the collection key and category       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tally-services catches it at the boundary and reports it as an        │
//! │  InternalFault in the ActionResult envelope - the UI never sees a      │
//! │  panic or a raw I/O error                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Persistence operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure (file missing permissions, disk full...).
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure writing a collection snapshot.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored blob exists but cannot be parsed back.
    ///
    /// ## When This Occurs
    /// - Hand-edited snapshot files
    /// - A partial write from a crashed earlier run
    #[error("Corrupt snapshot for '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Import bundle declares a version this build doesn't understand.
    #[error("Unsupported export version {found} (this build reads up to {max})")]
    UnsupportedVersion { found: i64, max: i64 },

    /// Import bundle field that should be an array is something else.
    #[error("Invalid export bundle: '{field}' must be an array")]
    InvalidCollection { field: String },

    /// Import bundle is not a JSON object at all.
    #[error("Invalid export bundle: expected a JSON object")]
    NotAnObject,
}

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;
