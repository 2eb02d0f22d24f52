//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── ValidationError  - Structural: malformed/missing input fields     │
//! │  └── CoreError        - Business rules, state conflicts, internal      │
//! │                                                                         │
//! │  tally-store errors (separate crate)                                   │
//! │  └── StoreError       - Persistence failures                           │
//! │                                                                         │
//! │  Service boundary (tally-services)                                     │
//! │  └── ActionResult     - What the UI sees (never a thrown error)        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ActionResult → UI                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (id, shortfall amount, status)
//! 3. Errors are enum variants, never bare Strings
//! 4. Structural validation short-circuits business validation

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of a [`CoreError`].
///
/// The service boundary logs this and the UI can branch on it
/// (e.g. re-prompt on structural errors, toast on business errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing required fields; detected before any business check.
    Structural,
    /// Structurally valid but violates a domain invariant.
    BusinessRule,
    /// Operation not permitted given the entity's current lifecycle state.
    StateConflict,
    /// Unexpected internal fault (e.g. storage write failure).
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They are converted to result envelopes at the service boundary, never
/// surfaced to the UI as panics or thrown exceptions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Structural validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity cannot be found.
    ///
    /// ## When This Occurs
    /// - Transfer references a product id that was deleted
    /// - Order line item points at an unknown product
    /// - Any lookup by id that comes back empty
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Insufficient stock to complete the operation.
    ///
    /// ## When This Occurs
    /// - Transfer requests more units than the source location holds
    /// - Order fulfillment would drive stock negative
    ///
    /// `available` and `requested` are in loose units
    /// (`qty × units_per_package + loose_units`), so the message names
    /// the exact shortfall.
    #[error(
        "Insufficient stock for {product}: available {available} units, requested {requested} units"
    )]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A referenced location exists but is not active.
    #[error("Location {name} is inactive")]
    InactiveLocation { name: String },

    /// Unique-name collision (case-insensitive).
    #[error("{entity} name '{name}' already exists")]
    DuplicateName { entity: &'static str, name: String },

    /// The entity's lifecycle state forbids the requested operation.
    ///
    /// ## When This Occurs
    /// - Completing an already-cancelled transfer
    /// - Editing a fulfilled order or a paid invoice
    /// - Deleting anything in a terminal state
    #[error("{entity} {id} is {status}, cannot {operation}")]
    StateConflict {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    /// Deletion blocked because other records still depend on this one.
    #[error("Cannot delete {entity} {id}: {reason}")]
    DeleteBlocked {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// Unexpected internal fault, caught and reported generically.
    #[error("Internal fault: {0}")]
    Internal(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a StateConflict error.
    pub fn state_conflict(
        entity: &'static str,
        id: impl Into<String>,
        status: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        CoreError::StateConflict {
            entity,
            id: id.into(),
            status: status.into(),
            operation,
        }
    }

    /// Classifies this error per the four-bucket taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Structural,
            CoreError::NotFound { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::InactiveLocation { .. }
            | CoreError::DuplicateName { .. } => ErrorKind::BusinessRule,
            CoreError::StateConflict { .. } | CoreError::DeleteBlocked { .. } => {
                ErrorKind::StateConflict
            }
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structural input validation errors.
///
/// These errors occur when input doesn't meet field-level requirements.
/// They are detected before business logic runs and short-circuit it.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: &'static str },

    /// Value must meet a minimum (e.g. units per package >= 1).
    #[error("{field} must be at least {min}")]
    MustBeAtLeast { field: &'static str, min: i64 },

    /// Two fields that must differ are equal (e.g. transfer from == to).
    #[error("{field_a} and {field_b} must differ")]
    MustDiffer {
        field_a: &'static str,
        field_b: &'static str,
    },

    /// Invalid format (e.g. malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
