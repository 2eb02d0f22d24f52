//! # Action Result Envelope
//!
//! The uniform shape every service call returns to the UI.
//!
//! ## Envelope Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ActionResult<T>                                  │
//! │                                                                         │
//! │  success  { success: true,  data: <entity>, error: null }              │
//! │                                                                         │
//! │  failure  { success: false, data: null, error: "why",                  │
//! │             errors: ["field error", ...] }   ← errors only when the    │
//! │                                                failure is structural   │
//! │                                                                         │
//! │  The UI never sees a panic or a thrown error: every expected failure   │
//! │  (validation, business rule, state conflict, storage fault) arrives    │
//! │  in this envelope.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, warn};

use tally_core::validation::FieldErrors;
use tally_core::{CoreError, CoreResult, ErrorKind};

/// What every service operation hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T> {
    pub success: bool,
    /// The affected entity on success, `null` on failure.
    pub data: Option<T>,
    /// Human-readable failure reason, `null` on success.
    pub error: Option<String>,
    /// Per-field messages when the failure is structural validation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> ActionResult<T> {
    /// A successful result carrying the affected entity.
    pub fn ok(data: T) -> Self {
        ActionResult {
            success: true,
            data: Some(data),
            error: None,
            errors: Vec::new(),
        }
    }

    /// A failed result from a core error.
    ///
    /// Internal faults log at warn (something is wrong with the host);
    /// everything else logs at debug (the user just hit a rule).
    pub fn fail(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::Internal => warn!(error = %err, "Action failed"),
            _ => debug!(error = %err, "Action rejected"),
        }
        ActionResult {
            success: false,
            data: None,
            error: Some(err.to_string()),
            errors: Vec::new(),
        }
    }

    /// A failed result from structural validation: all field messages
    /// are carried so the UI can mark every offending input at once.
    pub fn invalid(field_errors: FieldErrors) -> Self {
        debug_assert!(!field_errors.is_empty());
        let errors: Vec<String> = field_errors.iter().map(|e| e.to_string()).collect();
        debug!(count = errors.len(), "Action rejected: validation");
        ActionResult {
            success: false,
            data: None,
            error: errors.first().cloned(),
            errors,
        }
    }

    /// Collapses a `CoreResult` into the envelope.
    pub fn from_result(result: CoreResult<T>) -> Self {
        match result {
            Ok(data) => ActionResult::ok(data),
            Err(err) => ActionResult::fail(err),
        }
    }
}

/// Wraps a persistence failure as an internal fault. The in-memory
/// mutation has already been kept (see tally-store's repository docs),
/// so the caller learns about the divergence without losing the change.
pub(crate) fn store_fault(err: tally_store::StoreError) -> CoreError {
    CoreError::Internal(err.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
