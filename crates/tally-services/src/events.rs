//! # Application Events
//!
//! Cross-cutting notifications emitted after a mutation both succeeds
//! and persists. The UI collaborator subscribes to refresh dependent
//! views (dashboards, stock tables) without polling.
//!
//! Events are fire-and-forget: a sink must never fail the action that
//! emitted the event.

use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

/// Something the rest of the application may care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AppEvent {
    /// A product's stock changed (adjustment, transfer, fulfillment).
    ProductStockChanged { product_id: String },
    /// A pending transfer completed and stock moved.
    TransferCompleted { transfer_id: String },
    /// An order was fulfilled and stock deducted.
    OrderFulfilled { order_id: String },
    /// An invoice was marked paid.
    InvoicePaid { invoice_id: String },
}

impl AppEvent {
    /// Stable channel name, used as the subscription key.
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::ProductStockChanged { .. } => "product:stock-changed",
            AppEvent::TransferCompleted { .. } => "transfer:completed",
            AppEvent::OrderFulfilled { .. } => "order:fulfilled",
            AppEvent::InvoicePaid { .. } => "invoice:paid",
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receives events emitted by the services.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}

/// Discards every event. For hosts with no subscribers.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, event: AppEvent) {
        debug!(event = event.name(), "Event dropped (no sink)");
    }
}

/// Records every event in order. For tests.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AppEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().expect("RecordingSink mutex poisoned").clone()
    }

    /// Channel names of everything recorded, in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AppEvent::name).collect()
    }

    /// Discards everything recorded so far (fixture setup noise).
    pub fn clear(&self) {
        self.events
            .lock()
            .expect("RecordingSink mutex poisoned")
            .clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AppEvent) {
        self.events
            .lock()
            .expect("RecordingSink mutex poisoned")
            .push(event);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
