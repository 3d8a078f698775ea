// crates/omf-sender-core/src/runtime/events.rs
// ============================================================================
// Module: Run Events
// Description: Structured run events and a JSON-lines observer.
// Purpose: Report delivery progress without a hard logging dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`RunEvent`] values describe destination phase changes, per-message
//! outcomes, failures, and cycle progress. [`JsonLinesObserver`] writes one
//! JSON object per event, stamped with `timestamp_ms`.
//! Security posture: events carry destination names, message kinds, and
//! endpoint error text only; credentials and tokens are never recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Action;
use crate::core::DeliveryError;
use crate::core::DeliveryOutcome;
use crate::core::FailureClass;
use crate::core::MessageKind;
use crate::interfaces::RunObserver;
use crate::runtime::orchestrator::DestinationPhase;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Structured event emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// Destination will be contacted without TLS certificate verification.
    TlsVerificationDisabled {
        /// Destination name.
        destination: String,
    },
    /// Destination moved to a new phase.
    PhaseEntered {
        /// Destination name.
        destination: String,
        /// Phase entered.
        phase: DestinationPhase,
    },
    /// Message was accepted or already existed.
    MessageDelivered {
        /// Destination name.
        destination: String,
        /// Message kind.
        message_type: MessageKind,
        /// Requested action.
        action: Action,
        /// Delivery outcome.
        outcome: DeliveryOutcome,
    },
    /// Message send failed.
    DeliveryFailed {
        /// Destination name.
        destination: String,
        /// Message kind.
        message_type: MessageKind,
        /// Requested action.
        action: Action,
        /// Failure kind label.
        kind: &'static str,
        /// Retry classification.
        class: FailureClass,
        /// Failure description.
        error: String,
    },
    /// Best-effort teardown send failed.
    CleanupFailed {
        /// Destination name.
        destination: String,
        /// Message kind being deleted.
        message_type: MessageKind,
        /// Failure description.
        error: String,
    },
    /// Data cycle finished for every streaming destination.
    CycleCompleted {
        /// One-based cycle number.
        cycle: u64,
    },
    /// Run finished.
    RunFinished {
        /// Overall success.
        success: bool,
        /// Whether the run stopped on cancellation.
        cancelled: bool,
        /// Completed data cycles.
        cycles: u64,
    },
}

impl RunEvent {
    /// Builds a [`RunEvent::DeliveryFailed`] from a delivery error.
    #[must_use]
    pub fn delivery_failed(
        destination: &str,
        message_type: MessageKind,
        action: Action,
        error: &DeliveryError,
    ) -> Self {
        Self::DeliveryFailed {
            destination: destination.to_string(),
            message_type,
            action,
            kind: error.kind_label(),
            class: error.class(),
            error: error.to_string(),
        }
    }
}

// ============================================================================
// SECTION: JSON Lines Observer
// ============================================================================

/// Timestamped wrapper serialized for each event.
#[derive(Serialize)]
struct EventRecord<'a> {
    /// Event timestamp (milliseconds since epoch).
    timestamp_ms: u128,
    /// Wrapped event.
    #[serde(flatten)]
    event: &'a RunEvent,
}

/// Observer that writes JSON lines to a writer.
pub struct JsonLinesObserver<W: Write + Send> {
    /// Output writer for event records.
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesObserver<W> {
    /// Creates an observer writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the observer and returns the writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> RunObserver for JsonLinesObserver<W> {
    fn record(&self, event: &RunEvent) {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let record = EventRecord {
            timestamp_ms,
            event,
        };
        if let Ok(payload) = serde_json::to_string(&record)
            && let Ok(mut writer) = self.writer.lock()
        {
            let _ = writeln!(writer, "{payload}");
            let _ = writer.flush();
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
