// crates/omf-sender-core/src/interfaces/mod.rs
// ============================================================================
// Module: OMF Sender Interfaces
// Description: Traits for transport, data regeneration, and run observation.
// Purpose: Keep the orchestrator free of network I/O and sample-data policy.
// Dependencies: crate::{core, runtime}, serde_json
// ============================================================================

//! ## Overview
//! The orchestrator talks to the outside world through three seams:
//! [`MessageSender`] performs a single OMF send, [`DataGenerator`] produces
//! the next data record for a container, and [`RunObserver`] receives
//! structured run events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::Action;
use crate::core::DataTemplate;
use crate::core::DeliveryError;
use crate::core::DeliveryOutcome;
use crate::core::Destination;
use crate::core::MessageKind;
use crate::runtime::RunEvent;

// ============================================================================
// SECTION: Message Sender
// ============================================================================

/// Delivers one OMF message to one destination.
pub trait MessageSender {
    /// Sends `body` wrapped in a one-element array.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] for token, transport, and protocol failures.
    /// A 409 response is [`DeliveryOutcome::Duplicate`], not an error.
    fn send(
        &mut self,
        destination: &Destination,
        kind: MessageKind,
        body: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError>;
}

impl<S: MessageSender + ?Sized> MessageSender for &mut S {
    fn send(
        &mut self,
        destination: &Destination,
        kind: MessageKind,
        body: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        (**self).send(destination, kind, body, action)
    }
}

// ============================================================================
// SECTION: Data Generator
// ============================================================================

/// Produces the next data record for a container.
///
/// Generation state is threaded explicitly: the orchestrator keeps one
/// `State` per container and hands back whatever the previous call returned.
pub trait DataGenerator {
    /// Per-container generation state.
    type State: Default;

    /// Returns the regenerated record and the state for the next cycle.
    fn generate(&self, template: &DataTemplate, previous: &Self::State) -> (Value, Self::State);
}

// ============================================================================
// SECTION: Run Observer
// ============================================================================

/// Receives structured run events.
pub trait RunObserver {
    /// Records one event. Implementations must not fail the run.
    fn record(&self, event: &RunEvent);
}

/// Observer that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn record(&self, _event: &RunEvent) {}
}
