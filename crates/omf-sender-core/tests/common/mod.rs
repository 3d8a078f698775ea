// crates/omf-sender-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Fake senders, generators, and observers for orchestrator tests.
// Purpose: Exercise delivery ordering without network I/O.
// Dependencies: omf-sender-core, serde_json
// ============================================================================

//! ## Overview
//! Provides a scripted sender that records every call, a stateful sender
//! that behaves like an OMF endpoint (409 on re-create, 404 on unknown
//! references), a counting data generator, and a recording observer.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;

use omf_sender_core::Action;
use omf_sender_core::DataGenerator;
use omf_sender_core::DataTemplate;
use omf_sender_core::DeliveryError;
use omf_sender_core::DeliveryOutcome;
use omf_sender_core::Destination;
use omf_sender_core::DestinationFamily;
use omf_sender_core::DestinationSettings;
use omf_sender_core::MessageCatalog;
use omf_sender_core::MessageKind;
use omf_sender_core::MessageSender;
use omf_sender_core::RunEvent;
use omf_sender_core::RunObserver;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds an edge destination with the given name.
pub fn edge_destination(name: &str) -> Destination {
    let settings =
        DestinationSettings::new(name, DestinationFamily::Edge, format!("http://{name}.local"));
    Destination::resolve(settings).unwrap()
}

/// Builds an unselected edge destination.
pub fn unselected_destination(name: &str) -> Destination {
    let mut settings =
        DestinationSettings::new(name, DestinationFamily::Edge, format!("http://{name}.local"));
    settings.selected = false;
    Destination::resolve(settings).unwrap()
}

/// Builds a catalog with two types, two containers, and two data templates.
pub fn sample_catalog() -> MessageCatalog {
    MessageCatalog::new(
        vec![json!({"id": "TankLevel", "type": "object"}), json!({"id": "Pump", "type": "object"})],
        vec![
            json!({"id": "Tank1", "typeid": "TankLevel"}),
            json!({"id": "Pump1", "typeid": "Pump"}),
        ],
        vec![
            json!({"containerid": "Tank1", "values": [{"Level": 0}]}),
            json!({"containerid": "Pump1", "values": [{"Running": "False"}]}),
        ],
    )
    .unwrap()
}

/// Returns the `id` or `containerid` of a message body.
pub fn message_id(body: &Value) -> String {
    body.get("id")
        .or_else(|| body.get("containerid"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// SECTION: Scripted Sender
// ============================================================================

/// One recorded send.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// Destination name.
    pub destination: String,
    /// Message kind.
    pub kind: MessageKind,
    /// Requested action.
    pub action: Action,
    /// Message body.
    pub body: Value,
}

/// Response rule: destination name, message kind, action, and body in; result out.
type Script =
    Box<dyn FnMut(&str, MessageKind, Action, &Value) -> Result<DeliveryOutcome, DeliveryError>>;

/// Sender that records calls and answers from a script.
pub struct ScriptedSender {
    /// Calls in dispatch order.
    pub sent: Vec<SentMessage>,
    /// Response rule.
    script: Script,
}

impl ScriptedSender {
    /// Accepts every message.
    pub fn accepting() -> Self {
        Self::with_script(|_, _, _, _| Ok(DeliveryOutcome::Accepted))
    }

    /// Answers from `script`.
    pub fn with_script<F>(script: F) -> Self
    where
        F: FnMut(&str, MessageKind, Action, &Value) -> Result<DeliveryOutcome, DeliveryError>
            + 'static,
    {
        Self {
            sent: Vec::new(),
            script: Box::new(script),
        }
    }

    /// Returns sends to one destination.
    pub fn sent_to(&self, destination: &str) -> Vec<&SentMessage> {
        self.sent.iter().filter(|message| message.destination == destination).collect()
    }
}

impl MessageSender for ScriptedSender {
    fn send(
        &mut self,
        destination: &Destination,
        kind: MessageKind,
        body: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        self.sent.push(SentMessage {
            destination: destination.name().to_string(),
            kind,
            action,
            body: body.clone(),
        });
        (self.script)(destination.name().as_str(), kind, action, body)
    }
}

// ============================================================================
// SECTION: Stateful Sender
// ============================================================================

/// Entities held by one simulated endpoint.
#[derive(Debug, Default)]
pub struct EndpointState {
    /// Created type ids.
    pub types: BTreeSet<String>,
    /// Created container ids.
    pub containers: BTreeSet<String>,
    /// Data records per container.
    pub data: BTreeMap<String, Vec<Value>>,
}

/// Sender that simulates OMF endpoint semantics per destination.
#[derive(Debug, Default)]
pub struct StatefulSender {
    /// Endpoint state by destination name.
    pub endpoints: BTreeMap<String, EndpointState>,
}

impl StatefulSender {
    /// Builds a rejection for `kind` and `action`.
    fn reject(kind: MessageKind, action: Action, status: u16) -> DeliveryError {
        DeliveryError::DeliveryRejected {
            message_type: kind,
            action,
            status,
            body: String::new(),
        }
    }
}

impl MessageSender for StatefulSender {
    fn send(
        &mut self,
        destination: &Destination,
        kind: MessageKind,
        body: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let state = self.endpoints.entry(destination.name().to_string()).or_default();
        let id = message_id(body);
        match (kind, action) {
            (MessageKind::Type, Action::Create) => Ok(if state.types.insert(id) {
                DeliveryOutcome::Accepted
            } else {
                DeliveryOutcome::Duplicate
            }),
            (MessageKind::Container, Action::Create) => {
                let type_id = body.get("typeid").and_then(Value::as_str).unwrap_or_default();
                if !state.types.contains(type_id) {
                    return Err(Self::reject(kind, action, 400));
                }
                Ok(if state.containers.insert(id) {
                    DeliveryOutcome::Accepted
                } else {
                    DeliveryOutcome::Duplicate
                })
            }
            (MessageKind::Data, Action::Create) => {
                if !state.containers.contains(&id) {
                    return Err(Self::reject(kind, action, 404));
                }
                state.data.entry(id).or_default().push(body.clone());
                Ok(DeliveryOutcome::Accepted)
            }
            (MessageKind::Type, Action::Delete) => {
                if state.types.remove(&id) {
                    Ok(DeliveryOutcome::Accepted)
                } else {
                    Err(Self::reject(kind, action, 404))
                }
            }
            (MessageKind::Container, Action::Delete) => {
                if state.containers.remove(&id) {
                    state.data.remove(&id);
                    Ok(DeliveryOutcome::Accepted)
                } else {
                    Err(Self::reject(kind, action, 404))
                }
            }
            (MessageKind::Data, Action::Delete) => Err(Self::reject(kind, action, 400)),
        }
    }
}

// ============================================================================
// SECTION: Generator and Observer
// ============================================================================

/// Generator that stamps each record with a per-container counter.
#[derive(Debug, Default)]
pub struct CountingGenerator;

impl DataGenerator for CountingGenerator {
    type State = u64;

    fn generate(&self, template: &DataTemplate, previous: &u64) -> (Value, u64) {
        let next = previous + 1;
        let mut record = template.record().clone();
        record["values"] = json!([{ "sequence": next }]);
        (record, next)
    }
}

/// Observer that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    /// Events in emission order.
    pub events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    /// Returns a snapshot of recorded events.
    pub fn snapshot(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RunObserver for &RecordingObserver {
    fn record(&self, event: &RunEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
