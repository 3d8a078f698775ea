// crates/omf-sender-cli/src/sample.rs
// ============================================================================
// Module: Sample Data Generator
// Description: Demo data regeneration for the bundled OMF message files.
// Purpose: Give every data cycle a fresh timestamp and plausible values.
// Dependencies: omf-sender-core, rand, serde_json, time
// ============================================================================

//! ## Overview
//! [`SampleDataGenerator`] rewrites the first value object of each data
//! template according to its container:
//!
//! | Container                  | Fields written                                        |
//! |----------------------------|-------------------------------------------------------|
//! | `Container1`, `Container2` | `timestamp`, `IntegerProperty` in `[0, 100)`           |
//! | `Container3`               | `timestamp`, `NumberProperty1/2`, `StringEnum` toggle |
//! | `Container4`               | `timestamp`, `IntegerEnum` toggle (0/1)               |
//! | anything else              | `timestamp`, only when the template declares one      |
//!
//! Toggles are per container and travel through [`SampleState`], so two
//! containers never share a toggle and two runs never share state. The
//! `StringEnum` toggle runs in the opposite phase: its first value is
//! `"False"`, while the first `IntegerEnum` is `1`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use omf_sender_core::DataGenerator;
use omf_sender_core::DataTemplate;
use rand::Rng;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Index field refreshed on every cycle.
const TIMESTAMP_FIELD: &str = "timestamp";

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Per-container toggle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleState {
    /// Last emitted toggle value.
    pub toggled: bool,
}

/// Demo generator for the bundled `Container1`..`Container4` streams.
#[derive(Debug, Clone, Copy)]
pub struct SampleDataGenerator {
    /// Wall clock used for timestamps.
    clock: fn() -> OffsetDateTime,
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleDataGenerator {
    /// Creates a generator stamping records with the current UTC time.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clock: OffsetDateTime::now_utc,
        }
    }

    /// Creates a generator with a fixed clock.
    #[must_use]
    pub const fn with_clock(clock: fn() -> OffsetDateTime) -> Self {
        Self {
            clock,
        }
    }

    /// Returns the current timestamp in RFC 3339 form.
    fn timestamp(&self) -> String {
        format_timestamp((self.clock)())
    }
}

impl DataGenerator for SampleDataGenerator {
    type State = SampleState;

    fn generate(&self, template: &DataTemplate, previous: &SampleState) -> (Value, SampleState) {
        let mut record = template.record().clone();
        let mut next = *previous;
        if let Some(point) = first_point(&mut record) {
            let mut rng = rand::thread_rng();
            let timestamp = self.timestamp();
            match template.container_id().as_str() {
                "Container1" | "Container2" => {
                    point.insert(TIMESTAMP_FIELD.to_string(), json!(timestamp));
                    point.insert("IntegerProperty".to_string(), json!(rng.gen_range(0_u32..100)));
                }
                "Container3" => {
                    next.toggled = !previous.toggled;
                    let label = if next.toggled { "False" } else { "True" };
                    point.insert(TIMESTAMP_FIELD.to_string(), json!(timestamp));
                    point.insert("NumberProperty1".to_string(), json!(rng.gen_range(0.0..100.0)));
                    point.insert("NumberProperty2".to_string(), json!(rng.gen_range(0.0..100.0)));
                    point.insert("StringEnum".to_string(), json!(label));
                }
                "Container4" => {
                    next.toggled = !previous.toggled;
                    point.insert(TIMESTAMP_FIELD.to_string(), json!(timestamp));
                    point.insert("IntegerEnum".to_string(), json!(u8::from(next.toggled)));
                }
                _ => {
                    if point.contains_key(TIMESTAMP_FIELD) {
                        point.insert(TIMESTAMP_FIELD.to_string(), json!(timestamp));
                    }
                }
            }
        }
        (record, next)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the first value object of a data record.
fn first_point(record: &mut Value) -> Option<&mut Map<String, Value>> {
    record
        .get_mut("values")
        .and_then(Value::as_array_mut)
        .and_then(|values| values.first_mut())
        .and_then(Value::as_object_mut)
}

/// Formats `instant` as RFC 3339 in UTC (`...Z`).
#[must_use]
pub fn format_timestamp(instant: OffsetDateTime) -> String {
    instant.to_offset(time::UtcOffset::UTC).format(&Rfc3339).unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
