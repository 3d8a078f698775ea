// crates/omf-sender-core/src/runtime/mod.rs
// ============================================================================
// Module: OMF Sender Runtime
// Description: Delivery orchestration and run events.
// Purpose: Drive destinations through creation, data cycles, and teardown.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime owns the delivery state machine and the structured events it
//! emits. Transport and data generation are injected through the interfaces
//! module so the runtime stays deterministic under test.

pub mod events;
pub mod orchestrator;

pub use events::JsonLinesObserver;
pub use events::RunEvent;
pub use orchestrator::CancellationFlag;
pub use orchestrator::CycleLimit;
pub use orchestrator::DeliveryOrchestrator;
pub use orchestrator::DestinationPhase;
pub use orchestrator::DestinationReport;
pub use orchestrator::MAX_RETAINED_FAILURES;
pub use orchestrator::RecordedFailure;
pub use orchestrator::RunError;
pub use orchestrator::RunOptions;
pub use orchestrator::RunReport;
