// crates/omf-sender-core/src/lib.rs
// ============================================================================
// Module: OMF Sender Core Library
// Description: Public API surface for the OMF sender core.
// Purpose: Expose destination descriptors, OMF messages, interfaces, and the orchestrator.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! OMF sender core models ingress destinations and OMF message catalogs, and
//! sequences type, container, and data delivery across every selected
//! destination. Transport is pluggable through [`MessageSender`]; the core
//! never performs network I/O itself.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::DataGenerator;
pub use interfaces::MessageSender;
pub use interfaces::NoopObserver;
pub use interfaces::RunObserver;
pub use runtime::CancellationFlag;
pub use runtime::CycleLimit;
pub use runtime::DeliveryOrchestrator;
pub use runtime::DestinationPhase;
pub use runtime::DestinationReport;
pub use runtime::JsonLinesObserver;
pub use runtime::MAX_RETAINED_FAILURES;
pub use runtime::RecordedFailure;
pub use runtime::RunError;
pub use runtime::RunEvent;
pub use runtime::RunOptions;
pub use runtime::RunReport;
