// crates/omf-sender-cli/src/lib.rs
// ============================================================================
// Module: OMF Sender CLI Library
// Description: Shared helpers for the omf-sender command-line interface.
// Purpose: Provide the demo data generator and run summaries to the binary and tests.
// Dependencies: omf-sender-core, rand, serde_json, time
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) wires configuration, the HTTP
//! dispatcher, and the orchestrator together. This library holds the pieces
//! that are worth testing without spawning the binary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod sample;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use sample::SampleDataGenerator;
pub use sample::SampleState;
pub use summary::report_summary;
