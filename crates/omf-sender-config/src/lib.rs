// crates/omf-sender-config/src/lib.rs
// ============================================================================
// Module: OMF Sender Config Library
// Description: Run configuration model and OMF message file loading.
// Purpose: Single source of truth for omf-sender.toml semantics.
// Dependencies: omf-sender-core, omf-sender-http, serde, toml
// ============================================================================

//! ## Overview
//! `omf-sender-config` loads the TOML run file, applies defaults, validates
//! every destination fail-closed, and reads the three OMF message files
//! (types, containers, data) that the run file points at. Resolved values are
//! handed to the core orchestrator and the HTTP dispatcher unchanged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod messages;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use messages::MAX_MESSAGE_FILE_SIZE;
pub use messages::MessagesConfig;
