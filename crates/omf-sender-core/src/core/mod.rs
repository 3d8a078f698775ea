// crates/omf-sender-core/src/core/mod.rs
// ============================================================================
// Module: OMF Sender Core Types
// Description: Destination descriptors, OMF message catalogs, and delivery outcomes.
// Purpose: Provide stable types shared by transports, configuration, and the CLI.
// Dependencies: serde, serde_json, url
// ============================================================================

//! ## Overview
//! Core types describe where OMF messages go ([`Destination`]), what is sent
//! ([`MessageCatalog`]), and how each send ended ([`DeliveryOutcome`] or
//! [`DeliveryError`]).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod destination;
pub mod identifiers;
pub mod message;
pub mod outcome;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use destination::AuthScheme;
pub use destination::BasicCredentials;
pub use destination::ClientCredentials;
pub use destination::DEFAULT_API_VERSION;
pub use destination::DEFAULT_REQUEST_TIMEOUT;
pub use destination::Destination;
pub use destination::DestinationError;
pub use destination::DestinationFamily;
pub use destination::DestinationKind;
pub use destination::DestinationSettings;
pub use destination::Secret;
pub use identifiers::ContainerId;
pub use identifiers::DestinationName;
pub use message::Action;
pub use message::CatalogError;
pub use message::DataTemplate;
pub use message::MessageCatalog;
pub use message::MessageKind;
pub use outcome::DeliveryError;
pub use outcome::DeliveryOutcome;
pub use outcome::FailureClass;
