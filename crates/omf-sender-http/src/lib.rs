// crates/omf-sender-http/src/lib.rs
// ============================================================================
// Module: OMF Sender HTTP Library
// Description: Blocking HTTP transport for OMF ingress destinations.
// Purpose: Acquire tokens, assemble headers, and dispatch OMF messages.
// Dependencies: omf-sender-core, reqwest, flate2, url
// ============================================================================

//! ## Overview
//! [`HttpDispatcher`] implements [`omf_sender_core::MessageSender`] over one
//! blocking HTTP client per destination. Bearer tokens come from a
//! per-destination [`TokenCache`]; headers are composed by
//! [`build_headers`] and filtered through [`ALLOWED_HEADERS`].
//! Invariants:
//! - Redirects are never followed.
//! - A 409 response is a duplicate, never an error.
//! - Credentials and tokens never appear in error messages.
//!
//! Security posture: discovery responses are untrusted; the token endpoint
//! must stay within the destination's resource root before credentials are
//! submitted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod body;
pub mod dispatcher;
pub mod headers;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use body::encode_body;
pub use dispatcher::DEFAULT_OMF_VERSION;
pub use dispatcher::DispatcherConfig;
pub use dispatcher::DispatcherError;
pub use dispatcher::HttpDispatcher;
pub use headers::ALLOWED_HEADERS;
pub use headers::HeaderParams;
pub use headers::build_headers;
pub use headers::filter_allowed;
pub use token::DEFAULT_REFRESH_SKEW;
pub use token::DISCOVERY_PATH;
pub use token::MAX_TOKEN_LIFETIME;
pub use token::TokenCache;
pub use token::TokenPolicy;
pub use token::validate_token_endpoint;

#[cfg(test)]
mod tests;
