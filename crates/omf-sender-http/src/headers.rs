// crates/omf-sender-http/src/headers.rs
// ============================================================================
// Module: OMF Header Assembly
// Description: Protocol header composition with an allow-list filter.
// Purpose: Produce the OMF header set for one destination, message, and action.
// Dependencies: omf-sender-core
// ============================================================================

//! ## Overview
//! Every OMF request carries `messagetype`, `action`, `messageformat` and
//! `omfversion`. `compression` is added only for gzipped bodies. Family
//! additions:
//!
//! | Family  | Extra header                          |
//! |---------|---------------------------------------|
//! | `cloud` | `authorization: Bearer <token>`       |
//! | `edge`  | `content-type: application/json`      |
//! | `pi`    | `x-requested-with: XMLHttpRequest`    |
//!
//! The `x-requested-with` marker belongs to the PI Web API relay, which
//! rejects cross-site style requests without it even when basic auth is
//! present. The anonymous edge endpoint never receives it.
//!
//! The composed set is filtered through [`ALLOWED_HEADERS`]; any other key is
//! dropped silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use omf_sender_core::Action;
use omf_sender_core::AuthScheme;
use omf_sender_core::Destination;
use omf_sender_core::MessageKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header names that may leave the process.
pub const ALLOWED_HEADERS: [&str; 8] = [
    "messagetype",
    "action",
    "messageformat",
    "omfversion",
    "compression",
    "authorization",
    "x-requested-with",
    "content-type",
];

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Inputs for one header set.
#[derive(Debug, Clone, Copy)]
pub struct HeaderParams<'a> {
    /// Target destination.
    pub destination: &'a Destination,
    /// Bearer token; empty for families without OAuth.
    pub token: &'a str,
    /// OMF protocol version header value.
    pub omf_version: &'a str,
    /// Whether the body is gzip-compressed.
    pub compressed: bool,
    /// Message kind.
    pub kind: MessageKind,
    /// Requested action.
    pub action: Action,
}

/// Composes the OMF header set for `params`.
///
/// The result is not yet filtered; pass it through [`filter_allowed`].
#[must_use]
pub fn build_headers(params: &HeaderParams<'_>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("messagetype".to_string(), params.kind.as_str().to_string());
    headers.insert("action".to_string(), params.action.as_str().to_string());
    headers.insert("messageformat".to_string(), "JSON".to_string());
    headers.insert("omfversion".to_string(), params.omf_version.to_string());
    if params.compressed {
        headers.insert("compression".to_string(), "gzip".to_string());
    }
    match params.destination.auth() {
        AuthScheme::Bearer(_) => {
            headers.insert("authorization".to_string(), format!("Bearer {}", params.token));
        }
        AuthScheme::Anonymous => {
            headers.insert("content-type".to_string(), "application/json".to_string());
        }
        AuthScheme::Basic(_) => {
            headers.insert("x-requested-with".to_string(), "XMLHttpRequest".to_string());
        }
    }
    headers
}

/// Drops every header whose name is not on [`ALLOWED_HEADERS`].
///
/// Names are compared case-insensitively and returned lowercased.
#[must_use]
pub fn filter_allowed(headers: BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .filter_map(|(name, value)| {
            let name = name.to_ascii_lowercase();
            ALLOWED_HEADERS.contains(&name.as_str()).then_some((name, value))
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
