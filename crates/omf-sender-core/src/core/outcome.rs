// crates/omf-sender-core/src/core/outcome.rs
// ============================================================================
// Module: Delivery Outcomes
// Description: Per-send results and the delivery failure taxonomy.
// Purpose: Let callers separate accepted, duplicate, retryable, and fatal sends.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A send ends in [`DeliveryOutcome::Accepted`] (2xx),
//! [`DeliveryOutcome::Duplicate`] (409, entity already exists), or a
//! [`DeliveryError`]. A 409 is never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::message::Action;
use crate::core::message::MessageKind;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Successful delivery result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Endpoint accepted the message (2xx).
    Accepted,
    /// Entity already exists at this id and version (409).
    Duplicate,
}

impl DeliveryOutcome {
    /// Classifies an HTTP status that is not an error.
    ///
    /// Returns `None` for statuses that must surface as
    /// [`DeliveryError::DeliveryRejected`].
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            409 => Some(Self::Duplicate),
            200..=299 => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// Retry classification of a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The same send may succeed later.
    Retryable,
    /// Repeating the send will not help without a configuration change.
    Fatal,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Delivery failure taxonomy.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never contain credentials or bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Discovery document request returned a non-2xx status or an unusable body.
    #[error("token discovery failed: {status}: {body}")]
    DiscoveryFailed {
        /// HTTP status of the discovery response.
        status: u16,
        /// Response body or reason.
        body: String,
    },
    /// Discovered token endpoint failed scheme or origin validation.
    #[error("untrusted token endpoint: {0}")]
    UntrustedTokenEndpoint(String),
    /// Token response was rejected, null, or missing required fields.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),
    /// Connection, TLS, or timeout failure.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// Endpoint answered with a status other than 2xx or 409.
    #[error("omf {message_type} {action} was rejected: {status}: {body}")]
    DeliveryRejected {
        /// Message kind that was sent.
        message_type: MessageKind,
        /// Action that was requested.
        action: Action,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Body could not be serialized, compressed, or framed into headers.
    #[error("message encoding failed: {0}")]
    Encoding(String),
    /// Sender has no transport state for the destination.
    #[error("unknown destination: {0}")]
    UnknownDestination(String),
}

impl DeliveryError {
    /// Returns the retry classification.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::TransportFailure(_) => FailureClass::Retryable,
            Self::DeliveryRejected {
                status,
                ..
            } => match *status {
                408 | 429 | 500..=599 => FailureClass::Retryable,
                _ => FailureClass::Fatal,
            },
            Self::DiscoveryFailed {
                status,
                ..
            } => match *status {
                500..=599 => FailureClass::Retryable,
                _ => FailureClass::Fatal,
            },
            Self::UntrustedTokenEndpoint(_)
            | Self::TokenExchangeFailed(_)
            | Self::Encoding(_)
            | Self::UnknownDestination(_) => FailureClass::Fatal,
        }
    }

    /// Returns a stable label for the failure kind.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::DiscoveryFailed {
                ..
            } => "discovery_failed",
            Self::UntrustedTokenEndpoint(_) => "untrusted_token_endpoint",
            Self::TokenExchangeFailed(_) => "token_exchange_failed",
            Self::TransportFailure(_) => "transport_failure",
            Self::DeliveryRejected {
                ..
            } => "delivery_rejected",
            Self::Encoding(_) => "encoding",
            Self::UnknownDestination(_) => "unknown_destination",
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_duplicate_not_error() {
        assert_eq!(DeliveryOutcome::from_status(409), Some(DeliveryOutcome::Duplicate));
        assert_eq!(DeliveryOutcome::from_status(200), Some(DeliveryOutcome::Accepted));
        assert_eq!(DeliveryOutcome::from_status(204), Some(DeliveryOutcome::Accepted));
        assert_eq!(DeliveryOutcome::from_status(300), None);
        assert_eq!(DeliveryOutcome::from_status(400), None);
    }

    #[test]
    fn server_errors_and_transport_failures_are_retryable() {
        let rejected = |status| DeliveryError::DeliveryRejected {
            message_type: MessageKind::Data,
            action: Action::Create,
            status,
            body: String::new(),
        };
        assert_eq!(rejected(503).class(), FailureClass::Retryable);
        assert_eq!(rejected(429).class(), FailureClass::Retryable);
        assert_eq!(rejected(400).class(), FailureClass::Fatal);
        assert_eq!(
            DeliveryError::TransportFailure("timeout".to_string()).class(),
            FailureClass::Retryable
        );
        assert_eq!(
            DeliveryError::UntrustedTokenEndpoint("host".to_string()).class(),
            FailureClass::Fatal
        );
    }
}
