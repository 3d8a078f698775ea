// crates/omf-sender-http/src/dispatcher.rs
// ============================================================================
// Module: OMF HTTP Dispatcher
// Description: Family-aware OMF sends over blocking HTTP clients.
// Purpose: Encode, authenticate, post, and classify one OMF message at a time.
// Dependencies: omf-sender-core, reqwest, thiserror
// ============================================================================

//! ## Overview
//! [`HttpDispatcher`] owns one HTTP client and one [`TokenCache`] per
//! destination. Each send:
//!
//! 1. obtains a bearer token (cloud family only),
//! 2. frames the body as `[message]`, gzipped when the destination asks,
//! 3. assembles and allow-list filters the OMF headers,
//! 4. posts to the destination's OMF endpoint (basic auth for `pi`),
//! 5. maps 2xx to accepted, 409 to duplicate, anything else to
//!    [`DeliveryError::DeliveryRejected`].
//!
//! Timeouts and connection errors surface as
//! [`DeliveryError::TransportFailure`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use omf_sender_core::Action;
use omf_sender_core::AuthScheme;
use omf_sender_core::DeliveryError;
use omf_sender_core::DeliveryOutcome;
use omf_sender_core::Destination;
use omf_sender_core::DestinationName;
use omf_sender_core::MessageKind;
use omf_sender_core::MessageSender;
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde_json::Value;
use thiserror::Error;

use crate::body::encode_body;
use crate::body::read_text_limited;
use crate::headers::HeaderParams;
use crate::headers::build_headers;
use crate::headers::filter_allowed;
use crate::token::TokenCache;
use crate::token::TokenPolicy;
use crate::token::describe_transport_error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// OMF protocol version sent when none is configured.
pub const DEFAULT_OMF_VERSION: &str = "1.1";
/// Upper bound on rejected-response bodies kept for diagnostics.
const MAX_ERROR_BODY_BYTES: u64 = 64 * 1024;

/// Dispatcher configuration shared by all destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// `omfversion` header value.
    pub omf_version: String,
    /// Token refresh and endpoint validation policy.
    pub token_policy: TokenPolicy,
    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            omf_version: DEFAULT_OMF_VERSION.to_string(),
            token_policy: TokenPolicy::default(),
            user_agent: format!("omf-sender/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Errors raised while building the dispatcher.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// HTTP client could not be created for a destination.
    #[error("http client build failed for {destination}: {reason}")]
    ClientBuild {
        /// Destination name.
        destination: String,
        /// Failure reason.
        reason: String,
    },
    /// Two destinations share a name.
    #[error("duplicate destination name: {0}")]
    DuplicateDestination(String),
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Transport state for one destination.
#[derive(Debug)]
struct Channel {
    /// Client honoring the destination's timeout and TLS flag.
    client: Client,
    /// Bearer-token cache owned by this destination.
    tokens: TokenCache,
}

/// OMF sender over blocking HTTP.
#[derive(Debug)]
pub struct HttpDispatcher {
    /// Shared configuration.
    config: DispatcherConfig,
    /// Per-destination transport state.
    channels: BTreeMap<DestinationName, Channel>,
}

impl HttpDispatcher {
    /// Builds one client and token cache per destination.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError`] when a client cannot be built or two
    /// destinations share a name.
    pub fn new(
        config: DispatcherConfig,
        destinations: &[Destination],
    ) -> Result<Self, DispatcherError> {
        let mut channels = BTreeMap::new();
        for destination in destinations {
            let client = build_client(&config, destination)?;
            let channel = Channel {
                client,
                tokens: TokenCache::new(config.token_policy),
            };
            if channels.insert(destination.name().clone(), channel).is_some() {
                return Err(DispatcherError::DuplicateDestination(destination.name().to_string()));
            }
        }
        Ok(Self {
            config,
            channels,
        })
    }

    /// Returns the dispatcher configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Returns a bearer token for `destination` (empty for non-OAuth families).
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the destination is unknown or the token
    /// exchange fails.
    pub fn token(&mut self, destination: &Destination) -> Result<String, DeliveryError> {
        let channel = self.channel(destination)?;
        channel.tokens.get_token(&channel.client, destination)
    }

    /// Returns the number of token exchanges performed for `destination`.
    #[must_use]
    pub fn token_exchanges(&self, destination: &str) -> Option<u64> {
        self.channels
            .get(&DestinationName::new(destination))
            .map(|channel| channel.tokens.exchanges())
    }

    /// Sends one OMF message and classifies the response.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] for token, encoding, transport, and protocol failures.
    pub fn dispatch(
        &mut self,
        destination: &Destination,
        kind: MessageKind,
        message: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let omf_version = self.config.omf_version.clone();
        let channel = self.channel(destination)?;
        let token = channel.tokens.get_token(&channel.client, destination)?;
        let compressed = destination.use_compression();
        let payload = encode_body(message, compressed)?;
        let headers = filter_allowed(build_headers(&HeaderParams {
            destination,
            token: &token,
            omf_version: &omf_version,
            compressed,
            kind,
            action,
        }));

        let mut request = channel
            .client
            .post(destination.omf_endpoint())
            .headers(to_header_map(&headers)?)
            .body(payload);
        if let AuthScheme::Basic(credentials) = destination.auth() {
            let password = Some(credentials.password.expose());
            request = request.basic_auth(&credentials.username, password);
        }
        let response = request
            .send()
            .map_err(|err| DeliveryError::TransportFailure(describe_transport_error(&err)))?;
        let status = response.status().as_u16();
        if let Some(outcome) = DeliveryOutcome::from_status(status) {
            return Ok(outcome);
        }
        Err(DeliveryError::DeliveryRejected {
            message_type: kind,
            action,
            status,
            body: read_text_limited(response, MAX_ERROR_BODY_BYTES),
        })
    }

    /// Looks up the transport state for `destination`.
    fn channel(&mut self, destination: &Destination) -> Result<&mut Channel, DeliveryError> {
        self.channels
            .get_mut(destination.name())
            .ok_or_else(|| DeliveryError::UnknownDestination(destination.name().to_string()))
    }
}

impl MessageSender for HttpDispatcher {
    fn send(
        &mut self,
        destination: &Destination,
        kind: MessageKind,
        body: &Value,
        action: Action,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        self.dispatch(destination, kind, body, action)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a client with the destination's timeout and TLS policy.
fn build_client(
    config: &DispatcherConfig,
    destination: &Destination,
) -> Result<Client, DispatcherError> {
    Client::builder()
        .timeout(destination.request_timeout())
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none())
        .danger_accept_invalid_certs(!destination.verify_tls())
        .build()
        .map_err(|err| DispatcherError::ClientBuild {
            destination: destination.name().to_string(),
            reason: err.to_string(),
        })
}

/// Converts filtered headers into a typed header map.
fn to_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, DeliveryError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| DeliveryError::Encoding(format!("invalid header name: {name}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| DeliveryError::Encoding(format!("invalid value for header {name}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
