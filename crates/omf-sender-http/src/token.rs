// crates/omf-sender-http/src/token.rs
// ============================================================================
// Module: Bearer Token Cache
// Description: OAuth2 client-credentials acquisition via discovery.
// Purpose: Fetch, validate, cache, and refresh one bearer token per destination.
// Dependencies: omf-sender-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`TokenCache::get_token`] returns an empty string for families without
//! OAuth and never touches the network for them. For the cloud family it
//! returns the cached token while `expires_at - now > refresh_skew`, and
//! otherwise performs a two-step exchange:
//!
//! 1. `GET {resource_root}/identity/.well-known/openid-configuration`
//! 2. `POST {token_endpoint}` with `client_id`, `client_secret`, and
//!    `grant_type=client_credentials` as a form body.
//!
//! Security posture: the discovery document is untrusted. The token endpoint
//! must use https (http only when explicitly allowed), carry no embedded
//! credentials, and share scheme, host, port, and path prefix with the
//! resource root. Validation happens before any credential leaves the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use omf_sender_core::AuthScheme;
use omf_sender_core::ClientCredentials;
use omf_sender_core::DeliveryError;
use omf_sender_core::Destination;
use omf_sender_core::Secret;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;
use url::form_urlencoded;

use crate::body::read_limited;
use crate::body::read_text_limited;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Discovery document path appended to the resource root.
pub const DISCOVERY_PATH: &str = "/identity/.well-known/openid-configuration";
/// Tokens closer than this to expiry are refreshed before use.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(300);
/// Upper bound on discovery and token response bodies.
const MAX_TOKEN_RESPONSE_BYTES: u64 = 64 * 1024;
/// Longest lifetime honored for a single token, whatever `expires_in` says.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Token refresh and endpoint validation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Safety margin subtracted from token expiry.
    pub refresh_skew: Duration,
    /// Accept cleartext `http://` token endpoints (local testing only).
    pub allow_http_token_endpoint: bool,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            refresh_skew: DEFAULT_REFRESH_SKEW,
            allow_http_token_endpoint: false,
        }
    }
}

// ============================================================================
// SECTION: Token Cache
// ============================================================================

/// Cached bearer token.
struct Token {
    /// Opaque access token.
    access_token: Secret,
    /// Absolute expiry instant.
    expires_at: Instant,
}

/// Per-destination bearer-token cache.
///
/// # Invariants
/// - The cached token is replaced wholesale on refresh, never partially updated.
/// - A failed refresh leaves no token cached.
pub struct TokenCache {
    /// Refresh and validation policy.
    policy: TokenPolicy,
    /// Current token, if any.
    token: Option<Token>,
    /// Completed discovery-and-exchange round trips.
    exchanges: u64,
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("policy", &self.policy)
            .field("cached", &self.token.is_some())
            .field("exchanges", &self.exchanges)
            .finish()
    }
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new(policy: TokenPolicy) -> Self {
        Self {
            policy,
            token: None,
            exchanges: 0,
        }
    }

    /// Returns the number of completed token exchanges.
    #[must_use]
    pub const fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// Drops the cached token so the next call refreshes.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    /// Returns a bearer token for `destination`, refreshing it when stale.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::DiscoveryFailed`],
    /// [`DeliveryError::UntrustedTokenEndpoint`],
    /// [`DeliveryError::TokenExchangeFailed`], or
    /// [`DeliveryError::TransportFailure`] when the exchange fails.
    pub fn get_token(
        &mut self,
        client: &Client,
        destination: &Destination,
    ) -> Result<String, DeliveryError> {
        let AuthScheme::Bearer(credentials) = destination.auth() else {
            return Ok(String::new());
        };
        if let Some(token) = &self.token
            && token.expires_at.saturating_duration_since(Instant::now()) > self.policy.refresh_skew
        {
            return Ok(token.access_token.expose().to_string());
        }
        self.token = None;
        let token_url = self.discover(client, destination.resource_root())?;
        let token = exchange(client, &token_url, credentials)?;
        let access_token = token.access_token.expose().to_string();
        self.token = Some(token);
        self.exchanges += 1;
        Ok(access_token)
    }

    /// Fetches the discovery document and returns the validated token endpoint.
    fn discover(&self, client: &Client, resource_root: &str) -> Result<Url, DeliveryError> {
        let discovery_url = format!("{resource_root}{DISCOVERY_PATH}");
        let response = client
            .get(&discovery_url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| DeliveryError::TransportFailure(describe_transport_error(&err)))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(DeliveryError::DiscoveryFailed {
                status,
                body: read_text_limited(response, MAX_TOKEN_RESPONSE_BYTES),
            });
        }
        let body = read_limited(response, MAX_TOKEN_RESPONSE_BYTES);
        let document: Value =
            serde_json::from_slice(&body).map_err(|_| DeliveryError::DiscoveryFailed {
                status,
                body: "discovery document is not valid json".to_string(),
            })?;
        let endpoint = document.get("token_endpoint").and_then(Value::as_str).ok_or_else(|| {
            DeliveryError::DiscoveryFailed {
                status,
                body: "discovery document has no token_endpoint".to_string(),
            }
        })?;
        validate_token_endpoint(resource_root, endpoint, self.policy.allow_http_token_endpoint)
    }
}

// ============================================================================
// SECTION: Exchange
// ============================================================================

/// Posts client credentials to a validated token endpoint.
fn exchange(
    client: &Client,
    token_url: &Url,
    credentials: &ClientCredentials,
) -> Result<Token, DeliveryError> {
    let form = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &credentials.client_id)
        .append_pair("client_secret", credentials.client_secret.expose())
        .append_pair("grant_type", "client_credentials")
        .finish();
    let requested_at = Instant::now();
    let response = client
        .post(token_url.as_str())
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(ACCEPT, "application/json")
        .body(form)
        .send()
        .map_err(|err| DeliveryError::TransportFailure(describe_transport_error(&err)))?;
    if !response.status().is_success() {
        return Err(DeliveryError::TokenExchangeFailed(format!(
            "token endpoint returned status {}",
            response.status().as_u16()
        )));
    }
    let body = read_limited(response, MAX_TOKEN_RESPONSE_BYTES);
    let payload: Value = serde_json::from_slice(&body).map_err(|_| {
        DeliveryError::TokenExchangeFailed("token response is not valid json".to_string())
    })?;
    if payload.is_null() {
        return Err(DeliveryError::TokenExchangeFailed("token response is null".to_string()));
    }
    let access_token = payload
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            DeliveryError::TokenExchangeFailed("token response has no access_token".to_string())
        })?;
    let expires_in = payload.get("expires_in").and_then(parse_expires_in).ok_or_else(|| {
        DeliveryError::TokenExchangeFailed("token response has no usable expires_in".to_string())
    })?;
    let expires_at =
        requested_at.checked_add(expires_in.min(MAX_TOKEN_LIFETIME)).ok_or_else(|| {
            DeliveryError::TokenExchangeFailed("token expiry is out of range".to_string())
        })?;
    Ok(Token {
        access_token: Secret::new(access_token),
        expires_at,
    })
}

/// Reads `expires_in` from a number or numeric string, truncated to whole seconds.
fn parse_expires_in(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(number) => match number.as_u64() {
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => number.as_f64().and_then(whole_seconds),
        },
        Value::String(text) => {
            let text = text.trim();
            match text.parse::<u64>() {
                Ok(seconds) => Some(Duration::from_secs(seconds)),
                Err(_) => text.parse::<f64>().ok().and_then(whole_seconds),
            }
        }
        _ => None,
    }
}

/// Converts finite, non-negative fractional seconds to whole seconds.
fn whole_seconds(seconds: f64) -> Option<Duration> {
    let duration = Duration::try_from_secs_f64(seconds).ok()?;
    Some(Duration::from_secs(duration.as_secs()))
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a discovered token endpoint against the destination's resource root.
///
/// # Errors
///
/// Returns [`DeliveryError::UntrustedTokenEndpoint`] when the endpoint is not
/// absolute, uses an insecure or mismatched scheme, embeds credentials, or
/// leaves the resource root's origin or path prefix.
pub fn validate_token_endpoint(
    resource_root: &str,
    endpoint: &str,
    allow_http: bool,
) -> Result<Url, DeliveryError> {
    let untrusted = |reason: &str| DeliveryError::UntrustedTokenEndpoint(reason.to_string());
    let url = Url::parse(endpoint).map_err(|_| untrusted("token endpoint is not an absolute url"))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        _ => return Err(untrusted("token endpoint must use https")),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(untrusted("token endpoint must not embed credentials"));
    }
    let root = Url::parse(resource_root).map_err(|_| untrusted("resource root is not a url"))?;
    let same_origin = url.scheme() == root.scheme()
        && url.host_str().map(str::to_ascii_lowercase)
            == root.host_str().map(str::to_ascii_lowercase)
        && url.port_or_known_default() == root.port_or_known_default();
    if !same_origin {
        return Err(untrusted("token endpoint is outside the resource root origin"));
    }
    let root_path = root.path().trim_end_matches('/');
    let path = url.path();
    let within_root = root_path.is_empty()
        || path == root_path
        || path.strip_prefix(root_path).is_some_and(|rest| rest.starts_with('/'));
    if !within_root {
        return Err(untrusted("token endpoint is outside the resource root path"));
    }
    Ok(url)
}

/// Describes a transport error without echoing request contents.
pub(crate) fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else if err.is_redirect() {
        "redirect not allowed".to_string()
    } else {
        "request failed".to_string()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
