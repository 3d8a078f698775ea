// crates/omf-sender-core/src/core/destination.rs
// ============================================================================
// Module: Destination Descriptors
// Description: Resolved configuration records for OMF ingress destinations.
// Purpose: Normalize three destination families behind one immutable descriptor.
// Dependencies: serde, url
// ============================================================================

//! ## Overview
//! A [`Destination`] is built once from [`DestinationSettings`] and never
//! mutated afterwards. Endpoints are derived during resolution:
//!
//! | Family  | `base_endpoint`                                                   |
//! |---------|-------------------------------------------------------------------|
//! | `cloud` | `{resource}/api/{version}/tenants/{tenant}/namespaces/{namespace}` |
//! | `edge`  | `{resource}/api/{version}/tenants/default/namespaces/default`       |
//! | `pi`    | `{resource}`                                                      |
//!
//! `omf_endpoint` is always `base_endpoint + "/omf"`.
//! Invariants:
//! - Derived endpoints are a pure function of the settings. Changing a setting
//!   means resolving a new [`Destination`].
//! - Credentials never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::core::identifiers::DestinationName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// API version used when a destination does not specify one.
pub const DEFAULT_API_VERSION: &str = "v1";
/// Request timeout used when a destination does not specify one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving destination settings.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    /// Resource root is not a usable base URL.
    #[error("invalid resource root: {0}")]
    InvalidResource(String),
    /// A field required by the destination family is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// A routing segment contains characters that would alter the URL path.
    #[error("invalid routing segment for {field}: {value}")]
    InvalidSegment {
        /// Field carrying the segment.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
    /// Request timeout is zero.
    #[error("request timeout must be greater than zero")]
    InvalidTimeout,
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Secret string that is redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// OAuth2 client-credentials pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: Secret,
}

/// HTTP basic authentication pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: Secret,
}

// ============================================================================
// SECTION: Destination Families
// ============================================================================

/// Destination family label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// OAuth bearer-token cloud ingress, tenant and namespace routed.
    #[serde(alias = "OCS", alias = "ocs")]
    Cloud,
    /// Local edge ingress without an auth header, flat namespace.
    #[serde(alias = "EDS", alias = "eds")]
    Edge,
    /// Basic-auth server ingress.
    #[serde(alias = "PI")]
    Pi,
}

impl DestinationKind {
    /// Returns a stable label for the family.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Edge => "edge",
            Self::Pi => "pi",
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Family-specific routing and credentials.
///
/// Adding a family means adding a variant here and mapping it in
/// [`DestinationFamily::auth`] and the routing helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationFamily {
    /// OAuth-bearer cloud ingress.
    Cloud {
        /// Tenant routing segment.
        tenant_id: String,
        /// Namespace routing segment.
        namespace_id: String,
        /// Client-credentials used for token exchange.
        credentials: ClientCredentials,
    },
    /// Local edge ingress.
    Edge,
    /// Basic-auth server ingress.
    Pi {
        /// Optional data archive (server) name.
        data_server_name: Option<String>,
        /// Basic-auth account.
        credentials: BasicCredentials,
    },
}

impl DestinationFamily {
    /// Returns the family label.
    #[must_use]
    pub const fn kind(&self) -> DestinationKind {
        match self {
            Self::Cloud {
                ..
            } => DestinationKind::Cloud,
            Self::Edge => DestinationKind::Edge,
            Self::Pi {
                ..
            } => DestinationKind::Pi,
        }
    }

    /// Returns the authentication scheme this family uses.
    #[must_use]
    pub const fn auth(&self) -> AuthScheme<'_> {
        match self {
            Self::Cloud {
                credentials,
                ..
            } => AuthScheme::Bearer(credentials),
            Self::Edge => AuthScheme::Anonymous,
            Self::Pi {
                credentials,
                ..
            } => AuthScheme::Basic(credentials),
        }
    }

    /// Validates family-specific fields.
    fn validate(&self) -> Result<(), DestinationError> {
        match self {
            Self::Cloud {
                tenant_id,
                namespace_id,
                credentials,
            } => {
                require_segment("tenant_id", tenant_id)?;
                require_segment("namespace_id", namespace_id)?;
                require("client_id", &credentials.client_id)?;
                require("client_secret", credentials.client_secret.expose())
            }
            Self::Edge => Ok(()),
            Self::Pi {
                credentials,
                ..
            } => {
                require("username", &credentials.username)?;
                require("password", credentials.password.expose())
            }
        }
    }

    /// Returns the routing path appended to the resource root.
    fn routing_path(&self, api_version: &str) -> String {
        match self {
            Self::Cloud {
                tenant_id,
                namespace_id,
                ..
            } => format!("/api/{api_version}/tenants/{tenant_id}/namespaces/{namespace_id}"),
            Self::Edge => format!("/api/{api_version}/tenants/default/namespaces/default"),
            Self::Pi {
                ..
            } => String::new(),
        }
    }
}

/// Authentication contract of a destination family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme<'a> {
    /// Bearer token obtained through OAuth2 client credentials.
    Bearer(&'a ClientCredentials),
    /// No authentication.
    Anonymous,
    /// HTTP basic authentication at the transport layer.
    Basic(&'a BasicCredentials),
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Static destination fields prior to resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSettings {
    /// Unique destination name.
    pub name: DestinationName,
    /// Family routing and credentials.
    pub family: DestinationFamily,
    /// Base URL of the ingress service.
    pub resource_root: String,
    /// API version segment (cloud and edge families).
    pub api_version: String,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// Gzip-compress message bodies.
    pub use_compression: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Whether this destination participates in a run.
    pub selected: bool,
}

impl DestinationSettings {
    /// Creates settings with default flags for the given family and root.
    #[must_use]
    pub fn new(
        name: impl Into<DestinationName>,
        family: DestinationFamily,
        resource_root: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            resource_root: resource_root.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            verify_tls: true,
            use_compression: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            selected: true,
        }
    }
}

// ============================================================================
// SECTION: Resolved Destination
// ============================================================================

/// Immutable, resolved destination descriptor.
///
/// # Invariants
/// - `resource_root` has no trailing slash.
/// - `omf_endpoint == base_endpoint + "/omf"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Static settings as supplied.
    settings: DestinationSettings,
    /// Normalized resource root.
    resource_root: String,
    /// Root plus version and routing path.
    base_endpoint: String,
    /// OMF ingress endpoint.
    omf_endpoint: String,
}

impl Destination {
    /// Validates settings and derives the endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError`] when the resource root is not an absolute
    /// http(s) URL, a family field is missing, or the timeout is zero.
    pub fn resolve(settings: DestinationSettings) -> Result<Self, DestinationError> {
        let resource_root = normalize_resource_root(&settings.resource_root)?;
        settings.family.validate()?;
        if settings.family.kind() != DestinationKind::Pi {
            require_segment("api_version", &settings.api_version)?;
        }
        if settings.request_timeout.is_zero() {
            return Err(DestinationError::InvalidTimeout);
        }
        let base_endpoint =
            format!("{resource_root}{}", settings.family.routing_path(&settings.api_version));
        let omf_endpoint = format!("{base_endpoint}/omf");
        Ok(Self {
            settings,
            resource_root,
            base_endpoint,
            omf_endpoint,
        })
    }

    /// Returns the destination name.
    #[must_use]
    pub const fn name(&self) -> &DestinationName {
        &self.settings.name
    }

    /// Returns the family label.
    #[must_use]
    pub const fn kind(&self) -> DestinationKind {
        self.settings.family.kind()
    }

    /// Returns the family routing and credentials.
    #[must_use]
    pub const fn family(&self) -> &DestinationFamily {
        &self.settings.family
    }

    /// Returns the authentication scheme.
    #[must_use]
    pub const fn auth(&self) -> AuthScheme<'_> {
        self.settings.family.auth()
    }

    /// Returns the static settings.
    #[must_use]
    pub const fn settings(&self) -> &DestinationSettings {
        &self.settings
    }

    /// Returns the normalized resource root.
    #[must_use]
    pub fn resource_root(&self) -> &str {
        &self.resource_root
    }

    /// Returns the base endpoint.
    #[must_use]
    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    /// Returns the OMF ingress endpoint.
    #[must_use]
    pub fn omf_endpoint(&self) -> &str {
        &self.omf_endpoint
    }

    /// Returns whether TLS certificates are verified.
    #[must_use]
    pub const fn verify_tls(&self) -> bool {
        self.settings.verify_tls
    }

    /// Returns whether message bodies are gzip-compressed.
    #[must_use]
    pub const fn use_compression(&self) -> bool {
        self.settings.use_compression
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.settings.request_timeout
    }

    /// Returns whether the destination participates in runs.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.settings.selected
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and normalizes the resource root.
fn normalize_resource_root(raw: &str) -> Result<String, DestinationError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url =
        Url::parse(trimmed).map_err(|err| DestinationError::InvalidResource(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(DestinationError::InvalidResource(format!(
                "unsupported scheme: {scheme}"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(DestinationError::InvalidResource("host required".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(DestinationError::InvalidResource(
            "embedded credentials are not allowed".to_string(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(DestinationError::InvalidResource(
            "query and fragment are not allowed".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Requires a non-empty field value.
fn require(field: &'static str, value: &str) -> Result<(), DestinationError> {
    if value.trim().is_empty() {
        return Err(DestinationError::MissingField(field));
    }
    Ok(())
}

/// Requires a non-empty value that is safe to embed as a single path segment.
fn require_segment(field: &'static str, value: &str) -> Result<(), DestinationError> {
    require(field, value)?;
    if value.contains(['/', '?', '#', '\\']) || value == "." || value == ".." {
        return Err(DestinationError::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
