// crates/omf-sender-config/src/config.rs
// ============================================================================
// Module: OMF Sender Configuration
// Description: Configuration loading and validation for OMF sender runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: omf-sender-core, omf-sender-http, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is resolved from an explicit path, then `OMF_SENDER_CONFIG`, then
//! `omf-sender.toml` in the working directory. Every destination is resolved
//! into a [`Destination`] during validation, so a config that loads is a
//! config whose endpoints can be derived.
//!
//! Secrets (`client_secret`, `password`) are redacted when the configuration
//! is serialized for display.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use omf_sender_core::BasicCredentials;
use omf_sender_core::ClientCredentials;
use omf_sender_core::CycleLimit;
use omf_sender_core::DEFAULT_API_VERSION;
use omf_sender_core::Destination;
use omf_sender_core::DestinationFamily;
use omf_sender_core::DestinationKind;
use omf_sender_core::DestinationSettings;
use omf_sender_core::MessageCatalog;
use omf_sender_core::RunOptions;
use omf_sender_core::Secret;
use omf_sender_http::DEFAULT_OMF_VERSION;
use omf_sender_http::DispatcherConfig;
use omf_sender_http::TokenPolicy;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

use crate::messages::MessagesConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "omf-sender.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "OMF_SENDER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured destinations.
pub(crate) const MAX_DESTINATIONS: usize = 64;
/// Maximum length of a destination name.
pub(crate) const MAX_DESTINATION_NAME_LENGTH: usize = 128;
/// Minimum per-request timeout in seconds.
pub(crate) const MIN_REQUEST_TIMEOUT_SECONDS: u64 = 1;
/// Maximum per-request timeout in seconds.
pub(crate) const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 300;
/// Default per-request timeout in seconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
/// Default pause between data cycles in milliseconds.
pub(crate) const DEFAULT_CYCLE_INTERVAL_MS: u64 = 1_000;
/// Maximum pause between data cycles in milliseconds (one day).
pub(crate) const MAX_CYCLE_INTERVAL_MS: u64 = 86_400_000;
/// Default token refresh skew in seconds.
pub(crate) const DEFAULT_TOKEN_REFRESH_SKEW_SECONDS: u64 = 300;
/// Maximum token refresh skew in seconds.
pub(crate) const MAX_TOKEN_REFRESH_SKEW_SECONDS: u64 = 3_600;
/// Maximum length of the OMF version header value.
pub(crate) const MAX_OMF_VERSION_LENGTH: usize = 16;
/// Maximum length of a custom user agent.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;
/// Placeholder written in place of secrets when serializing.
const REDACTED: &str = "***";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// OMF sender run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OmfSenderConfig {
    /// Session pacing and mode.
    #[serde(default)]
    pub run: RunConfig,
    /// Transport and token policy.
    #[serde(default)]
    pub transport: TransportConfig,
    /// OMF message file locations.
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Configured destinations in declaration order.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
    /// Directory that relative message paths resolve against (not serialized).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl OmfSenderConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let base_dir = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(content, base_dir)
    }

    /// Parses and validates configuration text.
    ///
    /// Relative message paths resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.base_dir = base_dir;
        config.run.normalize();
        config.transport.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()?;
        self.transport.validate()?;
        self.messages.validate()?;
        if self.destinations.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one destination must be configured".to_string(),
            ));
        }
        if self.destinations.len() > MAX_DESTINATIONS {
            return Err(ConfigError::Invalid(format!(
                "destinations exceeds max entries ({MAX_DESTINATIONS})"
            )));
        }
        let mut names = BTreeSet::new();
        for (index, destination) in self.destinations.iter().enumerate() {
            let name = destination.display_name(index);
            if !names.insert(name.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate destination name: {name}")));
            }
            destination.resolve(index)?;
        }
        Ok(())
    }

    /// Resolves every configured destination in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a destination cannot be resolved.
    pub fn resolve_destinations(&self) -> Result<Vec<Destination>, ConfigError> {
        self.destinations
            .iter()
            .enumerate()
            .map(|(index, destination)| destination.resolve(index))
            .collect()
    }

    /// Reads the OMF message files and checks their cross references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file is unreadable or malformed.
    pub fn load_catalog(&self) -> Result<MessageCatalog, ConfigError> {
        self.messages.load_catalog(&self.base_dir)
    }

    /// Returns orchestrator options derived from the `[run]` section.
    #[must_use]
    pub const fn run_options(&self) -> RunOptions {
        self.run.options()
    }

    /// Returns dispatcher settings derived from `[run]` and `[transport]`.
    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let defaults = DispatcherConfig::default();
        DispatcherConfig {
            omf_version: self.run.omf_version.clone(),
            token_policy: self.transport.token_policy(),
            user_agent: self.transport.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

// ============================================================================
// SECTION: Run Section
// ============================================================================

/// Session pacing and failure mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Number of data cycles; omitted runs until stopped.
    #[serde(default)]
    pub cycles: Option<u64>,
    /// Pause between data cycles in milliseconds.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Abort a destination on its first data failure and fail the run.
    #[serde(default)]
    pub test_mode: bool,
    /// Delete containers and types when the session ends.
    #[serde(default = "default_true")]
    pub cleanup: bool,
    /// `omfversion` header value.
    #[serde(default = "default_omf_version")]
    pub omf_version: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cycles: None,
            cycle_interval_ms: DEFAULT_CYCLE_INTERVAL_MS,
            test_mode: false,
            cleanup: true,
            omf_version: default_omf_version(),
        }
    }
}

impl RunConfig {
    /// Strips surrounding whitespace from the header-bound version.
    fn normalize(&mut self) {
        let trimmed = self.omf_version.trim();
        if trimmed.len() != self.omf_version.len() {
            self.omf_version = trimmed.to_string();
        }
    }

    /// Validates pacing and protocol fields.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cycles == Some(0) {
            return Err(ConfigError::Invalid("run.cycles must be greater than zero".to_string()));
        }
        if self.cycle_interval_ms > MAX_CYCLE_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "run.cycle_interval_ms must be <= {MAX_CYCLE_INTERVAL_MS}"
            )));
        }
        let version = self.omf_version.trim();
        if version.is_empty() {
            return Err(ConfigError::Invalid("run.omf_version must be non-empty".to_string()));
        }
        if version.len() > MAX_OMF_VERSION_LENGTH || !version.chars().all(is_version_char) {
            return Err(ConfigError::Invalid(
                "run.omf_version must be a short dotted version".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts the section into orchestrator options.
    const fn options(&self) -> RunOptions {
        let cycles = match self.cycles {
            Some(count) => CycleLimit::Fixed(count),
            None => CycleLimit::UntilStopped,
        };
        RunOptions {
            cycles,
            cycle_interval: Duration::from_millis(self.cycle_interval_ms),
            test_mode: self.test_mode,
            cleanup: self.cleanup,
        }
    }
}

// ============================================================================
// SECTION: Transport Section
// ============================================================================

/// Token and client policy shared by every destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Accept cleartext `http://` token endpoints (local testing only).
    #[serde(default)]
    pub allow_http_token_endpoint: bool,
    /// Seconds before expiry at which a cached token is refreshed.
    #[serde(default = "default_token_refresh_skew_seconds")]
    pub token_refresh_skew_seconds: u64,
    /// Optional user agent override.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            allow_http_token_endpoint: false,
            token_refresh_skew_seconds: DEFAULT_TOKEN_REFRESH_SKEW_SECONDS,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    /// Strips surrounding whitespace from the user agent override.
    fn normalize(&mut self) {
        if let Some(agent) = &mut self.user_agent {
            let trimmed = agent.trim();
            if trimmed.len() != agent.len() {
                *agent = trimmed.to_string();
            }
        }
    }

    /// Validates token policy bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_refresh_skew_seconds > MAX_TOKEN_REFRESH_SKEW_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "transport.token_refresh_skew_seconds must be <= {MAX_TOKEN_REFRESH_SKEW_SECONDS}"
            )));
        }
        if let Some(agent) = &self.user_agent {
            let trimmed = agent.trim();
            if trimmed.is_empty() || trimmed.len() > MAX_USER_AGENT_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "transport.user_agent must be 1..={MAX_USER_AGENT_LENGTH} characters"
                )));
            }
            if trimmed.chars().any(char::is_control) {
                return Err(ConfigError::Invalid(
                    "transport.user_agent must not contain control characters".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the token policy for the dispatcher.
    const fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            refresh_skew: Duration::from_secs(self.token_refresh_skew_seconds),
            allow_http_token_endpoint: self.allow_http_token_endpoint,
        }
    }
}

// ============================================================================
// SECTION: Destination Entries
// ============================================================================

/// One `[[destinations]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    /// Unique name; defaults to `destination-<index>`.
    #[serde(default)]
    pub name: Option<String>,
    /// Destination family (`cloud`, `edge`, `pi`).
    pub kind: DestinationKind,
    /// Whether the destination participates in runs.
    #[serde(default = "default_true")]
    pub selected: bool,
    /// Base URL of the ingress service.
    pub resource: String,
    /// API version segment (cloud and edge).
    #[serde(default)]
    pub api_version: Option<String>,
    /// Tenant routing segment (cloud).
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Namespace routing segment (cloud).
    #[serde(default)]
    pub namespace_id: Option<String>,
    /// OAuth client identifier (cloud).
    #[serde(default)]
    pub client_id: Option<String>,
    /// OAuth client secret (cloud).
    #[serde(default, serialize_with = "redact_secret")]
    pub client_secret: Option<String>,
    /// Basic-auth account (pi).
    #[serde(default)]
    pub username: Option<String>,
    /// Basic-auth password (pi).
    #[serde(default, serialize_with = "redact_secret")]
    pub password: Option<String>,
    /// Data archive name (pi).
    #[serde(default)]
    pub data_server_name: Option<String>,
    /// Verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Gzip-compress message bodies.
    #[serde(default)]
    pub use_compression: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl DestinationConfig {
    /// Returns the configured name or the positional default.
    #[must_use]
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| format!("destination-{index}"), str::to_string)
    }

    /// Validates the entry and resolves it into a [`Destination`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn resolve(&self, index: usize) -> Result<Destination, ConfigError> {
        let name = self.display_name(index);
        if name.len() > MAX_DESTINATION_NAME_LENGTH || name.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(format!(
                "destinations[{index}].name must be 1..={MAX_DESTINATION_NAME_LENGTH} printable \
                 characters"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_SECONDS..=MAX_REQUEST_TIMEOUT_SECONDS)
            .contains(&self.request_timeout_seconds)
        {
            return Err(ConfigError::Invalid(format!(
                "destinations[{name}].request_timeout_seconds must be between \
                 {MIN_REQUEST_TIMEOUT_SECONDS} and {MAX_REQUEST_TIMEOUT_SECONDS}"
            )));
        }
        let family = self.family(&name)?;
        let mut settings = DestinationSettings::new(name.as_str(), family, self.resource.trim());
        settings.api_version =
            self.api_version.clone().unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        settings.verify_tls = self.verify_tls;
        settings.use_compression = self.use_compression;
        settings.request_timeout = Duration::from_secs(self.request_timeout_seconds);
        settings.selected = self.selected;
        Destination::resolve(settings)
            .map_err(|err| ConfigError::Invalid(format!("destinations[{name}]: {err}")))
    }

    /// Builds family routing and credentials, requiring the family's fields.
    fn family(&self, name: &str) -> Result<DestinationFamily, ConfigError> {
        match self.kind {
            DestinationKind::Cloud => Ok(DestinationFamily::Cloud {
                tenant_id: required(name, "tenant_id", self.tenant_id.as_deref())?,
                namespace_id: required(name, "namespace_id", self.namespace_id.as_deref())?,
                credentials: ClientCredentials {
                    client_id: required(name, "client_id", self.client_id.as_deref())?,
                    client_secret: Secret::new(required(
                        name,
                        "client_secret",
                        self.client_secret.as_deref(),
                    )?),
                },
            }),
            DestinationKind::Edge => Ok(DestinationFamily::Edge),
            DestinationKind::Pi => Ok(DestinationFamily::Pi {
                data_server_name: self
                    .data_server_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string),
                credentials: BasicCredentials {
                    username: required(name, "username", self.username.as_deref())?,
                    password: Secret::new(required(name, "password", self.password.as_deref())?),
                },
            }),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
pub(crate) fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Returns a trimmed required value or an error naming the field.
fn required(destination: &str, field: &str, value: Option<&str>) -> Result<String, ConfigError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::Invalid(format!("destinations[{destination}].{field} must be set"))),
    }
}

/// Returns true for characters allowed in the OMF version value.
const fn is_version_char(ch: char) -> bool {
    ch.is_ascii_digit() || ch == '.'
}

/// Serializes a present secret as a fixed placeholder.
fn redact_secret<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str(REDACTED),
        None => serializer.serialize_none(),
    }
}

/// Default: `true`.
const fn default_true() -> bool {
    true
}

/// Default pause between data cycles.
const fn default_cycle_interval_ms() -> u64 {
    DEFAULT_CYCLE_INTERVAL_MS
}

/// Default per-request timeout.
const fn default_request_timeout_seconds() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

/// Default token refresh skew.
const fn default_token_refresh_skew_seconds() -> u64 {
    DEFAULT_TOKEN_REFRESH_SKEW_SECONDS
}

/// Default OMF version.
fn default_omf_version() -> String {
    DEFAULT_OMF_VERSION.to_string()
}
