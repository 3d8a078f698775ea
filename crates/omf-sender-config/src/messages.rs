// crates/omf-sender-config/src/messages.rs
// ============================================================================
// Module: OMF Message Files
// Description: Loading of the type, container, and data message files.
// Purpose: Turn three JSON arrays on disk into a checked message catalog.
// Dependencies: omf-sender-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each message file is a JSON array of objects capped at
//! [`MAX_MESSAGE_FILE_SIZE`]. Relative paths resolve against the directory of
//! the run file. After shape checks the catalog's cross references are
//! verified, so a dangling `typeid` or `containerid` fails the load instead
//! of surfacing later as an endpoint rejection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use omf_sender_core::MessageCatalog;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::config::ConfigError;
use crate::config::validate_path;
use crate::config::validate_path_string;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a single message file in bytes.
pub const MAX_MESSAGE_FILE_SIZE: usize = 16 * 1024 * 1024;
/// Default type message file.
const DEFAULT_TYPES_FILE: &str = "OMF-Types.json";
/// Default container message file.
const DEFAULT_CONTAINERS_FILE: &str = "OMF-Containers.json";
/// Default data message file.
const DEFAULT_DATA_FILE: &str = "OMF-Data.json";

// ============================================================================
// SECTION: Message Section
// ============================================================================

/// `[messages]` section: locations of the three message files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagesConfig {
    /// Type definitions file.
    #[serde(default = "default_types_file")]
    pub types: String,
    /// Container definitions file.
    #[serde(default = "default_containers_file")]
    pub containers: String,
    /// Data templates file.
    #[serde(default = "default_data_file")]
    pub data: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            types: default_types_file(),
            containers: default_containers_file(),
            data: default_data_file(),
        }
    }
}

impl MessagesConfig {
    /// Validates the configured paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a path is empty or too long.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("messages.types", &self.types)?;
        validate_path_string("messages.containers", &self.containers)?;
        validate_path_string("messages.data", &self.data)
    }

    /// Resolves `value` against `base_dir` unless it is absolute.
    #[must_use]
    pub fn resolve(base_dir: &Path, value: &str) -> PathBuf {
        let path = Path::new(value.trim());
        if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
    }

    /// Reads all three files and builds a reference-checked catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file is unreadable, malformed, or
    /// references an undeclared id.
    pub fn load_catalog(&self, base_dir: &Path) -> Result<MessageCatalog, ConfigError> {
        let types = read_message_file("messages.types", &Self::resolve(base_dir, &self.types))?;
        let containers = read_message_file(
            "messages.containers",
            &Self::resolve(base_dir, &self.containers),
        )?;
        let data = read_message_file("messages.data", &Self::resolve(base_dir, &self.data))?;
        let catalog = MessageCatalog::new(types, containers, data)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        catalog.validate_references().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(catalog)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads one message file as a JSON array.
fn read_message_file(field: &str, path: &Path) -> Result<Vec<Value>, ConfigError> {
    validate_path(path)?;
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{field} ({}): {err}", path.display())))?;
    if bytes.len() > MAX_MESSAGE_FILE_SIZE {
        return Err(ConfigError::Invalid(format!("{field} file exceeds size limit")));
    }
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|err| ConfigError::Parse(format!("{field}: {err}")))?;
    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(ConfigError::Invalid(format!("{field} must be a json array"))),
    }
}

/// Default type message file.
fn default_types_file() -> String {
    DEFAULT_TYPES_FILE.to_string()
}

/// Default container message file.
fn default_containers_file() -> String {
    DEFAULT_CONTAINERS_FILE.to_string()
}

/// Default data message file.
fn default_data_file() -> String {
    DEFAULT_DATA_FILE.to_string()
}
