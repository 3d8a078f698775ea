// crates/omf-sender-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Fixtures
// Description: Temporary run directories with a run file and message files.
// ============================================================================

//! ## Overview
//! [`RunDir`] writes `omf-sender.toml` plus the three default message files
//! into a temporary directory so tests exercise real path resolution.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use omf_sender_config::ConfigError;
use omf_sender_config::OmfSenderConfig;
use tempfile::TempDir;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Minimal edge destination entry.
pub const EDGE_ENTRY: &str = r#"
[[destinations]]
name = "edge"
kind = "edge"
resource = "http://localhost:5590"
"#;

/// Type messages referenced by [`CONTAINERS_JSON`].
pub const TYPES_JSON: &str = r#"[
  {"id": "TankLevel", "type": "object", "classification": "dynamic",
   "properties": {"Time": {"type": "string", "format": "date-time", "isindex": true},
                  "Level": {"type": "number"}}}
]"#;

/// Container messages referenced by [`DATA_JSON`].
pub const CONTAINERS_JSON: &str = r#"[{"id": "Tank1", "typeid": "TankLevel"}]"#;

/// Data templates.
pub const DATA_JSON: &str = r#"[{"containerid": "Tank1", "values": [{"Time": "", "Level": 0}]}]"#;

/// Temporary run directory.
pub struct RunDir {
    /// Owned temporary directory.
    dir: TempDir,
}

impl RunDir {
    /// Creates a directory containing the default message files.
    pub fn new() -> Result<Self, String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let run_dir = Self {
            dir,
        };
        run_dir.write("OMF-Types.json", TYPES_JSON)?;
        run_dir.write("OMF-Containers.json", CONTAINERS_JSON)?;
        run_dir.write("OMF-Data.json", DATA_JSON)?;
        Ok(run_dir)
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `content` to `name` inside the directory.
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, String> {
        let path = self.dir.path().join(name);
        fs::write(&path, content).map_err(|err| err.to_string())?;
        Ok(path)
    }

    /// Writes `toml` as the run file and loads it.
    pub fn load(&self, toml: &str) -> Result<OmfSenderConfig, ConfigError> {
        let path = self.write("omf-sender.toml", toml).map_err(ConfigError::Io)?;
        OmfSenderConfig::load(Some(&path))
    }
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}
