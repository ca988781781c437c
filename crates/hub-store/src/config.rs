//! Store configuration, loadable from TOML or JSON.
//!
//! ```toml
//! # hub-layout.toml
//! storage_key = "hub-pane-tree"
//! id_prefix = "hub"
//! autosave_debounce_ms = 500
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storage key the layout is persisted under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "hub-pane-tree";

/// Prefix for minted pane ids unless configured otherwise.
pub const DEFAULT_ID_PREFIX: &str = "hub";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key under which the tree is read and written.
    pub storage_key: String,
    /// Prefix for every id the store mints.
    pub id_prefix: String,
    /// Quiet period before an automatic save. `None` disables autosave.
    pub autosave_debounce_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            id_prefix: DEFAULT_ID_PREFIX.to_owned(),
            autosave_debounce_ms: None,
        }
    }
}

impl StoreConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    #[must_use]
    pub fn autosave_debounce(&self) -> Option<Duration> {
        self.autosave_debounce_ms.map(Duration::from_millis)
    }

    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.storage_key.is_empty() {
            errors.push("storage_key must not be empty".into());
        } else if self.storage_key.contains(['/', '\\']) {
            errors.push(format!(
                "storage_key must not contain path separators, got {:?}",
                self.storage_key
            ));
        }

        if self.id_prefix.is_empty() {
            errors.push("id_prefix must not be empty".into());
        } else if self.id_prefix.chars().any(char::is_whitespace) {
            errors.push(format!(
                "id_prefix must not contain whitespace, got {:?}",
                self.id_prefix
            ));
        }

        errors
    }
}

/// Errors that can occur when loading or applying a store configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
