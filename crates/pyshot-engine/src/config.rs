//! Configuration for a Py-SHOT installation.
//!
//! Read from `pyshot.json` in the working directory. Every field has a
//! default, so the file is optional and may list only what it changes.
//! Relative paths in the file are resolved against the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PyshotError, Result};
use crate::progress::DEFAULT_STORAGE_KEY;

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "pyshot.json";

/// Default directory for saved progress.
fn default_state_dir() -> String {
    ".pyshot".to_string()
}

/// Default storage key for the progress record.
fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path to a curriculum JSON file. The built-in curriculum is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<String>,

    /// Directory where progress is saved.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Key (file stem) of the progress record inside `state_dir`.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            curriculum: None,
            state_dir: default_state_dir(),
            storage_key: default_storage_key(),
        }
    }
}

impl Config {
    /// Loads `pyshot.json` from the current working directory, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            PyshotError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads `pyshot.json` from `dir`, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::ConfigParseError` if the file cannot be read or is
    /// not valid JSON, and `PyshotError::ConfigValidationError` if a value is
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(PyshotError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| PyshotError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::ConfigValidationError` for an empty `stateDir`,
    /// an empty or path-like `storageKey`, or an empty `curriculum` path.
    pub fn validate(&self) -> Result<()> {
        if self.state_dir.trim().is_empty() {
            return Err(PyshotError::config_validation(
                "stateDir must not be empty",
                "Set stateDir to a directory path in your pyshot.json (default: .pyshot)",
            ));
        }

        if self.storage_key.trim().is_empty() {
            return Err(PyshotError::config_validation(
                "storageKey must not be empty",
                "Remove storageKey from your pyshot.json to use the default",
            ));
        }

        if self.storage_key.contains(['/', '\\']) {
            return Err(PyshotError::config_validation(
                format!("storageKey '{}' must not contain path separators", self.storage_key),
                "Use stateDir to choose the directory and a plain name for storageKey",
            ));
        }

        if self
            .curriculum
            .as_deref()
            .is_some_and(|path| path.trim().is_empty())
        {
            return Err(PyshotError::config_validation(
                "curriculum path must not be empty",
                "Remove curriculum from your pyshot.json to use the built-in lessons",
            ));
        }

        Ok(())
    }

    /// `state_dir` resolved against `base` when relative.
    #[must_use]
    pub fn state_dir_in(&self, base: &Path) -> PathBuf {
        base.join(&self.state_dir)
    }

    /// `curriculum` resolved against `base` when relative.
    #[must_use]
    pub fn curriculum_in(&self, base: &Path) -> Option<PathBuf> {
        self.curriculum.as_deref().map(|path| base.join(path))
    }
}
