//! Configuration module for pickr
//!
//! Settings for the coordinator (cache locations, permission gate, platform
//! capabilities) and for the local host (volume roots, content mounts).
//! Configuration is stored as TOML in the user's config directory.

use crate::permission::READ_EXTERNAL_STORAGE;
use config::{Config, ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PickrConfig {
    /// Root of materialized copies (`{cache_root}/picked/...`)
    pub cache_root: PathBuf,

    /// Database holding the in-flight selection record
    pub state_path: PathBuf,

    /// Permission gated before the picker; empty disables the gate
    #[serde(default = "default_permission")]
    pub permission: Option<String>,

    /// Platform supports structured document handles
    pub document_handles: bool,

    /// Platform is at or above the scoped-storage threshold
    pub scoped_storage: bool,

    /// Root of the primary storage volume
    pub primary_volume: PathBuf,

    /// Secondary volumes by UUID
    pub volumes: BTreeMap<String, PathBuf>,

    /// Directory backing `content://<authority>/...` handles
    pub mounts: BTreeMap<String, PathBuf>,

    /// Authorities whose `_data` column exposes real paths
    pub data_column: Vec<String>,

    /// Write logs to a daily file in this directory instead of stderr
    pub log_dir: Option<PathBuf>,

    /// Suppress informational output by default
    pub quiet: bool,
}

fn default_permission() -> Option<String> {
    Some(READ_EXTERNAL_STORAGE.to_string())
}

fn fallback_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(std::env::temp_dir)
}

impl Default for PickrConfig {
    fn default() -> Self {
        Self {
            cache_root: fallback_dir(dirs::cache_dir()).join("pickr"),
            state_path: fallback_dir(dirs::data_dir()).join("pickr").join("state"),
            permission: default_permission(),
            document_handles: true,
            scoped_storage: true,
            primary_volume: fallback_dir(dirs::home_dir()),
            volumes: BTreeMap::new(),
            mounts: BTreeMap::new(),
            data_column: Vec::new(),
            log_dir: None,
            quiet: false,
        }
    }
}

impl PickrConfig {
    /// Get the path to the config file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the system config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Message("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("pickr").join("config.toml"))
    }

    /// Load configuration from the default location, creating it if missing
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, or created.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file cannot be read, parsed, or created.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            let default_config = Self::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config directory cannot be created, the configuration
    /// cannot be serialized to TOML, or the file cannot be written.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Message(format!("Failed to create config directory: {e}")))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| ConfigError::Message(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// The gated permission, `None` when disabled
    #[must_use]
    pub fn effective_permission(&self) -> Option<String> {
        self.permission
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
    }

    /// Render the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Message(format!("Failed to serialize config: {e}")))
    }
}
