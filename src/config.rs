//! Run configuration loaded from an optional JSON file.
//!
//! Every field has a default, so an absent file and an empty object `{}`
//! both yield a usable configuration.

use crate::error::{ImportError, Result};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for one import run.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Number of save workers requested. The run never spawns more workers
    /// than there are records to save.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreSettings,
}

/// Settings for the SQLite record store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl ImportConfig {
    /// Loads and validates configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| ImportError::Config {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let config: ImportConfig =
            serde_json::from_str(&raw).map_err(|err| ImportError::Config {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        config.validate(path)?;
        debug!(
            "Loaded configuration from {}: {} workers, store at {}",
            path.display(),
            config.workers,
            config.store.path.display()
        );
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.workers == 0 {
            return Err(ImportError::Config {
                path: path.display().to_string(),
                message: "workers must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            workers: default_workers(),
            store: StoreSettings::default(),
        }
    }
}

impl StoreSettings {
    /// Busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

const fn default_workers() -> usize {
    4
}

fn default_store_path() -> PathBuf {
    PathBuf::from("geodata.db")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}
