//! Configuration for a rewind repository (`.rewind/config.toml`).

use crate::error::{Result, RewindError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default soft cap on entries per history scope.
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 60;

/// Default pointer key holding the history payload id.
pub const DEFAULT_POINTER_KEY: &str = "rewind.historyId";

/// Comprehensive configuration for a rewind repository.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Discard history configuration.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Storage-related configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Garbage collection configuration.
    #[serde(default)]
    pub gc: GcSettings,

    /// Undo configuration.
    #[serde(default)]
    pub undo: UndoConfig,
}

impl Config {
    /// Load configuration from `config.toml` under the given directory.
    ///
    /// A missing file yields defaults.
    pub fn load(rewind_dir: &Path) -> Result<Self> {
        let path = rewind_dir.join("config.toml");
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| RewindError::ConfigError(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RewindError::ConfigError(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `config.toml` under the given directory.
    pub fn save(&self, rewind_dir: &Path) -> Result<()> {
        let path = rewind_dir.join("config.toml");
        let content = toml::to_string_pretty(self)
            .map_err(|e| RewindError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| RewindError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Rejects values the history cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.history.max_length < 2 {
            return Err(RewindError::ConfigError(format!(
                "history.max_length must be at least 2, got {}",
                self.history.max_length
            )));
        }
        if !(1..=22).contains(&self.storage.compression_level) {
            return Err(RewindError::ConfigError(format!(
                "storage.compression_level must be within 1..=22, got {}",
                self.storage.compression_level
            )));
        }
        if self.history.pointer_key.trim().is_empty() {
            return Err(RewindError::ConfigError(
                "history.pointer_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Discard history configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Soft cap per scope (default: 60). Reaching it trims the scope to its
    /// most recent half.
    pub max_length: usize,

    /// Pointer key recording the serialized history (default: `rewind.historyId`).
    pub pointer_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_HISTORY_LENGTH,
            pointer_key: DEFAULT_POINTER_KEY.to_string(),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Compression level for zstd (1-22, default: 3).
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression_level: crate::object_store::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Garbage collection defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GcSettings {
    /// Grace period in days before deleting unreferenced objects (default: 7).
    pub grace_period_days: u32,
}

impl Default for GcSettings {
    fn default() -> Self {
        Self {
            grace_period_days: 7,
        }
    }
}

/// Undo configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UndoConfig {
    /// Directory receiving per-undo scratch folders. Defaults to the system
    /// temp directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl UndoConfig {
    /// Returns the configured scratch root or the system temp directory.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
