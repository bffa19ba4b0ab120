//! Pipeline configuration

use crate::error::CoreError;
use crate::store::SortKey;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration, persisted as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    pub scan: ScanConfig,
    pub loader: LoaderConfig,
    pub sort_key: SortKey,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            loader: LoaderConfig::default(),
            sort_key: SortKey::SizeDescending,
        }
    }
}

/// Catalog scan tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Identifiers fetched per enumeration page
    pub page_size: usize,
    /// Entries whose icons load at maximum priority before any scroll input
    pub first_batch: usize,
    /// Scanner yield between identifiers, to cap CPU pressure
    pub yield_interval_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            first_batch: 4,
            yield_interval_ms: 1,
        }
    }
}

/// Icon loading and prefetch tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Icon decodes allowed per consumer tick
    pub icon_loads_per_tick: usize,
    /// Minimum interval between accepted prefetch passes
    pub debounce_ms: u64,
    /// Rows visible on screen at once
    pub visible_rows: usize,
    /// Extra rows speculatively loaded on each side of the viewport
    pub preload_rows: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            icon_loads_per_tick: 2,
            debounce_ms: 100,
            visible_rows: 4,
            preload_rows: 2,
        }
    }
}

impl CuratorConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "TitleCurator", "TitleCurator")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &std::path::Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save(&self, path: &std::path::Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
