//! Configuration loading and defaults for activity-probe.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for activity-probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Deadline for every external helper or scripting call, in milliseconds (default: 3000).
    pub command_timeout_ms: u64,

    /// Deadline for a filesystem icon-theme scan, in milliseconds (default: 3000).
    pub icon_search_timeout_ms: u64,

    /// Maximum number of application icons resolved concurrently (default: 8).
    pub icon_concurrency: usize,

    /// Native icons larger than this edge length are downscaled (default: 128).
    pub max_icon_size: u32,

    /// RGBA accent color of placeholder icons.
    pub placeholder_color: [u8; 4],

    /// Extra directories searched for icon files before the system locations.
    pub extra_icon_dirs: Vec<PathBuf>,

    /// Attach icons to window and application queries (default: true).
    /// `get_app_icon` always resolves an icon.
    pub resolve_icons: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_ms: 3000,
            icon_search_timeout_ms: 3000,
            icon_concurrency: 8,
            max_icon_size: 128,
            placeholder_color: [50, 150, 250, 255],
            extra_icon_dirs: Vec::new(),
            resolve_icons: true,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default path, or return defaults if not found.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        if let Some(default_path) = Self::default_path()
            && default_path.exists()
        {
            return Self::load(&default_path);
        }

        Ok(Self::default())
    }

    /// `<config_dir>/activity-probe/config.toml`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("activity-probe").join("config.toml"))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn icon_search_timeout(&self) -> Duration {
        Duration::from_millis(self.icon_search_timeout_ms)
    }
}
