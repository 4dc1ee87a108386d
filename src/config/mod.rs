//! Configuration management for preprint.
//!
//! Configuration is read from `~/.config/preprint/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The loaded values are handed to the components explicitly; nothing reads
//! them from global state.

pub mod refresh;

pub use refresh::RefreshConfig;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::CategoryKey;
use crate::query::DEFAULT_BASE_URL;

pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 100;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub view: ViewConfig,
    pub refresh: RefreshConfig,
}

/// How the catalog endpoint is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Requested results per page; clamped to 1..=100 by [`CatalogConfig::page_size`].
    pub page_size: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Archive retried when a latest/browse fetch comes back empty or fails
    /// on the network. `None` disables the retry.
    pub fallback_category: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 50,
            timeout_secs: 15,
            user_agent: concat!("preprint/", env!("CARGO_PKG_VERSION")).to_string(),
            fallback_category: Some("cs".to_string()),
        }
    }
}

impl CatalogConfig {
    pub fn page_size(&self) -> usize {
        clamp_page_size(self.page_size)
    }
}

pub fn clamp_page_size(requested: usize) -> usize {
    requested.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// View shown at startup and after a search is cleared.
    pub default_category: CategoryKey,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_category: CategoryKey::Latest,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/preprint/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("preprint").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# preprint configuration
#
# Categories: latest, cs, math, physics, q-bio, q-fin, stat, eess, econ

[catalog]
base_url = "https://export.arxiv.org/api/query"

# Results per request (1-100)
page_size = 50

# Request timeout in seconds
timeout_secs = 15

# Archive to retry when a browse request fails or comes back empty.
# Remove the line to disable the retry.
fallback_category = "cs"

[view]
default_category = "latest"

[refresh]
enabled = false

# Interval like "30m", "1h", "6h", "1d" or plain seconds
interval = "1h"

# Refresh once immediately when the refresher starts
on_start = true

categories = ["latest"]
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
