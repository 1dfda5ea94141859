//! Configuration file parser for ~/.config/braid/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! All fields use `#[serde(default)]` so any subset of keys can be specified.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Config files should be tiny; anything larger is rejected before parsing.
const MAX_CONFIG_SIZE: u64 = 64 * 1024;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0} bytes (max {MAX_CONFIG_SIZE})")]
    TooLarge(u64),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote feed directory.
    pub directory_url: String,

    /// Override for the SQLite database path. Defaults to
    /// `<config dir>/braid.db` when unset.
    pub database_path: Option<String>,

    /// HTTP client timeout in seconds, applied to all outbound requests.
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_url: "https://directory.braid.dev".to_string(),
            database_path: None,
            http_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(ConfigError::TooLarge(metadata.len()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
