//! Configuration loading
//!
//! Settings come from a TOML file whose location is resolved in this order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`~/.config/piplay/config.toml` on Linux)
//! 4. Compiled defaults (no file at all)
//!
//! A missing file never prevents startup; it is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PIPLAY_CONFIG";

/// Top-level TOML configuration. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub player: PlayerConfig,
    pub playback: PlaybackConfig,
    pub database: DatabaseConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Music catalog service settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Scheme and host of the catalog API, without trailing slash
    pub base_url: String,
    /// Maximum number of songs requested per search
    pub search_limit: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Minimum spacing between two catalog requests (0 disables limiting)
    pub min_request_interval_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://music.163.com".to_string(),
            search_limit: 60,
            timeout_secs: 30,
            min_request_interval_ms: 200,
        }
    }
}

/// External audio player settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Player executable, looked up in PATH when not absolute
    pub program: String,
    /// Arguments placed before the stream URLs
    pub args: Vec<String>,
    /// How long to wait for a killed player to be reaped
    pub stop_timeout_ms: u64,
    /// A player failing within this window is reported as crashed by start; 0 disables
    pub startup_grace_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: "mpg123".to_string(),
            args: vec!["-q".to_string()],
            stop_timeout_ms: 2000,
            startup_grace_ms: 250,
        }
    }
}

/// Queue construction settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Fixed shuffle seed; `None` seeds from OS entropy
    pub shuffle_seed: Option<u64>,
}

/// Playlist database settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `None` uses [`default_database_path`]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_database_path)
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config file, only if it exists
    default_config_path().filter(|p| p.exists())
}

/// Load configuration, falling back to defaults when no file is available
///
/// Only a file that exists but cannot be parsed is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(cli_arg, CONFIG_ENV_VAR) else {
        info!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} does not exist, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let config = TomlConfig::load(&path)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("piplay").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("piplay").join("piplay.db"))
        .unwrap_or_else(|| PathBuf::from("./piplay.db"))
}
