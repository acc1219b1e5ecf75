//! Configuration file loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Tiers 1 and 2 are handled by the service's argument parser; this module
//! provides tier 3 and the merge helper. A missing config file is not an
//! error: the service logs a warning and starts on defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "jukebox";

/// Config file name inside [`CONFIG_DIR_NAME`]
const CONFIG_FILE_NAME: &str = "config.toml";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub player_program: Option<String>,
    pub control_socket: Option<PathBuf>,
    pub audio_device: Option<String>,
    pub resolver_program: Option<String>,
    pub resolver_timeout_ms: Option<u64>,
    pub control_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub initial_volume: Option<u8>,
    pub event_buffer: Option<usize>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration, degrading to defaults when no file exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_source(explicit).map(|(config, _)| config)
    }

    /// Load configuration and report which file it came from
    ///
    /// An explicitly requested file must exist. The default locations are
    /// optional; when none exists an empty config and `None` are returned.
    /// Nothing is logged here since this usually runs before the subscriber
    /// is installed; see [`log_config_source`].
    pub fn load_with_source(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok((Self::default(), None)),
            },
        };

        let content = std::fs::read_to_string(&path)?;
        Ok((Self::from_toml_str(&content)?, Some(path)))
    }
}

/// Report the outcome of [`TomlConfig::load_with_source`]
pub fn log_config_source(source: Option<&Path>) {
    match source {
        Some(path) => info!("Loaded config file {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }
}

/// First existing config file among the platform locations
///
/// Linux checks `~/.config/jukebox/config.toml` then
/// `/etc/jukebox/config.toml`; other platforms only the user config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Pick the highest-priority value: CLI/env, then TOML, then default
pub fn resolve<T>(cli_or_env: Option<T>, toml_value: Option<T>, default: T) -> T {
    cli_or_env.or(toml_value).unwrap_or(default)
}
