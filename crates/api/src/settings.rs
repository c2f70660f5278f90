//! Service Configuration
//!
//! Layered from an optional TOML file and `PRICE_SERVICE__*` environment
//! variables, e.g. `PRICE_SERVICE__ARTIFACTS__DIR=/srv/models`.

use artifacts::ArtifactPaths;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Config file read when `PRICE_SERVICE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "price-service.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_VAR: &str = "PRICE_SERVICE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub artifacts: ArtifactPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    /// Verbose human-readable output for local runs
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json: false,
        }
    }

    /// JSON lines for log collectors
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl Settings {
    /// Load from `PRICE_SERVICE_CONFIG` (or `price-service.toml`) plus the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_file(Path::new(&path))
    }

    /// Load from a specific file, which may be absent
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("PRICE_SERVICE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
