//! Tool configuration
//!
//! Loaded from `~/.config/forcedata/config.toml` when present, with
//! connection settings overridable through environment variables
//! (`SFDC_INSTANCE_URL`, `SFDC_ACCESS_TOKEN`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default pattern for recognizing external-id fields by name
pub const DEFAULT_EXTERNAL_ID_PATTERN: &str = "(?i)externalid";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Standard (non-custom) objects eligible for mapping. Custom objects
    /// are always eligible.
    #[serde(default)]
    pub standard_object_whitelist: Vec<String>,
    /// Regex override for external-id field detection
    #[serde(default)]
    pub external_id_pattern: Option<String>,
    /// Connection settings (may instead come from the environment)
    #[serde(default)]
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Config {
    /// Path of the config file, if a config directory exists on this platform
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("forcedata").join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it doesn't exist
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))
            }
            _ => Ok(Config::default()),
        }
    }

    /// External-id detection pattern, defaulting when not overridden
    pub fn external_id_pattern(&self) -> &str {
        self.external_id_pattern
            .as_deref()
            .unwrap_or(DEFAULT_EXTERNAL_ID_PATTERN)
    }

    /// Resolve connection settings, preferring environment variables
    pub fn resolve_connection(&self) -> Result<(String, String)> {
        let instance_url = std::env::var("SFDC_INSTANCE_URL")
            .ok()
            .or_else(|| self.connection.instance_url.clone())
            .context("No instance URL configured. Set SFDC_INSTANCE_URL or add it to config.toml")?;
        let access_token = std::env::var("SFDC_ACCESS_TOKEN")
            .ok()
            .or_else(|| self.connection.access_token.clone())
            .context("No access token configured. Set SFDC_ACCESS_TOKEN or add it to config.toml")?;
        Ok((instance_url, access_token))
    }
}
