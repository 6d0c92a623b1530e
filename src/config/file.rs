//! TOML configuration file loading
//!
//! Supports `~/.config/omni/line-relay/config.toml` as a persistent config
//! source. All fields are optional: the file is a partial overlay beneath
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;
use crate::relay::RelayMode;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfigFile {
    /// Relay mode ("echo" or "forward")
    #[serde(default)]
    pub mode: Option<RelayMode>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// LINE channel credentials and endpoints
    #[serde(default)]
    pub line: LineFileConfig,

    /// Discord webhook destination
    #[serde(default)]
    pub discord: DiscordFileConfig,

    /// Forward mode filtering
    #[serde(default)]
    pub forward: ForwardFileConfig,

    /// Preview conversion
    #[serde(default)]
    pub preview: PreviewFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,

    /// Public base URL used to build `/downloaded/` links
    pub app_base_url: Option<String>,

    pub static_dir: Option<PathBuf>,

    pub download_dir: Option<PathBuf>,

    /// Delete staged downloads older than this many seconds
    pub download_retention_secs: Option<u64>,
}

/// LINE channel configuration
#[derive(Debug, Default, Deserialize)]
pub struct LineFileConfig {
    pub channel_secret: Option<String>,
    pub channel_token: Option<String>,
    pub endpoint_base: Option<String>,
    pub data_endpoint_base: Option<String>,
}

/// Discord webhook configuration
#[derive(Debug, Default, Deserialize)]
pub struct DiscordFileConfig {
    pub webhook_id: Option<String>,
    pub webhook_token: Option<String>,
    pub api_base: Option<String>,
}

/// Forward mode configuration
#[derive(Debug, Default, Deserialize)]
pub struct ForwardFileConfig {
    /// Only forward events from these LINE group IDs (empty forwards all)
    #[serde(default)]
    pub allowed_group_ids: Vec<String>,
}

/// Preview converter configuration
#[derive(Debug, Default, Deserialize)]
pub struct PreviewFileConfig {
    pub program: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl RelayConfigFile {
    /// Default config file location
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "omni", "omni")
            .map(|d| d.config_dir().join("line-relay").join("config.toml"))
    }

    /// Load the config file at `path`, or return defaults if it is absent
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let file: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(file)
    }
}
