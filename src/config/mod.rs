//! Configuration management for the LINE relay
//!
//! Environment variables take precedence over the optional TOML file.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

pub use file::RelayConfigFile;

use crate::attachments::preview;
use crate::relay::RelayMode;
use crate::{Error, Result};

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Echo or forward
    pub mode: RelayMode,

    /// Port to listen on
    pub port: u16,

    /// LINE channel credentials and endpoints
    pub line: LineConfig,

    /// Public base URL of this server, used in `/downloaded/` links
    pub app_base_url: String,

    /// Discord webhook destination (required in forward mode)
    pub discord: Option<DiscordConfig>,

    /// Group IDs allowed through in forward mode (empty allows all)
    pub allowed_group_ids: Vec<String>,

    /// Directory served under `/static/`
    pub static_dir: PathBuf,

    /// Directory staged content is written to, served under `/downloaded/`
    pub download_dir: PathBuf,

    /// Delete staged downloads older than this (`None` keeps them forever)
    pub download_retention: Option<Duration>,

    /// Preview converter settings
    pub preview: PreviewConfig,
}

/// LINE channel configuration
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Secret used to verify webhook signatures
    pub channel_secret: SecretString,

    /// Long-lived channel access token
    pub channel_token: SecretString,

    /// Messaging API base override (usually omitted)
    pub endpoint_base: Option<String>,

    /// Content API base override
    pub data_endpoint_base: Option<String>,
}

/// Discord webhook configuration
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub webhook_id: String,
    pub webhook_token: SecretString,
    pub api_base: Option<String>,
}

/// Preview converter configuration
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Converter program (ImageMagick `convert`)
    pub program: String,

    /// Per-conversion timeout
    pub timeout: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            program: preview::DEFAULT_PROGRAM.to_string(),
            timeout: preview::DEFAULT_TIMEOUT,
        }
    }
}

/// Default download directory: `line-bot/` next to the executable
fn default_download_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("line-bot")))
        .unwrap_or_else(|| PathBuf::from("line-bot"))
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// The file path comes from `LINE_RELAY_CONFIG`, falling back to
    /// [`RelayConfigFile::default_path`].
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be parsed or required values are
    /// missing
    pub fn load() -> Result<Self> {
        let path = std::env::var("LINE_RELAY_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(RelayConfigFile::default_path);

        let file = match path {
            Some(p) => RelayConfigFile::load(&p)?,
            None => RelayConfigFile::default(),
        };

        Self::from_sources(|key| std::env::var(key).ok(), file)
    }

    /// Build configuration from a variable lookup and a parsed file
    ///
    /// # Errors
    ///
    /// Returns error if required values are missing or malformed
    pub fn from_sources<F>(env: F, fc: RelayConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let mode = match env("RELAY_MODE") {
            Some(m) => m.parse()?,
            None => fc.mode.unwrap_or_default(),
        };

        let port = match env("PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| Error::Config(format!("invalid PORT {p:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        let channel_secret = env("CHANNEL_SECRET")
            .or(fc.line.channel_secret)
            .ok_or_else(|| Error::Config("CHANNEL_SECRET is required".to_string()))?;
        let channel_token = env("CHANNEL_TOKEN")
            .or(fc.line.channel_token)
            .ok_or_else(|| Error::Config("CHANNEL_TOKEN is required".to_string()))?;

        let line = LineConfig {
            channel_secret: SecretString::from(channel_secret),
            channel_token: SecretString::from(channel_token),
            endpoint_base: env("ENDPOINT_BASE").or(fc.line.endpoint_base),
            data_endpoint_base: env("DATA_ENDPOINT_BASE").or(fc.line.data_endpoint_base),
        };

        let app_base_url = env("APP_BASE_URL")
            .or(fc.server.app_base_url)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let discord = match (
            env("DISCORD_WEBHOOK_ID").or(fc.discord.webhook_id),
            env("DISCORD_WEBHOOK_TOKEN").or(fc.discord.webhook_token),
        ) {
            (Some(webhook_id), Some(token)) => Some(DiscordConfig {
                webhook_id,
                webhook_token: SecretString::from(token),
                api_base: env("DISCORD_API_BASE").or(fc.discord.api_base),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "DISCORD_WEBHOOK_ID and DISCORD_WEBHOOK_TOKEN must be set together"
                        .to_string(),
                ));
            }
        };

        let allowed_group_ids = env("ALLOWED_GROUP_IDS").map_or(fc.forward.allowed_group_ids, |v| {
            parse_list(&v)
        });

        let static_dir = env("STATIC_DIR")
            .map(PathBuf::from)
            .or(fc.server.static_dir)
            .unwrap_or_else(|| PathBuf::from("static"));

        let download_dir = env("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .or(fc.server.download_dir)
            .unwrap_or_else(default_download_dir);

        let download_retention = match env("DOWNLOAD_RETENTION_SECS") {
            Some(v) => Some(parse_secs("DOWNLOAD_RETENTION_SECS", &v)?),
            None => fc.server.download_retention_secs.map(Duration::from_secs),
        }
        .filter(|d| !d.is_zero());

        let preview_timeout = match env("PREVIEW_TIMEOUT_SECS") {
            Some(v) => parse_secs("PREVIEW_TIMEOUT_SECS", &v)?,
            None => fc
                .preview
                .timeout_secs
                .map_or(preview::DEFAULT_TIMEOUT, Duration::from_secs),
        };

        let config = Self {
            mode,
            port,
            line,
            app_base_url,
            discord,
            allowed_group_ids,
            static_dir,
            download_dir,
            download_retention,
            preview: PreviewConfig {
                program: env("PREVIEW_PROGRAM")
                    .or(fc.preview.program)
                    .unwrap_or_else(|| preview::DEFAULT_PROGRAM.to_string()),
                timeout: preview_timeout,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field requirements
    ///
    /// # Errors
    ///
    /// Returns error if forward mode lacks a destination webhook
    pub fn validate(&self) -> Result<()> {
        if self.mode == RelayMode::Forward && self.discord.is_none() {
            return Err(Error::Config(
                "forward mode requires DISCORD_WEBHOOK_ID and DISCORD_WEBHOOK_TOKEN".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse()
        .map(Duration::from_secs)
        .map_err(|e| Error::Config(format!("invalid {key} {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [("CHANNEL_SECRET", "secret"), ("CHANNEL_TOKEN", "token")];

    #[test]
    fn minimal_echo_config() {
        let config = Config::from_sources(lookup(&REQUIRED), RelayConfigFile::default()).unwrap();

        assert_eq!(config.mode, RelayMode::Echo);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.line.channel_secret.expose_secret(), "secret");
        assert_eq!(config.app_base_url, "http://localhost:8080");
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert!(config.discord.is_none());
        assert!(config.download_retention.is_none());
        assert_eq!(config.preview.program, "convert");
    }

    #[test]
    fn missing_secret_is_error() {
        let env = lookup(&[("CHANNEL_TOKEN", "t")]);
        let err = Config::from_sources(env, RelayConfigFile::default()).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("CHANNEL_SECRET")));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RELAY_MODE", "  "));
        pairs.push(("ENDPOINT_BASE", ""));
        let config = Config::from_sources(lookup(&pairs), RelayConfigFile::default()).unwrap();
        assert_eq!(config.mode, RelayMode::Echo);
        assert!(config.line.endpoint_base.is_none());
    }

    #[test]
    fn forward_mode_requires_webhook() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RELAY_MODE", "forward"));
        assert!(Config::from_sources(lookup(&pairs), RelayConfigFile::default()).is_err());

        pairs.push(("DISCORD_WEBHOOK_ID", "123"));
        pairs.push(("DISCORD_WEBHOOK_TOKEN", "abc"));
        pairs.push(("ALLOWED_GROUP_IDS", "G1, G2,,"));
        let config = Config::from_sources(lookup(&pairs), RelayConfigFile::default()).unwrap();
        assert_eq!(config.mode, RelayMode::Forward);
        assert_eq!(config.allowed_group_ids, vec!["G1", "G2"]);
        assert_eq!(config.discord.unwrap().webhook_id, "123");
    }

    #[test]
    fn half_configured_webhook_is_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DISCORD_WEBHOOK_ID", "123"));
        assert!(Config::from_sources(lookup(&pairs), RelayConfigFile::default()).is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = RelayConfigFile::default();
        fc.server.port = Some(9000);
        fc.server.app_base_url = Some("https://file.example.com/".to_string());
        fc.server.download_retention_secs = Some(60);
        fc.forward.allowed_group_ids = vec!["GF".to_string()];

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "7000"));
        let config = Config::from_sources(lookup(&pairs), fc).unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.app_base_url, "https://file.example.com");
        assert_eq!(config.download_retention, Some(Duration::from_secs(60)));
        assert_eq!(config.allowed_group_ids, vec!["GF"]);
    }

    #[test]
    fn zero_retention_disables_sweeping() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DOWNLOAD_RETENTION_SECS", "0"));
        let config = Config::from_sources(lookup(&pairs), RelayConfigFile::default()).unwrap();
        assert!(config.download_retention.is_none());
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(Config::from_sources(lookup(&pairs), RelayConfigFile::default()).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PREVIEW_TIMEOUT_SECS", "-1"));
        assert!(Config::from_sources(lookup(&pairs), RelayConfigFile::default()).is_err());
    }
}
