//! Event relay
//!
//! Supports two relay modes:
//! - Echo: mirror each message back to its sender through the reply API
//! - Forward: post group messages to a Discord webhook
//!
//! All handlers receive a [`RelayContext`] carrying the shared clients and
//! directories, so they can be exercised against mock channels in tests.

mod commands;
mod dispatch;
mod echo;
mod forward;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::attachments::{ContentStager, PreviewConverter};
use crate::channels::line::Event;
use crate::channels::{DestinationChannel, DiscordWebhook, LineChannel, SendMessage, SourceChannel};
use crate::{Error, Result};

pub use dispatch::dispatch;

/// Relay mode options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// Reply to every message with a copy of itself
    #[default]
    Echo,
    /// Forward group messages to the destination webhook
    Forward,
}

impl RelayMode {
    /// Mode name as used in configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Forward => "forward",
        }
    }
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "echo" => Ok(Self::Echo),
            "forward" | "discord" => Ok(Self::Forward),
            other => Err(Error::Config(format!("unknown relay mode: {other}"))),
        }
    }
}

/// Shared state handed to every event handler
#[derive(Clone)]
pub struct RelayContext {
    mode: RelayMode,
    source: Arc<dyn SourceChannel>,
    destination: Option<Arc<dyn DestinationChannel>>,
    stager: ContentStager,
    converter: PreviewConverter,
    app_base_url: String,
    allowed_groups: HashSet<String>,
}

impl RelayContext {
    /// Create a context for `mode` replying through `source`
    #[must_use]
    pub fn new(
        mode: RelayMode,
        source: Arc<dyn SourceChannel>,
        stager: ContentStager,
        app_base_url: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            source,
            destination: None,
            stager,
            converter: PreviewConverter::default(),
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
            allowed_groups: HashSet::new(),
        }
    }

    /// Build the production context: LINE as source, Discord as destination
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built or the download
    /// directory cannot be created
    pub fn from_config(config: &Config) -> Result<Self> {
        let line = LineChannel::new(config.line.channel_token.clone())?.with_endpoints(
            config.line.endpoint_base.clone(),
            config.line.data_endpoint_base.clone(),
        );
        let stager = ContentStager::new(&config.download_dir)?;
        let converter = PreviewConverter::new(&config.preview.program, config.preview.timeout);

        let mut ctx = Self::new(config.mode, Arc::new(line), stager, &config.app_base_url)
            .with_converter(converter)
            .with_allowed_groups(config.allowed_group_ids.iter().cloned());

        if let Some(discord) = &config.discord {
            let mut webhook =
                DiscordWebhook::new(discord.webhook_id.clone(), discord.webhook_token.clone())?;
            if let Some(base) = &discord.api_base {
                webhook = webhook.with_api_base(base.clone());
            }
            ctx = ctx.with_destination(Arc::new(webhook));
        }

        Ok(ctx)
    }

    /// Set the forward destination
    #[must_use]
    pub fn with_destination(mut self, destination: Arc<dyn DestinationChannel>) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Set the preview converter
    #[must_use]
    pub fn with_converter(mut self, converter: PreviewConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Restrict forwarding to these group IDs (empty allows all)
    #[must_use]
    pub fn with_allowed_groups(mut self, groups: impl IntoIterator<Item = String>) -> Self {
        self.allowed_groups = groups.into_iter().collect();
        self
    }

    /// Active relay mode
    #[must_use]
    pub const fn mode(&self) -> RelayMode {
        self.mode
    }

    /// Content stager backing `/downloaded/`
    #[must_use]
    pub const fn stager(&self) -> &ContentStager {
        &self.stager
    }

    /// Preview converter used for image and video replies
    #[must_use]
    pub const fn converter(&self) -> &PreviewConverter {
        &self.converter
    }

    /// Whether `event` is relayed in the active mode
    ///
    /// Forward mode only relays group sources, narrowed to the allow-list
    /// when one is configured. Echo mode accepts everything.
    #[must_use]
    pub fn accepts(&self, event: &Event) -> bool {
        if self.mode != RelayMode::Forward {
            return true;
        }

        event
            .source
            .as_ref()
            .and_then(|s| s.group_id())
            .is_some_and(|g| self.allowed_groups.is_empty() || self.allowed_groups.contains(g))
    }

    /// Public URL of a file in the download directory
    #[must_use]
    pub fn download_url(&self, file_name: &str) -> String {
        format!("{}/downloaded/{file_name}", self.app_base_url)
    }

    fn destination(&self) -> Result<&Arc<dyn DestinationChannel>> {
        self.destination
            .as_ref()
            .ok_or_else(|| Error::Config("forward mode requires a destination webhook".to_string()))
    }

    /// Send reply messages, skipping events that carry no reply token
    async fn reply(&self, reply_token: Option<&str>, messages: &[SendMessage]) -> Result<()> {
        let Some(token) = reply_token else {
            tracing::debug!("event has no reply token, skipping reply");
            return Ok(());
        };
        self.source.reply(token, messages).await
    }

    async fn reply_text(&self, reply_token: Option<&str>, text: &str) -> Result<()> {
        self.reply(reply_token, &[SendMessage::text(text)]).await
    }
}

impl fmt::Debug for RelayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayContext")
            .field("mode", &self.mode)
            .field("source", &self.source.name())
            .field("destination", &self.destination.as_ref().map(|d| d.name()))
            .field("stager", &self.stager)
            .field("app_base_url", &self.app_base_url)
            .field("allowed_groups", &self.allowed_groups)
            .finish_non_exhaustive()
    }
}
