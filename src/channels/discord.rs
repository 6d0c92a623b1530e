//! Discord incoming-webhook adapter
//!
//! Posts forwarded messages to `POST /webhooks/{id}/{token}`. Text goes out
//! as JSON; files go out as `multipart/form-data` with a `payload_json` part.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::chunking::DISCORD_MESSAGE_LIMIT;
use super::{Author, DestinationChannel};
use crate::{Error, Result};

/// Discord REST API base URL
pub const DISCORD_API_BASE: &str = "https://discord.com/api";

/// Discord caps webhook usernames at 80 characters
const USERNAME_LIMIT: usize = 80;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Webhook execute body
#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
    allowed_mentions: AllowedMentions,
}

/// Mention types Discord may resolve in the posted content
#[derive(Debug, Default, Serialize)]
struct AllowedMentions {
    parse: [&'static str; 0],
}

impl<'a> ExecuteRequest<'a> {
    fn new(author: &'a Author, content: &'a str) -> Self {
        Self {
            content: (!content.is_empty()).then_some(content),
            username: author
                .name
                .as_deref()
                .map(|n| n.chars().take(USERNAME_LIMIT).collect()),
            avatar_url: author.avatar_url.as_deref(),
            // Relayed text must never ping @everyone, roles or users
            allowed_mentions: AllowedMentions::default(),
        }
    }
}

/// Discord incoming webhook
#[derive(Clone)]
pub struct DiscordWebhook {
    id: String,
    token: SecretString,
    api_base: String,
    client: Client,
}

impl DiscordWebhook {
    /// Create a webhook client from its ID and token
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(id: String, token: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Channel(format!("Discord client error: {e}")))?;

        Ok(Self {
            id,
            token,
            api_base: DISCORD_API_BASE.to_string(),
            client,
        })
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/webhooks/{}/{}",
            self.api_base,
            self.id,
            self.token.expose_secret()
        )
    }

    async fn check(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Channel(format!("Discord webhook error: {status} - {body}")))
    }
}

impl std::fmt::Debug for DiscordWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhook")
            .field("id", &self.id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DestinationChannel for DiscordWebhook {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn message_limit(&self) -> usize {
        DISCORD_MESSAGE_LIMIT
    }

    async fn send_text(&self, author: &Author, text: &str) -> Result<()> {
        let request = ExecuteRequest::new(author, text);

        let response = self.client.post(self.url()).json(&request).send().await?;
        Self::check(response).await?;

        tracing::debug!(chars = text.chars().count(), "Discord message sent");
        Ok(())
    }

    async fn send_file(&self, author: &Author, file_name: &str, path: &Path) -> Result<()> {
        let data = tokio::fs::read(path).await?;
        let size = data.len();

        let payload = serde_json::to_string(&ExecuteRequest::new(author, ""))?;
        let form = Form::new()
            .part(
                "payload_json",
                Part::text(payload)
                    .mime_str("application/json")
                    .map_err(|e| Error::Channel(e.to_string()))?,
            )
            .part("files[0]", Part::bytes(data).file_name(file_name.to_string()));

        let response = self.client.post(self.url()).multipart(form).send().await?;
        Self::check(response).await?;

        tracing::debug!(file_name, bytes = size, "Discord file uploaded");
        Ok(())
    }
}
