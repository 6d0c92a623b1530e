//! Raw LINE Messaging API calls

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;

use super::types::{Profile, ReplyRequest, SendMessage, Source};
use crate::channels::{Content, SourceChannel};
use crate::{Error, Result};

impl super::LineChannel {
    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// Turn a non-success response into a channel error
    async fn check(response: reqwest::Response, call: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Channel(format!("LINE {call} error: {status} - {body}")))
    }

    async fn get_profile(&self, path: &str) -> Result<Profile> {
        let url = format!("{}{path}", self.api_base);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        let profile = Self::check(response, "profile").await?.json().await?;
        Ok(profile)
    }

    async fn post_leave(&self, path: &str) -> Result<()> {
        let url = format!("{}{path}", self.api_base);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        Self::check(response, "leave").await?;
        Ok(())
    }
}

#[async_trait]
impl SourceChannel for super::LineChannel {
    fn name(&self) -> &'static str {
        "line"
    }

    async fn reply(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let request = ReplyRequest {
            reply_token,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await?;

        Self::check(response, "reply").await?;
        tracing::debug!(count = messages.len(), "LINE reply sent");
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> Result<Profile> {
        self.get_profile(&format!("/v2/bot/profile/{}", urlencoding::encode(user_id)))
            .await
    }

    async fn member_profile(&self, source: &Source) -> Result<Profile> {
        match source {
            Source::User { user_id } => self.profile(user_id).await,
            Source::Group {
                group_id,
                user_id: Some(user_id),
            } => {
                self.get_profile(&format!(
                    "/v2/bot/group/{}/member/{}",
                    urlencoding::encode(group_id),
                    urlencoding::encode(user_id)
                ))
                .await
            }
            Source::Room {
                room_id,
                user_id: Some(user_id),
            } => {
                self.get_profile(&format!(
                    "/v2/bot/room/{}/member/{}",
                    urlencoding::encode(room_id),
                    urlencoding::encode(user_id)
                ))
                .await
            }
            Source::Group { user_id: None, .. } | Source::Room { user_id: None, .. } => Err(
                Error::Channel("source does not identify a sender".to_string()),
            ),
        }
    }

    async fn leave_group(&self, group_id: &str) -> Result<()> {
        self.post_leave(&format!("/v2/bot/group/{}/leave", urlencoding::encode(group_id)))
            .await?;
        tracing::info!(group_id, "left LINE group");
        Ok(())
    }

    async fn leave_room(&self, room_id: &str) -> Result<()> {
        self.post_leave(&format!("/v2/bot/room/{}/leave", urlencoding::encode(room_id)))
            .await?;
        tracing::info!(room_id, "left LINE room");
        Ok(())
    }

    async fn message_content(&self, message_id: &str) -> Result<Content> {
        let url = format!(
            "{}/v2/bot/message/{}/content",
            self.data_base,
            urlencoding::encode(message_id)
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;

        let response = Self::check(response, "content").await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        Ok(Content {
            content_type,
            stream: Box::pin(response.bytes_stream().map_err(Error::from)),
        })
    }
}
