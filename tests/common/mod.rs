//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use line_relay::attachments::{ContentStager, PreviewConverter};
use line_relay::channels::line::{CallbackRequest, Event, Profile, signature};
use line_relay::channels::{
    Author, Content, DestinationChannel, SendMessage, Source, SourceChannel,
};
use line_relay::{Error, RelayContext, RelayMode};
use tempfile::TempDir;
use tokio::sync::Mutex;

pub const CHANNEL_SECRET: &str = "test-channel-secret";
pub const BASE_URL: &str = "https://relay.example.com";

/// Mock LINE channel recording every outbound call
#[derive(Default)]
pub struct MockSource {
    pub replies: Mutex<Vec<(String, Vec<SendMessage>)>>,
    pub profile_calls: Mutex<Vec<String>>,
    pub left_groups: Mutex<Vec<String>>,
    pub left_rooms: Mutex<Vec<String>>,
    profile: Option<Profile>,
    content: Option<Vec<u8>>,
    fail_leave: bool,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `profile` from profile lookups (lookups fail otherwise)
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Serve `data` as the body of every message (downloads fail otherwise)
    pub fn with_content(mut self, data: &[u8]) -> Self {
        self.content = Some(data.to_vec());
        self
    }

    /// Record leave calls but report them as failed
    pub fn with_failing_leave(mut self) -> Self {
        self.fail_leave = true;
        self
    }

    fn leave_result(&self, id: &str) -> line_relay::Result<()> {
        if self.fail_leave {
            return Err(Error::Channel(format!("LINE leave error: 403 Forbidden - {id}")));
        }
        Ok(())
    }

    pub async fn replies(&self) -> Vec<(String, Vec<SendMessage>)> {
        self.replies.lock().await.clone()
    }

    /// Reply texts in order, flattened across reply calls
    pub async fn reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .await
            .iter()
            .flat_map(|(_, messages)| messages.iter())
            .filter_map(|m| match m {
                SendMessage::Text { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SourceChannel for MockSource {
    fn name(&self) -> &'static str {
        "mock-line"
    }

    async fn reply(&self, reply_token: &str, messages: &[SendMessage]) -> line_relay::Result<()> {
        self.replies
            .lock()
            .await
            .push((reply_token.to_string(), messages.to_vec()));
        Ok(())
    }

    async fn profile(&self, user_id: &str) -> line_relay::Result<Profile> {
        self.profile_calls.lock().await.push(user_id.to_string());
        self.profile
            .clone()
            .ok_or_else(|| Error::Channel("LINE profile error: 404 Not Found - {}".to_string()))
    }

    async fn member_profile(&self, source: &Source) -> line_relay::Result<Profile> {
        let user_id = source
            .user_id()
            .ok_or_else(|| Error::Channel("no user id".to_string()))?;
        self.profile(user_id).await
    }

    async fn leave_group(&self, group_id: &str) -> line_relay::Result<()> {
        self.left_groups.lock().await.push(group_id.to_string());
        self.leave_result(group_id)
    }

    async fn leave_room(&self, room_id: &str) -> line_relay::Result<()> {
        self.left_rooms.lock().await.push(room_id.to_string());
        self.leave_result(room_id)
    }

    async fn message_content(&self, message_id: &str) -> line_relay::Result<Content> {
        let data = self.content.clone().ok_or_else(|| {
            Error::Channel(format!("LINE content error: 404 Not Found - {message_id}"))
        })?;

        // Deliver in small pieces to exercise streaming writes
        let chunks: Vec<line_relay::Result<Bytes>> = data
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        Ok(Content {
            content_type: Some("application/octet-stream".to_string()),
            stream: futures::stream::iter(chunks).boxed(),
        })
    }
}

/// Mock Discord webhook recording posts
pub struct MockDestination {
    pub texts: Mutex<Vec<(Author, String)>>,
    pub files: Mutex<Vec<(String, Vec<u8>)>>,
    limit: usize,
    fail_after: Option<usize>,
}

impl MockDestination {
    pub fn new(limit: usize) -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            limit,
            fail_after: None,
        }
    }

    /// Reject every text post once `accepted` posts have been recorded
    pub fn fail_after(mut self, accepted: usize) -> Self {
        self.fail_after = Some(accepted);
        self
    }

    pub async fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .await
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl DestinationChannel for MockDestination {
    fn name(&self) -> &'static str {
        "mock-discord"
    }

    fn message_limit(&self) -> usize {
        self.limit
    }

    async fn send_text(&self, author: &Author, text: &str) -> line_relay::Result<()> {
        let mut texts = self.texts.lock().await;
        if self.fail_after.is_some_and(|n| texts.len() >= n) {
            return Err(Error::Channel("Discord API error: 429 - rate limited".to_string()));
        }
        texts.push((author.clone(), text.to_string()));
        Ok(())
    }

    async fn send_file(
        &self,
        _author: &Author,
        file_name: &str,
        path: &Path,
    ) -> line_relay::Result<()> {
        let data = std::fs::read(path)?;
        self.files.lock().await.push((file_name.to_string(), data));
        Ok(())
    }
}

/// A relay context wired to mocks, with its download dir kept alive
pub struct Harness {
    pub source: Arc<MockSource>,
    pub destination: Arc<MockDestination>,
    pub ctx: RelayContext,
    pub dir: TempDir,
}

/// Build a harness for `mode` with an optional forward allow-list
pub fn harness(mode: RelayMode, source: MockSource, allowed_groups: &[&str]) -> Harness {
    harness_with(mode, source, MockDestination::new(2000), allowed_groups)
}

/// Build a harness around a preconfigured destination
pub fn harness_with(
    mode: RelayMode,
    source: MockSource,
    destination: MockDestination,
    allowed_groups: &[&str],
) -> Harness {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let stager = ContentStager::new(dir.path().join("line-bot")).expect("failed to create stager");

    let source = Arc::new(source);
    let destination = Arc::new(destination);
    let source_channel: Arc<dyn SourceChannel> = source.clone();
    let destination_channel: Arc<dyn DestinationChannel> = destination.clone();

    let ctx = RelayContext::new(mode, source_channel, stager, BASE_URL)
        .with_destination(destination_channel)
        .with_converter(PreviewConverter::new("true", std::time::Duration::from_secs(5)))
        .with_allowed_groups(allowed_groups.iter().map(ToString::to_string));

    Harness {
        source,
        destination,
        ctx,
        dir,
    }
}

/// Parse a webhook body containing `events`
pub fn events(events: serde_json::Value) -> Vec<Event> {
    let body = serde_json::json!({ "destination": "Ubot", "events": events });
    let request: CallbackRequest = serde_json::from_value(body).expect("invalid test events");
    request.events
}

/// Text message event from a user
pub fn user_text(token: &str, user_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "replyToken": token,
        "timestamp": 1_700_000_000_000_i64,
        "source": { "type": "user", "userId": user_id },
        "message": { "type": "text", "id": "m1", "text": text }
    })
}

/// Text message event from a group member
pub fn group_text(token: &str, group_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "replyToken": token,
        "timestamp": 1_700_000_000_000_i64,
        "source": { "type": "group", "groupId": group_id, "userId": "U1" },
        "message": { "type": "text", "id": "m1", "text": text }
    })
}

/// Sign a body with the test channel secret
pub fn sign(body: &[u8]) -> String {
    signature::sign(CHANNEL_SECRET, body).expect("failed to sign body")
}

pub fn profile(user_id: &str, name: &str) -> Profile {
    Profile {
        user_id: user_id.to_string(),
        display_name: name.to_string(),
        picture_url: Some(format!("https://profile.line-scdn.net/{user_id}")),
        status_message: Some("hello".to_string()),
    }
}
