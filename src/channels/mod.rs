//! Messaging channel adapters
//!
//! The relay talks to two kinds of channel: a [`SourceChannel`] that delivers
//! webhook events and accepts replies (LINE), and a [`DestinationChannel`]
//! that forwarded messages are posted to (a Discord webhook).

pub mod chunking;
mod discord;
pub mod line;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub use discord::DiscordWebhook;
pub use line::{LineChannel, Profile, SendMessage, Source};

use crate::Result;

/// Byte stream of downloaded message content
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Binary message content fetched from the source platform
pub struct Content {
    /// `Content-Type` reported by the platform
    pub content_type: Option<String>,

    /// Body, consumed once
    pub stream: ByteStream,
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Identity a forwarded message is posted under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    /// Display name override
    pub name: Option<String>,

    /// Avatar image URL override
    pub avatar_url: Option<String>,
}

impl Author {
    /// Build an author from the sender's platform profile
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: Some(profile.display_name.clone()),
            avatar_url: profile.picture_url.clone(),
        }
    }
}

/// Platform the relay receives events from and replies through
#[async_trait]
pub trait SourceChannel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Reply to an event using its single-use reply token
    async fn reply(&self, reply_token: &str, messages: &[SendMessage]) -> Result<()>;

    /// Fetch a user's profile
    async fn profile(&self, user_id: &str) -> Result<Profile>;

    /// Fetch the profile of the sender within a group or room
    ///
    /// Falls back to the plain profile lookup for one-to-one sources
    async fn member_profile(&self, source: &Source) -> Result<Profile>;

    /// Leave a group chat
    async fn leave_group(&self, group_id: &str) -> Result<()>;

    /// Leave a multi-person room
    async fn leave_room(&self, room_id: &str) -> Result<()>;

    /// Download the binary body of an image, video, audio or file message
    async fn message_content(&self, message_id: &str) -> Result<Content>;
}

/// Chat webhook the forward relay posts to
#[async_trait]
pub trait DestinationChannel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Maximum characters per text post (0 means unlimited)
    fn message_limit(&self) -> usize {
        0
    }

    /// Post a text message
    async fn send_text(&self, author: &Author, text: &str) -> Result<()>;

    /// Upload a local file as an attachment
    async fn send_file(&self, author: &Author, file_name: &str, path: &Path) -> Result<()>;
}
