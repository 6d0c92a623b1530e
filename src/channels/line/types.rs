//! LINE Messaging API types
//!
//! Inbound webhook payloads and outbound reply messages. Only the fields the
//! relay reads are modelled; unknown event and message types deserialize to
//! `Unknown` instead of failing the whole batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Webhook request body
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Bot user ID the events were sent to
    #[serde(default)]
    pub destination: Option<String>,
    pub events: Vec<Event>,
}

/// A single webhook event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Single-use token for the reply API
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event type with its type-specific payload
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    Message { message: Message },
    Follow,
    Unfollow,
    Join,
    Leave,
    Postback { postback: Postback },
    Beacon { beacon: Beacon },
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Wire name of the event type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Postback { .. } => "postback",
            Self::Beacon { .. } => "beacon",
            Self::Unknown => "unknown",
        }
    }
}

/// Where an event originated
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    User {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Group {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
    Room {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
}

impl Source {
    /// Sending user, when the platform disclosed it
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { user_id } => Some(user_id),
            Self::Group { user_id, .. } | Self::Room { user_id, .. } => user_id.as_deref(),
        }
    }

    /// Group ID for group sources
    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::Group { group_id, .. } => Some(group_id),
            Self::User { .. } | Self::Room { .. } => None,
        }
    }

    /// Wire name of the source type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Group { .. } => "group",
            Self::Room { .. } => "room",
        }
    }
}

/// Message payload of a message event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text(TextMessage),
    Image(ContentMessage),
    Video(MediaMessage),
    Audio(MediaMessage),
    File(FileMessage),
    Location(LocationMessage),
    Sticker(StickerMessage),
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Wire name of the message type
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
            Self::File(_) => "file",
            Self::Location(_) => "location",
            Self::Sticker(_) => "sticker",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextMessage {
    pub id: String,
    pub text: String,
}

/// Message whose body must be fetched from the content endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ContentMessage {
    pub id: String,
}

/// Audio or video message
#[derive(Debug, Clone, Deserialize)]
pub struct MediaMessage {
    pub id: String,
    /// Length in milliseconds
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMessage {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationMessage {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerMessage {
    pub id: String,
    pub package_id: String,
    pub sticker_id: String,
}

/// Postback action payload
#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
    /// Datetime picker selection (`date`, `time` or `datetime`)
    #[serde(default)]
    pub params: Option<BTreeMap<String, String>>,
}

impl Postback {
    /// Render the postback for a reply, appending picker params for
    /// datetime-picker actions
    #[must_use]
    pub fn describe(&self) -> String {
        let is_picker = matches!(self.data.as_str(), "DATE" | "TIME" | "DATETIME");
        match &self.params {
            Some(params) if is_picker => {
                let rendered = params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({rendered})", self.data)
            }
            _ => self.data.clone(),
        }
    }
}

/// Beacon event payload
#[derive(Debug, Clone, Deserialize)]
pub struct Beacon {
    pub hwid: String,
    #[serde(rename = "type", default)]
    pub beacon_type: Option<String>,
}

/// User profile returned by the profile endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

/// Outbound message for the reply API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SendMessage {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        original_content_url: String,
        preview_image_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Audio {
        original_content_url: String,
        duration: u64,
    },
    Location {
        title: String,
        address: String,
        latitude: f64,
        longitude: f64,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        package_id: String,
        sticker_id: String,
    },
}

impl SendMessage {
    /// Create a `text` message
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Reply API request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [SendMessage],
}
