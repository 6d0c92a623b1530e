//! Forward relay: post group messages to the destination webhook

use std::path::Path;

use super::RelayContext;
use super::commands::Command;
use super::echo::stage_content;
use crate::Result;
use crate::channels::chunking::split;
use crate::channels::line::types::{LocationMessage, StickerMessage};
use crate::channels::line::{Event, EventKind, Message};
use crate::channels::{Author, DestinationChannel, Source};

/// Public sticker image served by LINE's sticker shop CDN
const STICKER_IMAGE_URL: &str = "https://stickershop.line-scdn.net/stickershop/v1/sticker";

pub(super) async fn handle(event: &Event, ctx: &RelayContext) -> Result<()> {
    let EventKind::Message { message } = &event.kind else {
        tracing::debug!(event = event.kind.as_str(), "event not forwarded");
        return Ok(());
    };

    if let Message::Text(text) = message
        && let Some(command) = Command::parse(&text.text)
    {
        return command
            .run(event.reply_token.as_deref(), event.source.as_ref(), ctx)
            .await;
    }

    if matches!(message, Message::Unknown) {
        tracing::warn!("unknown message type, not forwarded");
        return Ok(());
    }

    let destination = ctx.destination()?;
    let author = resolve_author(event.source.as_ref(), ctx).await;

    match message {
        Message::Text(text) => forward_text(destination.as_ref(), &author, &text.text).await,
        Message::Image(image) => {
            forward_content(destination.as_ref(), &author, &image.id, "jpeg", "image.jpeg", ctx)
                .await
        }
        Message::Video(video) => {
            forward_content(destination.as_ref(), &author, &video.id, "mp4", "video.mp4", ctx)
                .await
        }
        Message::Audio(audio) => {
            forward_content(destination.as_ref(), &author, &audio.id, "m4a", "audio.m4a", ctx)
                .await
        }
        Message::File(file) => {
            let suffix = file_suffix(&file.file_name);
            let staged = stage_content(&file.id, suffix.as_deref(), ctx).await?;
            destination
                .send_file(&author, &file.file_name, staged.path())
                .await
        }
        Message::Location(location) => {
            destination
                .send_text(&author, &describe_location(location))
                .await
        }
        Message::Sticker(sticker) => {
            destination
                .send_text(&author, &sticker_image_url(sticker))
                .await
        }
        Message::Unknown => Ok(()),
    }
}

/// Look up the sender's display name and avatar, best effort
async fn resolve_author(source: Option<&Source>, ctx: &RelayContext) -> Author {
    let Some(source) = source.filter(|s| s.user_id().is_some()) else {
        return Author::default();
    };

    match ctx.source.member_profile(source).await {
        Ok(profile) => Author::from_profile(&profile),
        Err(e) => {
            tracing::debug!(error = %e, "sender profile unavailable, posting without author");
            Author::default()
        }
    }
}

/// Post text in chunks that fit the destination's message limit
///
/// Stops at the first chunk the destination rejects.
async fn forward_text(
    destination: &dyn DestinationChannel,
    author: &Author,
    text: &str,
) -> Result<()> {
    let chunks = split(text, destination.message_limit());
    let total = chunks.len();

    for (idx, chunk) in chunks.iter().enumerate() {
        destination.send_text(author, chunk).await?;
        tracing::debug!(chunk = idx + 1, total, "forwarded text chunk");
    }
    Ok(())
}

async fn forward_content(
    destination: &dyn DestinationChannel,
    author: &Author,
    message_id: &str,
    suffix: &str,
    upload_name: &str,
    ctx: &RelayContext,
) -> Result<()> {
    let staged = stage_content(message_id, Some(suffix), ctx).await?;
    destination.send_file(author, upload_name, staged.path()).await
}

/// Extension of an uploaded file name, if it is a plain alphanumeric suffix
fn file_suffix(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_lowercase)
}

fn describe_location(location: &LocationMessage) -> String {
    let mut lines = Vec::with_capacity(3);
    if let Some(title) = location.title.as_deref().filter(|t| !t.is_empty()) {
        lines.push(title.to_string());
    }
    if let Some(address) = location.address.as_deref().filter(|a| !a.is_empty()) {
        lines.push(address.to_string());
    }
    lines.push(format!(
        "https://www.google.com/maps?q={},{}",
        location.latitude, location.longitude
    ));
    lines.join("\n")
}

fn sticker_image_url(sticker: &StickerMessage) -> String {
    format!(
        "{STICKER_IMAGE_URL}/{}/android/sticker.png",
        urlencoding::encode(&sticker.sticker_id)
    )
}
