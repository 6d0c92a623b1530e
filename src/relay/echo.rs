//! Echo relay: mirror messages back through the reply API

use super::RelayContext;
use super::commands::Command;
use crate::Result;
use crate::attachments::{PreviewKind, StagedFile};
use crate::channels::SendMessage;
use crate::channels::line::types::{FileMessage, LocationMessage, MediaMessage};
use crate::channels::line::{Event, EventKind, Message};

/// Duration sent for audio replies when the event carries none
const DEFAULT_AUDIO_DURATION_MS: u64 = 100;

pub(super) async fn handle(event: &Event, ctx: &RelayContext) -> Result<()> {
    let token = event.reply_token.as_deref();

    match &event.kind {
        EventKind::Message { message } => handle_message(message, event, ctx).await,
        EventKind::Follow => ctx.reply_text(token, "Got followed event").await,
        EventKind::Unfollow => {
            tracing::info!(source = ?event.source, "unfollowed this bot");
            Ok(())
        }
        EventKind::Join => {
            let kind = event.source.as_ref().map_or("unknown", |s| s.kind());
            ctx.reply_text(token, &format!("Joined {kind}")).await
        }
        EventKind::Leave => {
            tracing::info!(source = ?event.source, "left");
            Ok(())
        }
        EventKind::Postback { postback } => {
            ctx.reply_text(token, &format!("Got postback: {}", postback.describe()))
                .await
        }
        EventKind::Beacon { beacon } => {
            ctx.reply_text(token, &format!("Got beacon: {}", beacon.hwid))
                .await
        }
        EventKind::Unknown => {
            tracing::warn!("unknown event type, ignoring");
            Ok(())
        }
    }
}

async fn handle_message(message: &Message, event: &Event, ctx: &RelayContext) -> Result<()> {
    let token = event.reply_token.as_deref();

    match message {
        Message::Text(text) => {
            if let Some(command) = Command::parse(&text.text) {
                return command.run(token, event.source.as_ref(), ctx).await;
            }
            tracing::info!(reply_token = ?token, text = %text.text, "echo message");
            ctx.reply_text(token, &text.text).await
        }
        Message::Image(image) => {
            let (staged, preview) =
                stage_with_preview(&image.id, "jpeg", PreviewKind::Image, ctx).await?;
            let reply = SendMessage::Image {
                original_content_url: ctx.download_url(&staged.file_name()),
                preview_image_url: ctx.download_url(&preview),
            };
            ctx.reply(token, &[reply]).await
        }
        Message::Video(video) => {
            let (staged, preview) =
                stage_with_preview(&video.id, "mp4", PreviewKind::Video, ctx).await?;
            let reply = SendMessage::Video {
                original_content_url: ctx.download_url(&staged.file_name()),
                preview_image_url: ctx.download_url(&preview),
            };
            ctx.reply(token, &[reply]).await
        }
        Message::Audio(audio) => echo_audio(audio, token, ctx).await,
        Message::File(file) => echo_file(file, token, ctx).await,
        Message::Location(location) => echo_location(location, token, ctx).await,
        Message::Sticker(sticker) => {
            let reply = SendMessage::Sticker {
                package_id: sticker.package_id.clone(),
                sticker_id: sticker.sticker_id.clone(),
            };
            ctx.reply(token, &[reply]).await
        }
        Message::Unknown => {
            tracing::warn!("unknown message type, ignoring");
            Ok(())
        }
    }
}

/// Download message content into the stager
pub(super) async fn stage_content(
    message_id: &str,
    suffix: Option<&str>,
    ctx: &RelayContext,
) -> Result<StagedFile> {
    let content = ctx.source.message_content(message_id).await?;
    tracing::info!(message_id, content_type = ?content.content_type, "got content");
    ctx.stager.stage(content.stream, suffix).await
}

/// Stage content and derive its preview, returning the preview's file name
async fn stage_with_preview(
    message_id: &str,
    suffix: &str,
    kind: PreviewKind,
    ctx: &RelayContext,
) -> Result<(StagedFile, String)> {
    let staged = stage_content(message_id, Some(suffix), ctx).await?;
    let preview = ctx.converter.derive(&staged, kind).await?;
    let preview_name = preview
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((staged, preview_name))
}

async fn echo_audio(audio: &MediaMessage, token: Option<&str>, ctx: &RelayContext) -> Result<()> {
    let staged = stage_content(&audio.id, Some("m4a"), ctx).await?;
    let reply = SendMessage::Audio {
        original_content_url: ctx.download_url(&staged.file_name()),
        duration: audio.duration.unwrap_or(DEFAULT_AUDIO_DURATION_MS),
    };
    ctx.reply(token, &[reply]).await
}

async fn echo_file(file: &FileMessage, token: Option<&str>, ctx: &RelayContext) -> Result<()> {
    ctx.reply_text(
        token,
        &format!("File `{}` ({} bytes) received.", file.file_name, file.file_size),
    )
    .await
}

async fn echo_location(
    location: &LocationMessage,
    token: Option<&str>,
    ctx: &RelayContext,
) -> Result<()> {
    let reply = SendMessage::Location {
        title: location
            .title
            .clone()
            .unwrap_or_else(|| "Location".to_string()),
        address: location.address.clone().unwrap_or_default(),
        latitude: location.latitude,
        longitude: location.longitude,
    };
    ctx.reply(token, &[reply]).await
}
