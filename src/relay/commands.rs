//! Text commands recognized in both relay modes

use super::RelayContext;
use crate::Result;
use crate::channels::{SendMessage, Source};

/// A command matched verbatim against the whole message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Command {
    /// Reply with the sender's profile
    Profile,
    /// Leave the current group or room
    Bye,
}

impl Command {
    pub(super) fn parse(text: &str) -> Option<Self> {
        match text {
            "profile" => Some(Self::Profile),
            "bye" => Some(Self::Bye),
            _ => None,
        }
    }

    pub(super) async fn run(
        self,
        reply_token: Option<&str>,
        source: Option<&Source>,
        ctx: &RelayContext,
    ) -> Result<()> {
        match self {
            Self::Profile => profile(reply_token, source, ctx).await,
            Self::Bye => bye(reply_token, source, ctx).await,
        }
    }
}

async fn profile(
    reply_token: Option<&str>,
    source: Option<&Source>,
    ctx: &RelayContext,
) -> Result<()> {
    let Some(user_id) = source.and_then(Source::user_id) else {
        return ctx
            .reply_text(reply_token, "Bot can't use profile API without user ID")
            .await;
    };

    let profile = match ctx.source.profile(user_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "profile lookup failed");
            return ctx.reply_text(reply_token, &e.to_string()).await;
        }
    };

    let messages = [
        SendMessage::text(format!("User ID: {}", profile.user_id)),
        SendMessage::text(format!("Display name: {}", profile.display_name)),
        SendMessage::text(format!(
            "Status message: {}",
            profile.status_message.unwrap_or_default()
        )),
    ];
    ctx.reply(reply_token, &messages).await
}

/// Announce and leave the source chat
///
/// The announcement consumes the reply token, so a failed leave is only
/// logged.
async fn bye(reply_token: Option<&str>, source: Option<&Source>, ctx: &RelayContext) -> Result<()> {
    match source {
        Some(Source::User { .. }) => {
            ctx.reply_text(reply_token, "Bot can't leave from 1:1 chat")
                .await
        }
        Some(Source::Group { group_id, .. }) => {
            ctx.reply_text(reply_token, "Leaving group").await?;
            if let Err(e) = ctx.source.leave_group(group_id).await {
                tracing::error!(group_id, error = %e, "leave group failed");
            }
            Ok(())
        }
        Some(Source::Room { room_id, .. }) => {
            ctx.reply_text(reply_token, "Leaving room").await?;
            if let Err(e) = ctx.source.leave_room(room_id).await {
                tracing::error!(room_id, error = %e, "leave room failed");
            }
            Ok(())
        }
        None => {
            tracing::debug!("bye without a source, ignoring");
            Ok(())
        }
    }
}
