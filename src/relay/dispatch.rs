//! Event batch dispatch

use super::{RelayContext, RelayMode, echo, forward};
use crate::channels::line::{Event, EventKind};

/// Route each event of a webhook batch to its handler, in delivery order
///
/// Handler failures are logged and never stop the rest of the batch.
pub async fn dispatch(events: Vec<Event>, ctx: &RelayContext) {
    for event in events {
        if !ctx.accepts(&event) {
            tracing::debug!(
                source = ?event.source,
                "event source not in group allow-list, dropping"
            );
            continue;
        }

        let kind = event.kind.as_str();
        let message_type = match &event.kind {
            EventKind::Message { message } => Some(message.as_str()),
            _ => None,
        };
        tracing::info!(event = kind, message_type, source = ?event.source, "got event");

        let result = match ctx.mode {
            RelayMode::Echo => echo::handle(&event, ctx).await,
            RelayMode::Forward => forward::handle(&event, ctx).await,
        };

        if let Err(e) = result {
            tracing::error!(event = kind, message_type, error = %e, "event handler failed");
        }
    }
}
