//! LINE webhook callback

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use secrecy::ExposeSecret;

use super::ApiState;
use crate::channels::line::{CallbackRequest, Event, signature};
use crate::relay;
use crate::{Error, Result};

/// Verify and parse a webhook body
///
/// # Errors
///
/// Returns [`Error::Signature`] if the signature header is missing or does
/// not match, and [`Error::Serialization`] if the body is not a valid
/// callback payload
pub fn parse_request(channel_secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<Vec<Event>> {
    let signature = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::Signature)?;

    if !signature::verify(channel_secret, body, signature) {
        return Err(Error::Signature);
    }

    let request: CallbackRequest = serde_json::from_slice(body)?;
    Ok(request.events)
}

/// Handle `POST /callback`
///
/// Events are dispatched in a background task so LINE gets its 200 before
/// any downstream API call completes.
pub async fn handle_callback(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let events = match parse_request(state.channel_secret.expose_secret(), &headers, &body) {
        Ok(events) => events,
        Err(Error::Signature) => {
            tracing::warn!("rejected callback with missing or invalid signature");
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to parse callback body");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    tracing::debug!(count = events.len(), "accepted callback");

    let ctx = state.relay.clone();
    tokio::spawn(async move {
        relay::dispatch(events, &ctx).await;
    });

    StatusCode::OK
}
