//! LINE Relay - webhook relay for LINE Messaging API bots
//!
//! This library provides the core functionality for the relay:
//! - Signed webhook intake (`POST /callback`)
//! - Echo mode: mirror each message back to its sender
//! - Forward mode: post group messages to a Discord webhook
//! - Staging of message content with JPEG previews
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 LINE Platform                        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ POST /callback
//! ┌────────────────────▼────────────────────────────────┐
//! │                  LINE Relay                          │
//! │   Signature  │  Dispatch  │  Echo  │  Forward       │
//! └──────────┬──────────────────────────┬───────────────┘
//!            │ reply API                │ execute webhook
//! ┌──────────▼──────────┐    ┌──────────▼───────────────┐
//! │   LINE Messaging    │    │        Discord           │
//! └─────────────────────┘    └──────────────────────────┘
//! ```

pub mod api;
pub mod attachments;
pub mod channels;
pub mod config;
pub mod error;
pub mod relay;

pub use api::{ApiServer, ApiState};
pub use config::Config;
pub use error::{Error, Result};
pub use relay::{RelayContext, RelayMode};
