//! LINE channel adapter
//!
//! Receives events through the `/callback` webhook and replies through the
//! Messaging API

mod api;
pub mod signature;
pub mod types;

use std::time::Duration;

use reqwest::Client;
use secrecy::SecretString;

use crate::{Error, Result};

pub use types::{
    CallbackRequest, Event, EventKind, Message, Postback, Profile, SendMessage, Source,
};

/// Messaging API base URL
pub const API_BASE: &str = "https://api.line.me";

/// Content download base URL
pub const DATA_API_BASE: &str = "https://api-data.line.me";

/// Default timeout for Messaging API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineChannel {
    token: SecretString,
    client: Client,
    api_base: String,
    data_base: String,
}

impl LineChannel {
    /// Create a new LINE client against the public endpoints
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(token: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Channel(format!("LINE client error: {e}")))?;

        Ok(Self {
            token,
            client,
            api_base: API_BASE.to_string(),
            data_base: DATA_API_BASE.to_string(),
        })
    }

    /// Override the API endpoints (usually omitted)
    ///
    /// When only `api_base` is given, content downloads go to the same host.
    #[must_use]
    pub fn with_endpoints(mut self, api_base: Option<String>, data_base: Option<String>) -> Self {
        if let Some(base) = api_base {
            let base = base.trim_end_matches('/').to_string();
            if data_base.is_none() {
                self.data_base.clone_from(&base);
            }
            self.api_base = base;
        }
        if let Some(base) = data_base {
            self.data_base = base.trim_end_matches('/').to_string();
        }
        self
    }
}

impl std::fmt::Debug for LineChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineChannel")
            .field("api_base", &self.api_base)
            .field("data_base", &self.data_base)
            .finish_non_exhaustive()
    }
}
