//! Error types for the LINE relay

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Webhook signature missing or invalid
    #[error("invalid signature")]
    Signature,

    /// Channel API error (LINE or Discord returned a failure)
    #[error("channel error: {0}")]
    Channel(String),

    /// Content staging error
    #[error("attachment error: {0}")]
    Attachment(String),

    /// Preview conversion error
    #[error("media error: {0}")]
    Media(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
