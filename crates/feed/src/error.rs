//! Feed error types

use thiserror::Error;

pub type FeedResult<T> = std::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid feed URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Missing venue credentials")]
    MissingCredentials,

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Subscription rejected: {0}")]
    SubscribeRejected(String),

    #[error("Request {method} rejected: {message}")]
    RequestRejected { method: String, message: String },

    #[error("No response to {method} within {timeout_secs}s")]
    NoResponse { method: String, timeout_secs: u64 },

    #[error("Connection closed by server")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeedError {
    /// Fatal errors stop the client instead of triggering a reconnect.
    ///
    /// Only configuration that can never succeed is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::InvalidUrl { .. })
    }
}
