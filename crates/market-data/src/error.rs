//! Market data error types

use thiserror::Error;

/// Errors that can occur during market data operations
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Transport or HTTP status error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The venue answered with an error body
    #[error("Venue error {code}: {message}")]
    Venue { code: i64, message: String },

    /// The venue answered without a result
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// The venue answered with data the snapshot cannot use
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Client construction failed
    #[error("Configuration error: {0}")]
    Config(String),
}
