//! Error types for telemetrydeck-core

use thiserror::Error;

/// Main error type for the telemetrydeck-core library
///
/// Only local failures are represented here. Delivery problems on the
/// network never reach the caller of [`Client::send_signal`](crate::Client::send_signal);
/// they are reported through the client's diagnostic sink instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Client constructed without an app ID
    #[error("no app ID specified")]
    MissingAppId,

    /// Signal sent without a signal type
    #[error("no signal type specified")]
    MissingSignalType,

    /// Signal body could not be encoded as JSON
    #[error("failed to serialize signal: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// HTTP request could not be built (usually a malformed endpoint)
    #[error("failed to construct request: {0}")]
    RequestConstructionFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for telemetrydeck-core
pub type Result<T> = std::result::Result<T, Error>;
