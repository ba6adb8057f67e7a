//! Client error types.

use thiserror::Error;
use voicebook_core::TracingError;
use voicebook_providers::{BookingError, ProviderError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Authorization, storage or calendar failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Booking failed; validation messages are shown verbatim.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The booking payload could not be read or parsed.
    #[error("invalid booking payload: {0}")]
    Input(String),

    /// Output could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be set up.
    #[error(transparent)]
    Tracing(#[from] TracingError),
}

impl ClientError {
    /// Returns true if running `voicebook auth url` would fix this.
    pub fn requires_authorization(&self) -> bool {
        match self {
            Self::Provider(e) => e.code().requires_authorization(),
            Self::Booking(e) => e.requires_authorization(),
            _ => false,
        }
    }
}
