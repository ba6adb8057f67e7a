//! Error types for provider operations.
//!
//! Everything that talks to the OAuth provider, the calendar API or the
//! on-disk stores reports a [`ProviderError`]. The [`ProviderErrorCode`]
//! tells callers what kind of failure happened and who can fix it.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// OAuth client configuration is missing or unreadable.
    ConfigurationError,
    /// The OAuth callback carried a state that was never issued or was
    /// already used.
    InvalidState,
    /// The token endpoint rejected a code exchange or refresh.
    TokenExchange,
    /// No usable credential is stored; the authorization flow must be run.
    NotConnected,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// A store could not be written or locked.
    StorageError,
    /// The calendar API rejected the request.
    CalendarError,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if the end user or operator must (re)run authorization.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Self::NotConnected | Self::TokenExchange)
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::InvalidState => "invalid_state",
            Self::TokenExchange => "token_exchange_failed",
            Self::NotConnected => "not_connected",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::StorageError => "storage_error",
            Self::CalendarError => "calendar_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while authorizing, storing or booking.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an invalid OAuth state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidState, message)
    }

    /// Creates a token exchange error.
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenExchange, message)
    }

    /// Creates a not-connected error.
    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotConnected, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::StorageError, message)
    }

    /// Creates a calendar API error.
    pub fn calendar(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CalendarError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Classifies a transport failure from the HTTP client.
    pub(crate) fn from_transport(context: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{context}: request timed out")
        } else if err.is_connect() {
            format!("{context}: connection failed")
        } else {
            format!("{context}: request failed")
        };
        Self::network(message).with_source(err)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
