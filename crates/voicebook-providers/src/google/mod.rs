//! Google OAuth and Google Calendar support.
//!
//! # Authentication Flow
//!
//! 1. The operator provides an OAuth client, either as a Google Cloud
//!    Console `credentials.json` or as a client ID/secret pair
//! 2. [`AuthorizationFlow::build_authorization_url`] returns a consent URL
//!    bound to a fresh single-use state token
//! 3. Google redirects to the registered redirect URI with a code
//! 4. [`AuthorizationFlow::exchange_code`] checks the state and stores the
//!    tokens
//! 5. Later calls get a live credential from
//!    [`AuthorizationFlow::current_credentials`], which refreshes it when
//!    it has expired

mod client;
mod config;
mod oauth;
mod state;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{
    CALENDAR_API_BASE, CALENDAR_EVENTS_SCOPE, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig,
    OAuthClientConfig, STATE_CACHE_FILE, TOKEN_FILE,
};
pub use oauth::AuthorizationFlow;
pub use state::{STATE_TOKEN_BYTES, StateTokenCache};
pub use tokens::{CredentialStore, EXPIRY_SKEW_SECS, StoredCredential};
