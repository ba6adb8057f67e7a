//! Google OAuth and Calendar configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Google OAuth endpoints.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Scope needed to insert events.
pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// File names inside the data directory.
pub const STATE_CACHE_FILE: &str = "oauth-state-cache.json";
pub const TOKEN_FILE: &str = "google-oauth-token.json";

/// OAuth 2.0 client identity used for the authorization flow.
///
/// Resolved fresh for every authorization operation so that a
/// credentials file dropped in place is picked up without a restart.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Structure of Google's OAuth credentials JSON file.
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    #[serde(default)]
    web: Option<NestedCredentials>,
    #[serde(default)]
    installed: Option<NestedCredentials>,
}

/// One section of the credentials JSON file.
#[derive(Debug, Default, Deserialize)]
struct NestedCredentials {
    #[serde(default)]
    client_id: Option<serde_json::Value>,
    #[serde(default)]
    client_secret: Option<serde_json::Value>,
}

impl NestedCredentials {
    fn is_empty(&self) -> bool {
        self.client_id.is_none() && self.client_secret.is_none()
    }
}

impl OAuthClientConfig {
    /// Creates a client config.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Builds a config from two values, both required non-empty after
    /// trimming.
    pub fn from_parts(client_id: Option<&str>, client_secret: Option<&str>) -> Option<Self> {
        let client_id = client_id.map(str::trim).filter(|s| !s.is_empty())?;
        let client_secret = client_secret.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self::new(client_id, client_secret))
    }

    /// Parses a Google Cloud Console credentials JSON document.
    ///
    /// The `web` section wins over `installed`. A document without a
    /// section holding both values yields `Ok(None)`.
    pub fn from_json(json: &str) -> ProviderResult<Option<Self>> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration("failed to parse Google credentials file").with_source(e)
        })?;

        let section = file
            .web
            .filter(|s| !s.is_empty())
            .or(file.installed)
            .unwrap_or_default();
        let client_id = section.client_id.as_ref().map(json_text);
        let client_secret = section.client_secret.as_ref().map(json_text);
        Ok(Self::from_parts(client_id.as_deref(), client_secret.as_deref()))
    }

    /// Loads a credentials file. A missing file yields `Ok(None)`; one that
    /// exists but cannot be read or parsed is a configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Option<Self>> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no Google credentials file");
                return Ok(None);
            }
            Err(e) => {
                return Err(ProviderError::configuration(format!(
                    "failed to read Google credentials file {}",
                    path.display()
                ))
                .with_source(e));
            }
        };
        Self::from_json(&content)
    }
}

/// Renders a JSON scalar as text, so numeric ids still count.
fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Configuration for the Google OAuth flow and Calendar API access.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Path of the Google Cloud Console credentials JSON file.
    pub credentials_file: PathBuf,

    /// Fallback client ID when the credentials file has none.
    pub client_id: Option<String>,

    /// Fallback client secret when the credentials file has none.
    pub client_secret: Option<String>,

    /// Redirect URI registered with the OAuth client.
    pub redirect_uri: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Authorization endpoint.
    pub auth_url: String,

    /// Token endpoint for code exchange.
    pub token_url: String,

    /// Calendar API base URL.
    pub api_base: String,

    /// Calendar that bookings are inserted into.
    pub calendar_id: String,

    /// Directory holding the state cache and the credential file.
    pub data_dir: PathBuf,

    /// Request timeout for outbound HTTP calls.
    pub timeout: Duration,

    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    /// Default calendar.
    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";

    /// Default credentials file, relative to the working directory.
    pub const DEFAULT_CREDENTIALS_FILE: &'static str = "credentials.json";

    /// Default data directory, relative to the working directory.
    pub const DEFAULT_DATA_DIR: &'static str = ".data";

    /// Creates a configuration for the given redirect URI.
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            credentials_file: PathBuf::from(Self::DEFAULT_CREDENTIALS_FILE),
            client_id: None,
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            scopes: vec![CALENDAR_EVENTS_SCOPE.to_string()],
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: CALENDAR_API_BASE.to_string(),
            calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            data_dir: PathBuf::from(Self::DEFAULT_DATA_DIR),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("voicebook/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Joins a base URL and a redirect path with URL-reference semantics.
    ///
    /// `http://localhost:3000` + `/auth/google/callback` gives
    /// `http://localhost:3000/auth/google/callback`; a relative path
    /// replaces the last segment of the base.
    pub fn join_redirect_uri(base_url: &str, path: &str) -> ProviderResult<String> {
        let base = Url::parse(base_url).map_err(|e| {
            ProviderError::configuration(format!("invalid base URL: {base_url}")).with_source(e)
        })?;
        let joined = base.join(path).map_err(|e| {
            ProviderError::configuration(format!("invalid redirect path: {path}")).with_source(e)
        })?;
        Ok(joined.to_string())
    }

    /// Sets the credentials file path.
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = path.into();
        self
    }

    /// Sets the fallback client ID and secret.
    pub fn with_client_credentials(
        mut self,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        self.client_id = client_id;
        self.client_secret = client_secret;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Overrides the authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Overrides the Calendar API base URL.
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Sets the calendar bookings go to.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Path of the persisted OAuth state set.
    pub fn state_cache_path(&self) -> PathBuf {
        self.data_dir.join(STATE_CACHE_FILE)
    }

    /// Path of the persisted credential.
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    /// Resolves the OAuth client: credentials file first, then the
    /// configured client ID and secret.
    pub fn resolve_client_config(&self) -> ProviderResult<OAuthClientConfig> {
        if let Some(config) = OAuthClientConfig::from_file(&self.credentials_file)? {
            debug!(path = %self.credentials_file.display(), "using OAuth client from credentials file");
            return Ok(config);
        }
        OAuthClientConfig::from_parts(self.client_id.as_deref(), self.client_secret.as_deref())
            .ok_or_else(|| {
                ProviderError::configuration(
                    "Google OAuth config missing. Provide credentials.json via \
                     GOOGLE_CREDENTIALS_FILE or set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET.",
                )
            })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        let redirect = Url::parse(&self.redirect_uri).map_err(|e| {
            ProviderError::configuration(format!("invalid redirect URI: {}", self.redirect_uri))
                .with_source(e)
        })?;
        if !matches!(redirect.scheme(), "http" | "https") {
            return Err(ProviderError::configuration(format!(
                "redirect URI must be http or https: {}",
                self.redirect_uri
            )));
        }

        for (name, value) in [
            ("authorization URL", &self.auth_url),
            ("token URL", &self.token_url),
            ("calendar API base", &self.api_base),
        ] {
            Url::parse(value).map_err(|e| {
                ProviderError::configuration(format!("invalid {name}: {value}")).with_source(e)
            })?;
        }

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.calendar_id.trim().is_empty() {
            return Err(ProviderError::configuration("calendar id must not be empty"));
        }

        if self.timeout.is_zero() {
            return Err(ProviderError::configuration("timeout must be positive"));
        }

        Ok(())
    }
}
