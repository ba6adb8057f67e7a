//! Process settings.
//!
//! Every setting comes from a CLI flag, the environment, or `.env` (loaded
//! into the environment before parsing), in that order of precedence.
//! Settings are read once at startup and turned into a [`GoogleConfig`];
//! nothing below the CLI reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use serde::{Serialize, Serializer};

use voicebook_providers::google::GoogleConfig;

use crate::error::{ClientError, ClientResult};

/// Process-wide settings.
#[derive(Debug, Clone, Args, Serialize)]
pub struct Settings {
    /// Port the voice assistant's web server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Public base URL of the deployment
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Path of the OAuth callback, joined onto the base URL
    #[arg(
        long,
        env = "GOOGLE_REDIRECT_PATH",
        default_value = "/auth/google/callback"
    )]
    pub google_redirect_path: String,

    /// Speech-to-text API key of the voice front end
    #[arg(long, env = "DEEPGRAM_API_KEY", hide_env_values = true)]
    #[serde(serialize_with = "redact")]
    pub deepgram_api_key: Option<String>,

    /// OAuth client ID, used when the credentials file has none
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// OAuth client secret, used when the credentials file has none
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    #[serde(serialize_with = "redact")]
    pub google_client_secret: Option<String>,

    /// Google Cloud Console credentials JSON file
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE", default_value = "credentials.json")]
    pub google_credentials_file: PathBuf,

    /// Directory for the OAuth state cache and stored credential
    #[arg(long, env = "VOICEBOOK_DATA_DIR", default_value = ".data")]
    pub data_dir: PathBuf,

    /// Calendar that bookings are written to
    #[arg(long, env = "VOICEBOOK_CALENDAR_ID", default_value = "primary")]
    pub calendar_id: String,

    /// Timeout for outbound HTTP requests, in seconds
    #[arg(long, env = "VOICEBOOK_HTTP_TIMEOUT", default_value_t = GoogleConfig::DEFAULT_TIMEOUT_SECS)]
    pub http_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            google_redirect_path: "/auth/google/callback".to_string(),
            deepgram_api_key: None,
            google_client_id: None,
            google_client_secret: None,
            google_credentials_file: PathBuf::from(GoogleConfig::DEFAULT_CREDENTIALS_FILE),
            data_dir: PathBuf::from(GoogleConfig::DEFAULT_DATA_DIR),
            calendar_id: GoogleConfig::DEFAULT_CALENDAR_ID.to_string(),
            http_timeout: GoogleConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Shows whether a secret is set without showing it.
fn redact<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match non_empty(value.as_deref()) {
        Some(_) => serializer.serialize_str("<redacted>"),
        None => serializer.serialize_none(),
    }
}

/// Trims a value and drops it if nothing is left.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Settings {
    /// The OAuth redirect URI: base URL joined with the redirect path.
    pub fn redirect_uri(&self) -> ClientResult<String> {
        Ok(GoogleConfig::join_redirect_uri(
            self.base_url.trim(),
            self.google_redirect_path.trim(),
        )?)
    }

    /// Builds and validates the provider configuration.
    pub fn google_config(&self) -> ClientResult<GoogleConfig> {
        let calendar_id = self.calendar_id.trim();
        if calendar_id.is_empty() {
            return Err(ClientError::Config(
                "VOICEBOOK_CALENDAR_ID must not be empty".to_string(),
            ));
        }

        let config = GoogleConfig::new(self.redirect_uri()?)
            .with_credentials_file(&self.google_credentials_file)
            .with_client_credentials(
                non_empty(self.google_client_id.as_deref()).map(str::to_string),
                non_empty(self.google_client_secret.as_deref()).map(str::to_string),
            )
            .with_data_dir(&self.data_dir)
            .with_calendar_id(calendar_id)
            .with_timeout(Duration::from_secs(self.http_timeout));
        config.validate()?;
        Ok(config)
    }

    /// Settings as pretty JSON with secrets redacted.
    pub fn to_redacted_json(&self) -> ClientResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
