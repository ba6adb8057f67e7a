//! OAuth credential storage.
//!
//! A single [`StoredCredential`] is kept on disk as JSON. Reading never
//! fails: a missing or corrupt file means "not connected".

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ProviderResult;
use crate::store::JsonFileStore;

use super::config::GOOGLE_TOKEN_URL;

/// Credentials are treated as expired this many seconds before the real
/// expiry so a token never lapses mid-request.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// The persisted OAuth credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// The access token for API requests.
    #[serde(default)]
    pub token: Option<String>,

    /// The refresh token for obtaining new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Token endpoint used for refreshes.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    /// OAuth client the credential was issued to.
    pub client_id: String,

    /// Secret of that OAuth client.
    pub client_secret: String,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the access token expires, if known.
    #[serde(default, with = "expiry_format")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// RFC 3339 on write. On read a naive timestamp is also accepted and taken
/// as UTC, which is how some OAuth libraries persist `expiry`.
mod expiry_format {
    use super::*;
    use serde::de::Error as _;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(expiry) => {
                serializer.serialize_some(&expiry.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).ok_or_else(|| D::Error::custom(format!("invalid expiry: {s}"))))
            .transpose()
    }

    fn parse(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }
}

impl StoredCredential {
    /// Computes an absolute expiry from a token endpoint `expires_in`.
    pub fn expiry_from(expires_in_secs: Option<i64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        expires_in_secs.map(|secs| now + Duration::seconds(secs))
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Same as [`is_expired`](Self::is_expired) with an explicit clock.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            // No expiry recorded: the provider did not tell us, assume valid.
            None => false,
        }
    }

    /// Returns true if the access token is missing or expired.
    pub fn needs_refresh(&self) -> bool {
        self.token.is_none() || self.is_expired()
    }

    /// Returns true if a token usable for the connection exists.
    pub fn is_usable(&self) -> bool {
        self.token.is_some() || self.refresh_token.is_some()
    }

    /// Returns true if the credential has all the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// File-backed store for the single [`StoredCredential`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    store: JsonFileStore<StoredCredential>,
}

impl CredentialStore {
    /// Creates a credential store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonFileStore::new(path),
        }
    }

    /// Returns the credential file path.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Loads the stored credential, if any.
    pub fn load(&self) -> Option<StoredCredential> {
        self.store.load()
    }

    /// Persists the credential, replacing any previous one.
    pub fn save(&self, credential: &StoredCredential) -> ProviderResult<()> {
        self.store.save(credential)?;
        info!(path = %self.path().display(), "saved OAuth credential");
        Ok(())
    }

    /// Removes the stored credential. Returns whether one existed.
    pub fn clear(&self) -> ProviderResult<bool> {
        let removed = self.store.clear()?;
        if removed {
            info!(path = %self.path().display(), "cleared OAuth credential");
        }
        Ok(removed)
    }
}
