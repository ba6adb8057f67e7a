//! OAuth 2.0 authorization-code flow for Google APIs.
//!
//! # Flow Overview
//!
//! 1. [`AuthorizationFlow::build_authorization_url`] mints a state token,
//!    persists it, and returns the consent URL
//! 2. The user grants access; Google redirects to the configured
//!    redirect URI with `code` and `state`
//! 3. [`AuthorizationFlow::exchange_code`] spends the state and trades the
//!    code for tokens, which are persisted
//! 4. [`AuthorizationFlow::current_credentials`] hands out the stored
//!    credential, refreshing it first when it has expired
//!
//! The flow itself holds no state between calls. Outstanding state tokens
//! live in the [`StateTokenCache`], the credential in the
//! [`CredentialStore`].

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthClientConfig};
use super::state::StateTokenCache;
use super::tokens::{CredentialStore, StoredCredential};

/// Drives authorization against Google's OAuth endpoints.
#[derive(Debug)]
pub struct AuthorizationFlow {
    config: GoogleConfig,
    states: StateTokenCache,
    credentials: CredentialStore,
    http_client: reqwest::blocking::Client,
}

impl AuthorizationFlow {
    /// Creates a flow using the stores under the configured data directory.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        let states = StateTokenCache::new(config.state_cache_path());
        let credentials = CredentialStore::new(config.token_path());
        Self::with_stores(config, states, credentials)
    }

    /// Creates a flow with explicit stores.
    pub fn with_stores(
        config: GoogleConfig,
        states: StateTokenCache,
        credentials: CredentialStore,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            config,
            states,
            credentials,
            http_client,
        })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Returns the state token cache.
    pub fn state_cache(&self) -> &StateTokenCache {
        &self.states
    }

    /// Returns the credential store.
    pub fn credential_store(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Resolves the OAuth client from the credentials file or settings.
    pub fn resolve_client_config(&self) -> ProviderResult<OAuthClientConfig> {
        self.config.resolve_client_config()
    }

    /// Builds the consent URL. Returns `(url, state)`.
    ///
    /// This is the only place state tokens are minted.
    pub fn build_authorization_url(&self) -> ProviderResult<(String, String)> {
        let client = self.resolve_client_config()?;
        let state = self.states.allocate()?;
        let scope = self.config.scopes.join(" ");
        let separator = if self.config.auth_url.contains('?') { '&' } else { '?' };

        let url = format!(
            "{}{}client_id={}&redirect_uri={}&response_type=code&scope={}&\
            access_type=offline&include_granted_scopes=true&prompt=consent&state={}",
            self.config.auth_url,
            separator,
            urlencoding::encode(&client.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&state),
        );

        info!(redirect_uri = %self.config.redirect_uri, "built authorization URL");
        Ok((url, state))
    }

    /// Exchanges an authorization code for tokens and stores them.
    ///
    /// A non-empty `state` must be an outstanding token; it is spent
    /// before the token endpoint is contacted. Nothing is stored unless
    /// the exchange succeeds.
    pub fn exchange_code(&self, code: &str, state: Option<&str>) -> ProviderResult<StoredCredential> {
        let client = self.resolve_client_config()?;

        if let Some(state) = state.filter(|s| !s.is_empty()) {
            if !self.states.consume(state)? {
                warn!("rejected OAuth callback with unknown state");
                return Err(ProviderError::invalid_state("Invalid OAuth state."));
            }
        } else {
            debug!("OAuth callback without state");
        }

        let params = [
            ("code", code),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self.post_token_form(&self.config.token_url, &params, "token exchange")?;

        let scopes = response
            .granted_scopes()
            .unwrap_or_else(|| self.config.scopes.clone());
        let credential = StoredCredential {
            token: Some(response.access_token),
            refresh_token: response.refresh_token,
            token_uri: self.config.token_url.clone(),
            client_id: client.client_id,
            client_secret: client.client_secret,
            scopes,
            expiry: StoredCredential::expiry_from(response.expires_in, Utc::now()),
        };

        self.credentials.save(&credential)?;
        info!(
            has_refresh_token = credential.refresh_token.is_some(),
            "successfully obtained tokens"
        );
        Ok(credential)
    }

    /// Returns true if a credential with an access or refresh token is
    /// stored.
    pub fn is_connected(&self) -> bool {
        self.credentials
            .load()
            .is_some_and(|credential| credential.is_usable())
    }

    /// Returns a credential that is valid for API calls.
    ///
    /// An expired credential is refreshed once and persisted before it is
    /// returned. Without a refresh token an expired credential is reported
    /// as not connected.
    pub fn current_credentials(&self) -> ProviderResult<StoredCredential> {
        let mut credential = self.credentials.load().ok_or_else(|| {
            ProviderError::not_connected("Google Calendar is not connected. Complete OAuth first.")
        })?;

        if !credential.needs_refresh() {
            return Ok(credential);
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(ProviderError::not_connected(
                "Google Calendar access has expired. Complete OAuth again.",
            ));
        };

        let params = [
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token_form(&credential.token_uri, &params, "token refresh")?;

        if let Some(scopes) = response.granted_scopes() {
            credential.scopes = scopes;
        }
        credential.token = Some(response.access_token);
        credential.expiry = StoredCredential::expiry_from(response.expires_in, Utc::now());
        if let Some(rotated) = response.refresh_token {
            credential.refresh_token = Some(rotated);
        }

        self.credentials.save(&credential)?;
        info!("successfully refreshed access token");
        Ok(credential)
    }

    /// Forgets the stored credential. Returns whether one existed.
    pub fn disconnect(&self) -> ProviderResult<bool> {
        self.credentials.clear()
    }

    /// POSTs a form to a token endpoint and decodes the answer.
    fn post_token_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        context: &str,
    ) -> ProviderResult<TokenResponse> {
        debug!(url, "{context} request");

        let response = self
            .http_client
            .post(url)
            .form(params)
            .send()
            .map_err(|e| ProviderError::from_transport(context, e))?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            ProviderError::network(format!("{context}: failed to read response")).with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::token_exchange(format!(
                "{context} failed ({status}): {}",
                body.trim()
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {context} response")).with_source(e)
        })
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Scopes the endpoint says it granted, if it said.
    fn granted_scopes(&self) -> Option<Vec<String>> {
        let scopes: Vec<String> = self
            .scope
            .as_deref()?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        (!scopes.is_empty()).then_some(scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use std::fs;

    fn flow(dir: &tempfile::TempDir) -> AuthorizationFlow {
        // Nothing listens here; tests below must fail before any request.
        let config = GoogleConfig::new("http://localhost:3000/auth/google/callback")
            .with_credentials_file(dir.path().join("credentials.json"))
            .with_client_credentials(Some("client-id".into()), Some("client-secret".into()))
            .with_data_dir(dir.path().join(".data"))
            .with_token_url("http://127.0.0.1:9/token");
        AuthorizationFlow::new(config).unwrap()
    }

    fn query_param(url: &str, name: &str) -> Option<String> {
        let parsed = url::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn authorization_url_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        let (url, state) = flow.build_authorization_url().unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(query_param(&url, "client_id").as_deref(), Some("client-id"));
        assert_eq!(
            query_param(&url, "redirect_uri").as_deref(),
            Some("http://localhost:3000/auth/google/callback")
        );
        assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(
            query_param(&url, "scope").as_deref(),
            Some("https://www.googleapis.com/auth/calendar.events")
        );
        assert_eq!(query_param(&url, "access_type").as_deref(), Some("offline"));
        assert_eq!(
            query_param(&url, "include_granted_scopes").as_deref(),
            Some("true")
        );
        assert_eq!(query_param(&url, "prompt").as_deref(), Some("consent"));
        assert_eq!(query_param(&url, "state"), Some(state.clone()));
        assert!(flow.state_cache().contains(&state));
    }

    #[test]
    fn custom_authorization_endpoint_keeps_its_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = flow(&dir)
            .config()
            .clone()
            .with_auth_url("https://sso.example.com/authorize?tenant=acme");
        let flow = AuthorizationFlow::new(config).unwrap();
        let (url, state) = flow.build_authorization_url().unwrap();

        assert!(url.starts_with("https://sso.example.com/authorize?tenant=acme&"));
        assert_eq!(query_param(&url, "tenant").as_deref(), Some("acme"));
        assert_eq!(query_param(&url, "state"), Some(state));
    }

    #[test]
    fn each_url_gets_a_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        let (_, first) = flow.build_authorization_url().unwrap();
        let (_, second) = flow.build_authorization_url().unwrap();
        assert_ne!(first, second);
        assert_eq!(flow.state_cache().len(), 2);
    }

    #[test]
    fn missing_client_config_mints_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = GoogleConfig::new("http://localhost:3000/cb")
            .with_credentials_file(dir.path().join("missing.json"))
            .with_data_dir(dir.path().join(".data"));
        let flow = AuthorizationFlow::new(config).unwrap();

        let err = flow.build_authorization_url().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert!(flow.state_cache().is_empty());
    }

    #[test]
    fn unknown_state_is_rejected_without_storing() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        flow.build_authorization_url().unwrap();

        let err = flow.exchange_code("code", Some("forged")).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidState);
        assert_eq!(err.message(), "Invalid OAuth state.");
        assert_eq!(flow.state_cache().len(), 1);
        assert!(flow.credential_store().load().is_none());
    }

    #[test]
    fn not_connected_without_credential() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        assert!(!flow.is_connected());
        let err = flow.current_credentials().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotConnected);
    }

    #[test]
    fn corrupt_credential_is_not_connected() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        fs::create_dir_all(dir.path().join(".data")).unwrap();
        fs::write(flow.credential_store().path(), "garbage").unwrap();
        assert!(!flow.is_connected());
        assert_eq!(
            flow.current_credentials().unwrap_err().code(),
            ProviderErrorCode::NotConnected
        );
    }

    #[test]
    fn valid_credential_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        let credential = StoredCredential {
            token: Some("live".into()),
            refresh_token: None,
            token_uri: "http://127.0.0.1:9/token".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            scopes: vec![],
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
        };
        flow.credential_store().save(&credential).unwrap();

        assert!(flow.is_connected());
        assert_eq!(flow.current_credentials().unwrap(), credential);
    }

    #[test]
    fn expired_without_refresh_token_is_not_connected() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        let credential = StoredCredential {
            token: Some("stale".into()),
            refresh_token: None,
            token_uri: "http://127.0.0.1:9/token".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            scopes: vec![],
            expiry: Some(Utc::now() - chrono::Duration::hours(1)),
        };
        flow.credential_store().save(&credential).unwrap();

        let err = flow.current_credentials().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotConnected);
    }

    #[test]
    fn disconnect_removes_credential() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow(&dir);
        assert!(!flow.disconnect().unwrap());
        flow.credential_store()
            .save(&StoredCredential {
                token: Some("t".into()),
                refresh_token: None,
                token_uri: "http://127.0.0.1:9/token".into(),
                client_id: "c".into(),
                client_secret: "s".into(),
                scopes: vec![],
                expiry: None,
            })
            .unwrap();
        assert!(flow.disconnect().unwrap());
        assert!(!flow.is_connected());
    }

    #[test]
    fn granted_scopes_parsing() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "scope": "s1  s2"}"#).unwrap();
        assert_eq!(
            response.granted_scopes(),
            Some(vec!["s1".to_string(), "s2".to_string()])
        );

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "scope": " "}"#).unwrap();
        assert_eq!(response.granted_scopes(), None);
    }
}
