//! Configuration commands.

use std::io::Write;

use voicebook_providers::google::OAuthClientConfig;

use crate::config::Settings;
use crate::error::ClientResult;

/// Dumps the effective settings, secrets redacted.
pub fn dump(settings: &Settings, out: &mut dyn Write) -> ClientResult<()> {
    writeln!(out, "{}", settings.to_redacted_json()?)?;
    writeln!(out, "redirect_uri: {}", settings.redirect_uri()?)?;
    Ok(())
}

/// Validates settings and that an OAuth client can be resolved.
pub fn validate(settings: &Settings, out: &mut dyn Write) -> ClientResult<()> {
    let config = settings.google_config()?;

    let OAuthClientConfig { client_id, .. } = config.resolve_client_config()?;
    writeln!(out, "OAuth client: {client_id}")?;
    writeln!(out, "Redirect URI: {}", config.redirect_uri)?;
    writeln!(out, "Configuration is valid.")?;
    Ok(())
}
