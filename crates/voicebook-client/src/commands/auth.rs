//! Authorization commands.

use std::io::Write;

use tracing::{info, warn};
use voicebook_providers::google::AuthorizationFlow;

use crate::error::ClientResult;

/// Prints a consent URL, optionally opening it in the browser.
pub fn url(flow: &AuthorizationFlow, open_browser: bool, out: &mut dyn Write) -> ClientResult<()> {
    let (url, state) = flow.build_authorization_url()?;

    writeln!(out, "Open this URL to connect Google Calendar:")?;
    writeln!(out)?;
    writeln!(out, "{url}")?;
    writeln!(out)?;
    writeln!(out, "state: {state}")?;

    if open_browser {
        info!("opening browser for authorization");
        if let Err(e) = open::that(&url) {
            warn!(error = %e, "failed to open browser");
            writeln!(out, "Could not open a browser; copy the URL above.")?;
        }
    }
    Ok(())
}

/// Completes authorization with the code (and state) from the redirect.
pub fn callback(
    flow: &AuthorizationFlow,
    code: &str,
    state: Option<&str>,
    out: &mut dyn Write,
) -> ClientResult<()> {
    let credential = flow.exchange_code(code, state)?;

    info!("Google authorization successful");
    writeln!(out, "Google Calendar connected.")?;
    writeln!(
        out,
        "Credential saved to {}",
        flow.credential_store().path().display()
    )?;
    if credential.refresh_token.is_none() {
        writeln!(
            out,
            "No refresh token was returned; access stops when the token expires."
        )?;
    }
    Ok(())
}

/// Reports whether a usable credential is stored.
pub fn status(flow: &AuthorizationFlow, out: &mut dyn Write) -> ClientResult<()> {
    let Some(credential) = flow.credential_store().load() else {
        writeln!(out, "Google Calendar: not connected")?;
        writeln!(out, "Run `voicebook auth url` to connect.")?;
        return Ok(());
    };

    let connected = if credential.is_usable() {
        "connected"
    } else {
        "not connected"
    };
    writeln!(out, "Google Calendar: {connected}")?;
    writeln!(
        out,
        "  credential:    {}",
        flow.credential_store().path().display()
    )?;
    let refresh = if credential.refresh_token.is_some() {
        "present"
    } else {
        "absent"
    };
    writeln!(out, "  refresh token: {refresh}")?;
    match credential.expiry {
        Some(expiry) if credential.is_expired() => {
            writeln!(out, "  expires:       {} (expired)", expiry.to_rfc3339())?
        }
        Some(expiry) => writeln!(out, "  expires:       {}", expiry.to_rfc3339())?,
        None => writeln!(out, "  expires:       unknown")?,
    }
    writeln!(out, "  scopes:        {}", credential.scopes.join(" "))?;

    if !credential.has_scopes(&flow.config().scopes) {
        writeln!(
            out,
            "Stored credential lacks required scopes; run `voicebook auth url` again."
        )?;
    }
    Ok(())
}

/// Removes the stored credential.
pub fn logout(flow: &AuthorizationFlow, out: &mut dyn Write) -> ClientResult<()> {
    if flow.disconnect()? {
        writeln!(out, "Google Calendar disconnected.")?;
    } else {
        writeln!(out, "No stored credential.")?;
    }
    Ok(())
}
