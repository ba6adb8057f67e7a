//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use voicebook_core::BookingRequest;

use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

/// voicebook - book calendar meetings for a voice assistant
#[derive(Debug, Parser)]
#[command(name = "voicebook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, conflicts_with = "debug")]
    pub json_logs: bool,

    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Google Calendar authorization
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Book a meeting
    Book(BookArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authorization actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Print a consent URL bound to a fresh state token
    Url {
        /// Also open the URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Complete authorization with the code from the redirect
    Callback {
        /// Authorization code from the redirect
        #[arg(long)]
        code: String,

        /// State from the redirect
        #[arg(long)]
        state: Option<String>,
    },

    /// Show whether a credential is stored and usable
    Status,

    /// Remove the stored credential
    Logout,
}

/// Booking payload, either as flags or as raw JSON.
#[derive(Debug, Default, Args)]
pub struct BookArgs {
    /// Who the meeting is with
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub name: Option<String>,

    /// Event title (defaults to "Meeting with <name>")
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub title: Option<String>,

    /// Start time, ISO-8601
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub start: Option<String>,

    /// IANA timezone, e.g. Europe/Paris
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub timezone: Option<String>,

    /// Duration in minutes (5 to 240, default 30)
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub duration: Option<String>,

    /// Raw JSON booking object
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,

    /// File holding a raw JSON booking object
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl BookArgs {
    /// Builds the untyped request handed to the validator.
    pub fn to_request(&self) -> ClientResult<BookingRequest> {
        if let Some(ref json) = self.json {
            return parse_request(json);
        }
        if let Some(ref path) = self.file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ClientError::Input(format!("failed to read {}: {}", path.display(), e))
            })?;
            return parse_request(&content);
        }

        let fields = [
            ("meeting_with_name", &self.name),
            ("meeting_title", &self.title),
            ("start_time_iso", &self.start),
            ("timezone", &self.timezone),
            ("duration_minutes", &self.duration),
        ];
        Ok(fields
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
            .fold(BookingRequest::new(), |request, (key, value)| {
                request.with(key, value.as_str())
            }))
    }
}

fn parse_request(json: &str) -> ClientResult<BookingRequest> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(BookingRequest::from(map)),
        Ok(_) => Err(ClientError::Input("expected a JSON object".to_string())),
        Err(e) => Err(ClientError::Input(e.to_string())),
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current settings (secrets redacted)
    Dump,

    /// Validate settings and OAuth client configuration
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_auth_callback() {
        let cli = Cli::try_parse_from([
            "voicebook",
            "auth",
            "callback",
            "--code",
            "abc",
            "--state",
            "xyz",
        ])
        .unwrap();
        match cli.command {
            Command::Auth {
                action: AuthAction::Callback { code, state },
            } => {
                assert_eq!(code, "abc");
                assert_eq!(state.as_deref(), Some("xyz"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_override_environment_settings() {
        let cli = Cli::try_parse_from([
            "voicebook",
            "--base-url",
            "https://voice.example.com",
            "--calendar-id",
            "team@example.com",
            "--debug",
            "config",
            "dump",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.settings.base_url, "https://voice.example.com");
        assert_eq!(cli.settings.calendar_id, "team@example.com");
    }

    #[test]
    fn json_and_flags_conflict() {
        let result = Cli::try_parse_from(["voicebook", "book", "--json", "{}", "--name", "Ada"]);
        assert!(result.is_err());
    }

    #[test]
    fn debug_and_json_logs_conflict() {
        let result =
            Cli::try_parse_from(["voicebook", "--debug", "--json-logs", "auth", "status"]);
        assert!(result.is_err());
    }

    #[test]
    fn request_from_flags() {
        let args = BookArgs {
            name: Some("Ada".into()),
            start: Some("2099-01-01T10:00:00".into()),
            timezone: Some("UTC".into()),
            duration: Some("45".into()),
            ..BookArgs::default()
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.get("meeting_with_name"), Some(&json!("Ada")));
        assert_eq!(request.get("duration_minutes"), Some(&json!("45")));
        assert_eq!(request.get("meeting_title"), None);
    }

    #[test]
    fn request_from_json() {
        let args = BookArgs {
            json: Some(r#"{"attendee_name": "Grace", "duration_minutes": 30}"#.into()),
            ..BookArgs::default()
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.get("attendee_name"), Some(&json!("Grace")));
        assert_eq!(request.get("duration_minutes"), Some(&json!(30)));
    }

    #[test]
    fn request_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("booking.json");
        std::fs::write(&path, r#"{"meeting_with_name": "Ada"}"#).unwrap();

        let args = BookArgs {
            file: Some(path),
            ..BookArgs::default()
        };
        assert_eq!(
            args.to_request().unwrap().get("meeting_with_name"),
            Some(&json!("Ada"))
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let args = BookArgs {
            json: Some("[1, 2]".into()),
            ..BookArgs::default()
        };
        assert!(matches!(args.to_request(), Err(ClientError::Input(_))));

        let args = BookArgs {
            json: Some("{".into()),
            ..BookArgs::default()
        };
        assert!(matches!(args.to_request(), Err(ClientError::Input(_))));
    }
}
