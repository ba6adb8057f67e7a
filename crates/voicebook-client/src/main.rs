//! voicebook CLI entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use voicebook_client::cli::{AuthAction, Cli, Command, ConfigAction};
use voicebook_client::commands;
use voicebook_client::error::ClientResult;
use voicebook_core::{TracingConfig, init_tracing};
use voicebook_providers::BookingService;
use voicebook_providers::google::AuthorizationFlow;

fn main() -> ExitCode {
    // A missing .env is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else if cli.json_logs {
        TracingConfig::json()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(&tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    if let Some(path) = dotenv {
        debug!(path = %path.display(), "loaded .env");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.requires_authorization() {
                eprintln!("hint: run `voicebook auth url` to connect Google Calendar");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ClientResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&cli.settings, &mut out)?,
            ConfigAction::Validate => commands::config::validate(&cli.settings, &mut out)?,
        },
        Command::Auth { action } => {
            let flow = AuthorizationFlow::new(cli.settings.google_config()?)?;
            match action {
                AuthAction::Url { open } => commands::auth::url(&flow, open, &mut out)?,
                AuthAction::Callback { code, state } => {
                    commands::auth::callback(&flow, &code, state.as_deref(), &mut out)?
                }
                AuthAction::Status => commands::auth::status(&flow, &mut out)?,
                AuthAction::Logout => commands::auth::logout(&flow, &mut out)?,
            }
        }
        Command::Book(args) => {
            let flow = AuthorizationFlow::new(cli.settings.google_config()?)?;
            let service = BookingService::google(flow)?;
            commands::book::book(&service, &args, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
