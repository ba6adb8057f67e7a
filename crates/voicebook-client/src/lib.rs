//! CLI: settings, OAuth commands, booking
//!
//! This crate provides the `voicebook` command-line interface that the voice
//! assistant's operators use to connect Google Calendar and book meetings.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::Settings;
pub use error::{ClientError, ClientResult};
