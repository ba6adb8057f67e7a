//! Subcommand implementations.
//!
//! Each command writes its user-facing output to the given writer and
//! returns errors for `main` to report.

pub mod auth;
pub mod book;
pub mod config;
