//! Booking command.

use std::io::Write;

use voicebook_providers::{BookingService, CalendarApi};

use crate::cli::BookArgs;
use crate::error::ClientResult;

/// Books a meeting and prints the result as JSON.
pub fn book<C: CalendarApi>(
    service: &BookingService<C>,
    args: &BookArgs,
    out: &mut dyn Write,
) -> ClientResult<()> {
    let request = args.to_request()?;
    let result = service.create_event(&request)?;

    writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    Ok(())
}
