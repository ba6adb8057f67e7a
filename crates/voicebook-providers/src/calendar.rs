//! Calendar API seam and event payloads.

use serde::{Deserialize, Serialize};
use voicebook_core::ValidatedBooking;

use crate::error::ProviderResult;

/// Creates events in a remote calendar.
///
/// Implemented by [`GoogleCalendarClient`](crate::google::GoogleCalendarClient);
/// tests substitute their own.
pub trait CalendarApi {
    /// Inserts `event` into `calendar_id` using the given bearer token.
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> ProviderResult<CreatedEvent>;
}

impl<T: CalendarApi + ?Sized> CalendarApi for &T {
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> ProviderResult<CreatedEvent> {
        (**self).insert_event(access_token, calendar_id, event)
    }
}

/// An event insert request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

/// Start or end of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// RFC 3339 timestamp with offset.
    pub date_time: String,
    /// IANA zone name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl NewEvent {
    /// Builds the insert body for a validated booking.
    pub fn from_booking(booking: &ValidatedBooking) -> Self {
        let at = |instant: String| EventDateTime {
            date_time: instant,
            time_zone: booking.timezone.clone(),
        };
        Self {
            summary: booking.summary.clone(),
            description: booking.description(),
            start: at(booking.start.to_rfc3339()),
            end: at(booking.end().to_rfc3339()),
        }
    }
}

/// The fields of a created event that callers need.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub id: String,
    #[serde(default)]
    pub html_link: String,
}
