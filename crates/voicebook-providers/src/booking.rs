//! Booking orchestration.
//!
//! Validation, credentials and the calendar call, in that order. A request
//! that fails validation never reaches the network.

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use voicebook_core::{BookingRequest, ValidationError, validate};

use crate::calendar::{CalendarApi, NewEvent};
use crate::error::ProviderError;
use crate::google::{AuthorizationFlow, GoogleCalendarClient};

/// Why a booking failed.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The request itself is wrong; the message is meant for the end user.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authorization, storage or the calendar call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl BookingError {
    /// Returns true if the operator must (re)connect the calendar.
    pub fn requires_authorization(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Provider(e) => e.code().requires_authorization(),
        }
    }
}

/// What a successful booking reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    pub event_id: String,
    pub event_link: String,
    pub attendee_name: String,
    pub starts_at: String,
    pub ends_at: String,
}

/// Books meetings into the configured calendar.
#[derive(Debug)]
pub struct BookingService<C = GoogleCalendarClient> {
    flow: AuthorizationFlow,
    calendar: C,
}

impl BookingService<GoogleCalendarClient> {
    /// Creates a service talking to Google Calendar.
    pub fn google(flow: AuthorizationFlow) -> Result<Self, ProviderError> {
        let calendar = GoogleCalendarClient::new(flow.config())?;
        Ok(Self::new(flow, calendar))
    }
}

impl<C: CalendarApi> BookingService<C> {
    /// Creates a service with an explicit calendar backend.
    pub fn new(flow: AuthorizationFlow, calendar: C) -> Self {
        Self { flow, calendar }
    }

    /// Returns the authorization flow.
    pub fn flow(&self) -> &AuthorizationFlow {
        &self.flow
    }

    /// Validates the request and creates the event.
    pub fn create_event(&self, raw: &BookingRequest) -> Result<BookingResult, BookingError> {
        let booking = validate(raw)?;
        let event = NewEvent::from_booking(&booking);

        let credential = self.flow.current_credentials()?;
        let access_token = credential.token.as_deref().ok_or_else(|| {
            ProviderError::internal("credential has no access token after refresh")
        })?;

        let calendar_id = &self.flow.config().calendar_id;
        let created = self
            .calendar
            .insert_event(access_token, calendar_id, &event)?;

        info!(
            event_id = %created.id,
            attendee = %booking.attendee_name,
            starts_at = %event.start.date_time,
            "booked meeting"
        );

        Ok(BookingResult {
            event_id: created.id,
            event_link: created.html_link,
            attendee_name: booking.attendee_name,
            starts_at: event.start.date_time,
            ends_at: event.end.date_time,
        })
    }
}
