//! Google Calendar booking: OAuth lifecycle, stores and orchestration.
//!
//! This crate turns a validated booking into a calendar event:
//!
//! - [`google::AuthorizationFlow`] - OAuth 2.0 authorization-code flow
//!   with persisted single-use state tokens and credential refresh
//! - [`google::GoogleCalendarClient`] - event insertion through
//!   [`CalendarApi`]
//! - [`BookingService`] - validate, authorize, create
//! - [`store::JsonFileStore`] - the locked, atomically replaced JSON files
//!   backing the state cache and the credential
//!
//! # Architecture
//!
//! ```text
//!   BookingRequest (untyped JSON)
//!          │
//!          ▼ voicebook_core::validate
//!   ValidatedBooking
//!          │
//!          ▼ BookingService::create_event
//! ┌──────────────────┐   ┌────────────────────────┐
//! │ AuthorizationFlow│──▶│ CredentialStore (.data)│
//! └────────┬─────────┘   └────────────────────────┘
//!          │ access token
//!          ▼
//! ┌──────────────────┐
//! │   CalendarApi    │──▶ Google Calendar API v3
//! └──────────────────┘
//! ```

pub mod booking;
pub mod calendar;
pub mod error;
pub mod google;
pub mod store;

// Re-export main types at crate root
pub use booking::{BookingError, BookingResult, BookingService};
pub use calendar::{CalendarApi, CreatedEvent, EventDateTime, NewEvent};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
