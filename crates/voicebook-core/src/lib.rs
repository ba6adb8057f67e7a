//! Core types: booking requests, validation, timezones, tracing

pub mod booking;
pub mod timezone;
pub mod tracing;

pub use booking::{
    BookingRequest, DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
    PAST_GRACE_MINUTES, ValidatedBooking, ValidationError, validate, validate_at,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
