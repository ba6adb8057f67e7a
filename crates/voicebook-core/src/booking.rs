//! Booking request validation.
//!
//! A [`BookingRequest`] is whatever the caller sent: a JSON object with
//! loosely typed, optional fields. [`validate`] turns it into a
//! [`ValidatedBooking`] whose fields are fully resolved, or reports the first
//! rule it breaks.
//!
//! Rules are checked in a fixed order so the error for a given payload is
//! deterministic:
//!
//! 1. attendee name (`meeting_with_name`, then `attendee_name`)
//! 2. `start_time_iso` present
//! 3. `timezone` present and known
//! 4. `duration_minutes` is an integer in `[5, 240]`
//! 5. `start_time_iso` parses as ISO-8601
//! 6. start is not more than two minutes in the past

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::timezone;

/// Shortest bookable meeting, in minutes.
pub const MIN_DURATION_MINUTES: i64 = 5;
/// Longest bookable meeting, in minutes.
pub const MAX_DURATION_MINUTES: i64 = 240;
/// Duration used when the request does not carry one.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;
/// How many minutes in the past a start time may be and still be accepted.
pub const PAST_GRACE_MINUTES: i64 = 2;

// `%#z` takes `+HH`, `+HHMM` and `+HH:MM`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
    "%Y%m%dT%H%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

/// Reasons a booking request is rejected.
///
/// The messages are shown to the end user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("meeting_with_name is required.")]
    MissingAttendee,

    #[error("start_time_iso is required.")]
    MissingStartTime,

    #[error("timezone is required and must be a valid IANA timezone.")]
    InvalidTimezone,

    #[error("duration_minutes must be an integer.")]
    DurationNotInteger,

    #[error("duration_minutes must be between 5 and 240.")]
    DurationOutOfRange(i64),

    #[error("start_time_iso must be a valid ISO-8601 datetime.")]
    InvalidStartTime,

    #[error("Meeting time is in the past. Please provide a future date and time.")]
    StartInPast,
}

/// Untyped booking input as received from the caller.
///
/// This is the only place where fields are looked up by name; everything
/// downstream works with [`ValidatedBooking`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingRequest(Map<String, Value>);

impl BookingRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a request from a JSON object string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builder: sets a raw field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value for a field, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a field as text. Strings are taken as-is, numbers and
    /// booleans are rendered; null, arrays and objects count as absent.
    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Like [`text`](Self::text) but trimmed, with empty results dropped.
    fn trimmed(&self, key: &str) -> Option<String> {
        self.text(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// First of `meeting_with_name` / `attendee_name` carrying a non-blank
    /// raw value, trimmed afterwards. `false` and zero count as blank.
    fn attendee(&self) -> String {
        ["meeting_with_name", "attendee_name"]
            .iter()
            .filter(|key| !self.0.get(**key).is_some_and(is_blank))
            .filter_map(|key| self.text(key))
            .find(|s| !s.is_empty())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn duration_minutes(&self) -> Result<i64, ValidationError> {
        match self.0.get("duration_minutes") {
            None => Ok(DEFAULT_DURATION_MINUTES),
            Some(value) => coerce_integer(value).ok_or(ValidationError::DurationNotInteger),
        }
    }
}

impl From<Map<String, Value>> for BookingRequest {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A booking request with every field resolved and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    /// Who the meeting is with.
    pub attendee_name: String,
    /// Event title.
    pub summary: String,
    /// Start instant, carrying the offset it was expressed in.
    pub start: DateTime<FixedOffset>,
    /// Length in minutes, within `[5, 240]`.
    pub duration_minutes: u32,
    /// IANA timezone name, when one was resolved.
    pub timezone: Option<String>,
}

impl ValidatedBooking {
    /// End instant (`start + duration`).
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Event description written to the calendar.
    pub fn description(&self) -> String {
        format!(
            "Booked by voice assistant. Meeting with {}.",
            self.attendee_name
        )
    }
}

/// Validates a raw request against the current time.
pub fn validate(raw: &BookingRequest) -> Result<ValidatedBooking, ValidationError> {
    validate_at(raw, Utc::now())
}

/// Validates a raw request, treating `now` as the current time.
pub fn validate_at(
    raw: &BookingRequest,
    now: DateTime<Utc>,
) -> Result<ValidatedBooking, ValidationError> {
    let attendee_name = raw.attendee();
    if attendee_name.is_empty() {
        return Err(ValidationError::MissingAttendee);
    }

    let start_text = raw
        .trimmed("start_time_iso")
        .ok_or(ValidationError::MissingStartTime)?;

    let timezone_name = timezone::normalize(raw.trimmed("timezone").as_deref())
        .ok_or(ValidationError::InvalidTimezone)?;

    let duration = raw.duration_minutes()?;
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
        return Err(ValidationError::DurationOutOfRange(duration));
    }
    let duration_minutes =
        u32::try_from(duration).map_err(|_| ValidationError::DurationOutOfRange(duration))?;

    let zone = timezone::resolve(&timezone_name).ok_or(ValidationError::InvalidTimezone)?;
    let start = parse_start(&start_text, zone).ok_or(ValidationError::InvalidStartTime)?;

    if start.with_timezone(&Utc) < now - Duration::minutes(PAST_GRACE_MINUTES) {
        return Err(ValidationError::StartInPast);
    }

    let summary = raw
        .trimmed("meeting_title")
        .unwrap_or_else(|| format!("Meeting with {attendee_name}"));

    Ok(ValidatedBooking {
        attendee_name,
        summary,
        start,
        duration_minutes,
        timezone: Some(timezone_name),
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Coerces a JSON value to an integer the way a lenient `int()` would.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(f64::trunc)
                .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parses an ISO-8601 start time. A trailing `Z` means UTC; times without
/// an offset are placed in `zone`.
fn parse_start(text: &str, zone: Tz) -> Option<DateTime<FixedOffset>> {
    let text = text.replace('Z', "+00:00");

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&text, format) {
            return Some(dt);
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
        .or_else(|| parse_hour_only(&text))
        .or_else(|| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    localize(naive, zone)
}

/// `2030-06-02T10` or `2030-06-02 10`: chrono always wants minutes.
fn parse_hour_only(text: &str) -> Option<NaiveDateTime> {
    if text.len() != 13 {
        return None;
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&format!("{text}:00"), format).ok())
}

/// Attaches `zone` to a wall-clock time. Ambiguous times resolve to the
/// earlier instant; times skipped by a DST gap keep the offset in force
/// before the gap.
fn localize(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<FixedOffset>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.fixed_offset()),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.fixed_offset()),
        LocalResult::None => {
            let before = zone
                .from_local_datetime(&(naive - Duration::hours(3)))
                .earliest()?;
            let offset = before.offset().fix();
            offset.from_local_datetime(&naive).single()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2030-06-01T12:00:00Z".parse().unwrap()
    }

    fn request() -> BookingRequest {
        BookingRequest::new()
            .with("meeting_with_name", "Ada")
            .with("start_time_iso", "2030-06-02T10:00:00")
            .with("timezone", "UTC")
            .with("duration_minutes", 30)
    }

    #[test]
    fn valid_request_resolves_every_field() {
        let booking = validate_at(&request(), now()).unwrap();
        assert_eq!(booking.attendee_name, "Ada");
        assert_eq!(booking.summary, "Meeting with Ada");
        assert_eq!(booking.duration_minutes, 30);
        assert_eq!(booking.timezone.as_deref(), Some("UTC"));
        assert_eq!(
            booking.start,
            DateTime::parse_from_rfc3339("2030-06-02T10:00:00+00:00").unwrap()
        );
        assert_eq!(
            booking.end(),
            DateTime::parse_from_rfc3339("2030-06-02T10:30:00+00:00").unwrap()
        );
    }

    #[test]
    fn end_to_end_example() {
        let raw = BookingRequest::from_json(
            r#"{"meeting_with_name":"Ada","start_time_iso":"2099-01-01T10:00:00",
                "timezone":"UTC","duration_minutes":30}"#,
        )
        .unwrap();
        let booking = validate(&raw).unwrap();
        assert_eq!(booking.summary, "Meeting with Ada");
        assert_eq!(
            booking.end().with_timezone(&Utc),
            "2099-01-01T10:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn attendee_name_falls_back_and_is_trimmed() {
        let raw = BookingRequest::new()
            .with("attendee_name", "  Grace  ")
            .with("start_time_iso", "2030-06-02T10:00:00")
            .with("timezone", "UTC");
        let booking = validate_at(&raw, now()).unwrap();
        assert_eq!(booking.attendee_name, "Grace");
        assert_eq!(booking.duration_minutes, 30);
    }

    #[test]
    fn whitespace_primary_name_does_not_fall_back() {
        let raw = request()
            .with("meeting_with_name", "   ")
            .with("attendee_name", "Grace");
        assert_eq!(
            validate_at(&raw, now()),
            Err(ValidationError::MissingAttendee)
        );
    }

    #[test]
    fn meeting_title_overrides_summary() {
        let raw = request().with("meeting_title", " Design review ");
        assert_eq!(validate_at(&raw, now()).unwrap().summary, "Design review");

        let blank = request().with("meeting_title", "   ");
        assert_eq!(
            validate_at(&blank, now()).unwrap().summary,
            "Meeting with Ada"
        );
    }

    #[test]
    fn rules_are_checked_in_order() {
        let empty = BookingRequest::new();
        assert_eq!(
            validate_at(&empty, now()),
            Err(ValidationError::MissingAttendee)
        );

        let no_start = BookingRequest::new()
            .with("meeting_with_name", "Ada")
            .with("duration_minutes", "abc");
        assert_eq!(
            validate_at(&no_start, now()),
            Err(ValidationError::MissingStartTime)
        );

        let bad_zone = request()
            .with("timezone", "Not/AZone")
            .with("duration_minutes", 1000);
        assert_eq!(
            validate_at(&bad_zone, now()),
            Err(ValidationError::InvalidTimezone)
        );

        let bad_duration = request()
            .with("duration_minutes", 1)
            .with("start_time_iso", "garbage");
        assert_eq!(
            validate_at(&bad_duration, now()),
            Err(ValidationError::DurationOutOfRange(1))
        );
    }

    #[test]
    fn missing_timezone_is_rejected() {
        let mut raw = request();
        raw.0.remove("timezone");
        assert_eq!(
            validate_at(&raw, now()),
            Err(ValidationError::InvalidTimezone)
        );
    }

    #[test]
    fn duration_bounds() {
        for ok in [5, 30, 240] {
            let raw = request().with("duration_minutes", ok);
            assert!(validate_at(&raw, now()).is_ok(), "{ok} should be accepted");
        }
        for bad in [-10, 0, 4, 241, 10_000] {
            let raw = request().with("duration_minutes", bad);
            let err = validate_at(&raw, now()).unwrap_err();
            assert_eq!(err, ValidationError::DurationOutOfRange(bad));
            assert_eq!(err.to_string(), "duration_minutes must be between 5 and 240.");
        }
    }

    #[test]
    fn duration_coercion() {
        let cases = [
            (json!("45"), Some(45)),
            (json!(" 60 "), Some(60)),
            (json!(45.9), Some(45)),
            (json!(true), Some(1)),
            (json!("4.5"), None),
            (json!("thirty"), None),
            (json!(null), None),
            (json!([30]), None),
            (json!({"minutes": 30}), None),
        ];
        for (value, expected) in cases {
            assert_eq!(coerce_integer(&value), expected, "coercing {value}");
        }

        let raw = request().with("duration_minutes", "thirty");
        let err = validate_at(&raw, now()).unwrap_err();
        assert_eq!(err, ValidationError::DurationNotInteger);
        assert_eq!(err.to_string(), "duration_minutes must be an integer.");
    }

    #[test]
    fn start_time_formats() {
        let accepted = [
            ("2030-06-02T10:00:00Z", "2030-06-02T10:00:00+00:00"),
            ("2030-06-02T10:00:00+02:00", "2030-06-02T10:00:00+02:00"),
            ("2030-06-02T10:00:00.250Z", "2030-06-02T10:00:00.250+00:00"),
            ("2030-06-02 10:00", "2030-06-02T10:00:00+00:00"),
            ("2030-06-02T10:00", "2030-06-02T10:00:00+00:00"),
            ("2030-06-02", "2030-06-02T00:00:00+00:00"),
            ("2030-06-02T10", "2030-06-02T10:00:00+00:00"),
            ("2030-06-02T10:00:00+02", "2030-06-02T10:00:00+02:00"),
            ("2030-06-02T10:00:00+0530", "2030-06-02T10:00:00+05:30"),
            ("20300602T100000", "2030-06-02T10:00:00+00:00"),
            ("20300602T100000Z", "2030-06-02T10:00:00+00:00"),
        ];
        for (input, expected) in accepted {
            let raw = request().with("start_time_iso", input);
            let booking = validate_at(&raw, now()).unwrap();
            assert_eq!(
                booking.start,
                DateTime::parse_from_rfc3339(expected).unwrap(),
                "parsing {input}"
            );
        }

        for rejected in ["tomorrow at ten", "2030-13-01T10:00:00", "10:00", "2030-06-02T25"] {
            let raw = request().with("start_time_iso", rejected);
            assert_eq!(
                validate_at(&raw, now()),
                Err(ValidationError::InvalidStartTime),
                "parsing {rejected}"
            );
        }
    }

    #[test]
    fn naive_start_uses_request_timezone() {
        let raw = request()
            .with("timezone", "America/New_York")
            .with("start_time_iso", "2030-06-02T10:00:00");
        let booking = validate_at(&raw, now()).unwrap();
        assert_eq!(booking.start.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(
            booking.start.with_timezone(&Utc),
            "2030-06-02T14:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(booking.timezone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn explicit_offset_is_kept_over_timezone() {
        let raw = request()
            .with("timezone", "America/New_York")
            .with("start_time_iso", "2030-06-02T10:00:00Z");
        let booking = validate_at(&raw, now()).unwrap();
        assert_eq!(booking.start.offset().local_minus_utc(), 0);
    }

    #[test]
    fn dst_edges_resolve_like_fold_zero() {
        // 01:30 happens twice on 2030-11-03 in New York; take the first (EDT).
        let ambiguous = request()
            .with("timezone", "America/New_York")
            .with("start_time_iso", "2030-11-03T01:30:00");
        let booking = validate_at(&ambiguous, now()).unwrap();
        assert_eq!(booking.start.offset().local_minus_utc(), -4 * 3600);

        // 02:30 does not exist on 2030-03-10; keep the pre-gap offset (EST).
        let skipped = request()
            .with("timezone", "America/New_York")
            .with("start_time_iso", "2030-03-10T02:30:00");
        let now = "2030-01-01T00:00:00Z".parse().unwrap();
        let booking = validate_at(&skipped, now).unwrap();
        assert_eq!(booking.start.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(
            booking.start.with_timezone(&Utc),
            "2030-03-10T07:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn past_start_respects_grace_window() {
        let at_boundary = request().with("start_time_iso", "2030-06-01T11:58:00Z");
        assert!(validate_at(&at_boundary, now()).is_ok());

        let just_past = request().with("start_time_iso", "2030-06-01T11:57:59Z");
        let err = validate_at(&just_past, now()).unwrap_err();
        assert_eq!(err, ValidationError::StartInPast);
        assert_eq!(
            err.to_string(),
            "Meeting time is in the past. Please provide a future date and time."
        );
    }

    #[test]
    fn past_check_uses_utc_instant() {
        // 13:00+02:00 is 11:00Z, an hour before `now`.
        let raw = request().with("start_time_iso", "2030-06-01T13:00:00+02:00");
        assert_eq!(
            validate_at(&raw, now()),
            Err(ValidationError::StartInPast)
        );
    }

    #[test]
    fn numeric_fields_are_coerced_to_text() {
        let raw = request().with("meeting_with_name", 42);
        assert_eq!(validate_at(&raw, now()).unwrap().attendee_name, "42");
    }

    #[test]
    fn falsy_primary_name_falls_back() {
        for blank in [json!(false), json!(0), json!(0.0)] {
            let raw = request()
                .with("meeting_with_name", blank.clone())
                .with("attendee_name", "Grace");
            assert_eq!(
                validate_at(&raw, now()).unwrap().attendee_name,
                "Grace",
                "primary {blank}"
            );
        }

        let raw = request().with("meeting_with_name", false);
        assert_eq!(
            validate_at(&raw, now()),
            Err(ValidationError::MissingAttendee)
        );
    }

    #[test]
    fn messages_in_rule_order() {
        let cases = [
            BookingRequest::new(),
            BookingRequest::new().with("meeting_with_name", "Ada"),
            request().with("timezone", "Not/AZone"),
            request().with("duration_minutes", "half an hour"),
            request().with("duration_minutes", 300),
            request().with("start_time_iso", "soon"),
            request().with("start_time_iso", "2030-06-01T11:00:00Z"),
        ];
        let messages: Vec<String> = cases
            .iter()
            .map(|raw| validate_at(raw, now()).unwrap_err().to_string())
            .collect();

        insta::assert_json_snapshot!(messages, @r###"
        [
          "meeting_with_name is required.",
          "start_time_iso is required.",
          "timezone is required and must be a valid IANA timezone.",
          "duration_minutes must be an integer.",
          "duration_minutes must be between 5 and 240.",
          "start_time_iso must be a valid ISO-8601 datetime.",
          "Meeting time is in the past. Please provide a future date and time."
        ]
        "###);
    }

    #[test]
    fn description_mentions_attendee() {
        let booking = validate_at(&request(), now()).unwrap();
        assert_eq!(
            booking.description(),
            "Booked by voice assistant. Meeting with Ada."
        );
    }

    #[test]
    fn request_round_trips_as_plain_object() {
        let raw = request();
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["meeting_with_name"], "Ada");
        assert_eq!(raw.get("duration_minutes"), Some(&json!(30)));
    }
}
