//! IANA timezone name normalization.

use chrono_tz::Tz;

/// Returns the timezone name unchanged if it is known, `None` otherwise.
///
/// Empty input and unknown names both yield `None`; it is up to the caller
/// to decide whether a missing timezone is an error. Lookups are
/// case-sensitive, matching the tz database file names.
pub fn normalize(value: Option<&str>) -> Option<String> {
    let value = value.filter(|v| !v.is_empty())?;
    if value == "UTC" {
        return Some(value.to_string());
    }
    resolve(value).map(|_| value.to_string())
}

/// Looks up a timezone in the bundled IANA database.
pub fn resolve(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}
