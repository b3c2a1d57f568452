//! Time and Timezone Utilities Module
//!
//! Time-of-day parsing, timezone selection, local-midnight resolution across
//! DST gaps, and duration formatting.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use iana_time_zone::get_timezone;
use log::warn;
use std::sync::OnceLock;
use tzf_rs::DefaultFinder;

// tzf-rs DefaultFinder is pre-compiled and very fast
static TZF_FINDER: OnceLock<DefaultFinder> = OnceLock::new();

// ===================== TIME PARSING =====================

/// Parse a time string in HH:MM[:SS[.fffffffff]] format.
///
/// # Arguments
/// * `s` - Time string to parse
///
/// # Returns
/// Tuple of (hours, minutes, seconds, nanoseconds)
///
/// # Errors
/// Returns an error if the time format is invalid
pub fn parse_time_ns(s: &str) -> Result<(u32, u32, u32, u32), Box<dyn std::error::Error>> {
    // %T is HH:MM:SS, %f is fractional seconds (up to nanoseconds)
    // We try multiple formats to be user-friendly
    let formats = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

    for fmt in formats {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Ok((t.hour(), t.minute(), t.second(), t.nanosecond()));
        }
    }
    Err("Invalid time format. Use HH:MM, HH:MM:SS, or HH:MM:SS.ns".into())
}

// ===================== TIMEZONE UTILITIES =====================

/// Get the system's configured timezone.
///
/// Falls back to UTC if the system timezone cannot be determined.
pub fn system_timezone() -> Tz {
    get_timezone().ok().and_then(|s| s.parse().ok()).unwrap_or(Tz::UTC)
}

/// Resolve timezone from geographic coordinates.
///
/// Uses a timezone finder to determine the appropriate timezone
/// for a given longitude and latitude.
///
/// # Arguments
/// * `lon` - Longitude in degrees
/// * `lat` - Latitude in degrees
///
/// # Returns
/// The resolved timezone, or UTC if resolution fails
pub fn resolve_timezone(lon: f64, lat: f64) -> Tz {
    let finder = TZF_FINDER.get_or_init(DefaultFinder::new);

    // Get the IANA string (e.g., "Pacific/Apia")
    let tzid = finder.get_tz_name(lon, lat);

    // Parse into chrono_tz::Tz to get historical correctness
    tzid.parse::<Tz>().unwrap_or(Tz::UTC)
}

/// Pick the timezone named on the command line.
///
/// # Arguments
/// * `name` - `"system"`, `"location"` or an IANA name
/// * `lon`, `lat` - Position used for `"location"`
///
/// # Returns
/// The timezone; unknown IANA names fall back to UTC with a warning
pub fn select_timezone(name: &str, lon: f64, lat: f64) -> Tz {
    match name {
        "system" => system_timezone(),
        "location" => resolve_timezone(lon, lat),
        other => other.parse().unwrap_or_else(|_| {
            warn!("unknown time zone {other:?}, using UTC");
            Tz::UTC
        }),
    }
}

// ===================== LOCAL DAY =====================

/// First instant of a local calendar day.
///
/// Midnight is tried first, then 01:00 for zones whose DST gap swallows
/// midnight. Ambiguous times take the earlier instant. If both hours are
/// missing the UTC midnight of that date is used.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    for hour in [0, 1] {
        let naive = date.and_time(NaiveTime::MIN) + chrono::Duration::hours(hour);
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => return t,
            LocalResult::None => continue,
        }
    }
    tz.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Resolve a wall-clock time on `date` to an instant.
///
/// Ambiguous times (DST fall back) take the earlier instant; nonexistent ones
/// (spring forward) are an error.
pub fn resolve_local(
    date: NaiveDate,
    (h, m, s, ns): (u32, u32, u32, u32),
    tz: &Tz,
) -> Result<DateTime<Tz>, Box<dyn std::error::Error>> {
    let naive = date.and_hms_nano_opt(h, m, s, ns).ok_or("Invalid time digits")?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t),
        LocalResult::Ambiguous(t1, t2) => {
            warn!(
                "{} is ambiguous (DST transition), using {} rather than {}",
                naive,
                t1.format("%H:%M:%S %Z"),
                t2.format("%H:%M:%S %Z")
            );
            Ok(t1)
        }
        LocalResult::None => {
            Err(format!("the time {} does not exist on {} (DST gap)", naive.time(), date).into())
        }
    }
}

// ===================== FORMATTING =====================

/// Format a duration in seconds as "Xh Ym Zs".
///
/// # Arguments
/// * `seconds` - Duration in seconds (can be negative, abs value is used)
///
/// # Returns
/// Formatted string like "5h 30m 45s"
pub fn format_hms(seconds: i64) -> String {
    let total_seconds = seconds.abs();
    if total_seconds == 0 {
        return "0s".to_string();
    }

    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;

    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    if s > 0 {
        parts.push(format!("{}s", s));
    }

    parts.join(" ")
}

// ===================== TESTS =====================
