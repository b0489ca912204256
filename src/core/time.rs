// LogScope - core/time.rs
//
// Time normalisation for request bounds.
// Accepts ISO-8601-like strings with or without a zone and produces the
// canonical UTC form the backend range filter expects:
//   YYYY-MM-DDTHH:MM:SS[.ffffff]   (no zone marker)
// Inputs without a zone are wall-clock times at a fixed UTC+8 offset.

use crate::core::model::TimeRange;
use crate::util::constants::NAIVE_INPUT_UTC_OFFSET_SECS;
use crate::util::error::TimeParseError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Canonical output format without fractional seconds.
const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Canonical output format with microseconds.
const OUTPUT_FORMAT_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";

fn iso_pattern() -> &'static Regex {
    static ISO: OnceLock<Regex> = OnceLock::new();
    ISO.get_or_init(|| {
        // Groups: 1-3 date, 4-5 hour/minute, 6 second, 7 fraction, 8 zone.
        Regex::new(
            r"^(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,6}))?)?(Z|[+-]\d{2}:?\d{2})?)?$",
        )
        .expect("iso_pattern: invalid regex")
    })
}

/// Normalise a time string to canonical UTC.
///
/// - Empty input is returned unchanged (the caller treats it as "no bound").
/// - `Z`, `+HH:MM` and `+HHMM` suffixes are converted with standard offset
///   arithmetic.
/// - Naive input is taken as UTC+8 wall clock, so 8 hours are subtracted.
/// - Fractional seconds (up to 6 digits) are right-padded to microseconds and
///   only emitted when non-zero.
pub fn normalize(input: &str) -> Result<String, TimeParseError> {
    if input.is_empty() {
        return Ok(String::new());
    }
    let utc = parse_to_utc(input)?;
    Ok(format_utc(&utc))
}

/// Parse `input` and return the equivalent naive UTC datetime.
fn parse_to_utc(input: &str) -> Result<NaiveDateTime, TimeParseError> {
    let err = || TimeParseError {
        input: input.to_string(),
    };

    let caps = iso_pattern().captures(input.trim()).ok_or_else(err)?;
    let num = |i: usize| -> Result<u32, TimeParseError> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u32>().map_err(|_| err()),
            None => Ok(0),
        }
    };

    let year = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .ok_or_else(err)?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?).ok_or_else(err)?;

    let micros = match caps.get(7) {
        Some(m) => format!("{:0<6}", m.as_str()).parse::<u32>().map_err(|_| err())?,
        None => 0,
    };
    let time = NaiveTime::from_hms_micro_opt(num(4)?, num(5)?, num(6)?, micros).ok_or_else(err)?;
    let local = date.and_time(time);

    let offset_secs = match caps.get(8) {
        Some(zone) => parse_offset(zone.as_str()).ok_or_else(err)?,
        None => NAIVE_INPUT_UTC_OFFSET_SECS,
    };

    local
        .checked_sub_signed(Duration::seconds(i64::from(offset_secs)))
        .ok_or_else(err)
}

/// Parse `Z`, `+HH:MM`, `-HH:MM`, `+HHMM` or `-HHMM` into seconds east of UTC.
fn parse_offset(zone: &str) -> Option<i32> {
    if zone == "Z" {
        return Some(0);
    }
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3_600 + minutes * 60))
}

fn format_utc(utc: &NaiveDateTime) -> String {
    use chrono::Timelike;
    if utc.nanosecond() == 0 {
        utc.format(OUTPUT_FORMAT).to_string()
    } else {
        utc.format(OUTPUT_FORMAT_MICROS).to_string()
    }
}

/// Range used when a request names neither bound: from the start of the
/// current UTC+8 calendar day (expressed in UTC) onwards.
///
/// `now` is passed in so the boundary is computed per request and testable.
pub fn default_range(now: DateTime<Utc>) -> TimeRange {
    let offset = Duration::seconds(i64::from(NAIVE_INPUT_UTC_OFFSET_SECS));
    let local_midnight = (now.naive_utc() + offset).date().and_time(NaiveTime::MIN);
    TimeRange {
        gte: Some(format_utc(&(local_midnight - offset))),
        lte: None,
    }
}

/// Resolve the effective range for a request.
///
/// If either bound is present (and non-empty) only the present bounds are
/// normalised and used; otherwise `default_range(now)` applies.
pub fn effective_range(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TimeRange, TimeParseError> {
    let start = start.filter(|s| !s.is_empty());
    let end = end.filter(|s| !s.is_empty());

    if start.is_none() && end.is_none() {
        return Ok(default_range(now));
    }

    Ok(TimeRange {
        gte: start.map(normalize).transpose()?,
        lte: end.map(normalize).transpose()?,
    })
}
