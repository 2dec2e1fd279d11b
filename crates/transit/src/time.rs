//! Conversions between GTFS `hh:mm:ss` strings and seconds since midnight.
//!
//! GTFS times are relative to the start of the service day and the hour part
//! may exceed 23 for trips that run past midnight. Nothing in here wraps
//! such values back into a single day.

use crate::models::types::{Result, TransitError};

pub const SECONDS_PER_DAY: u32 = 24 * 3600;

/// Parse `hh:mm:ss` into seconds since midnight of the service day
///
/// The hour is unbounded: "25:10:00" parses to 90600.
pub fn seconds_since_midnight(time: &str) -> Result<u32> {
    let invalid = || TransitError::InvalidData(format!("Invalid time of day: {time:?}"));

    let mut parts = time.trim().splitn(3, ':');
    let mut next = || -> Result<u32> {
        parts
            .next()
            .and_then(|part| part.parse::<u32>().ok())
            .ok_or_else(invalid)
    };
    let (hours, minutes, seconds) = (next()?, next()?, next()?);

    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)
}

/// Format seconds since midnight as `hh:mm:ss`
///
/// Fields are zero-padded to two digits but never cut, so 90600 formats as "25:10:00".
pub fn format_seconds(total: u32) -> String {
    let (minutes, seconds) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Shift an `hh:mm:ss` time by a signed number of seconds
///
/// A result below zero is moved forward by one day. Results past 24:00:00
/// are left as they are.
pub fn add_seconds(time: &str, delta: i32) -> Result<String> {
    if delta == 0 {
        return Ok(time.to_string());
    }

    let mut total = i64::from(seconds_since_midnight(time)?) + i64::from(delta);
    if total < 0 {
        total += i64::from(SECONDS_PER_DAY);
    }

    let total = u32::try_from(total)
        .map_err(|_| TransitError::InvalidData(format!("Delay of {delta}s out of range for {time}")))?;
    Ok(format_seconds(total))
}
