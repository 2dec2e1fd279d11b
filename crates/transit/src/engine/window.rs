//! Time-window filtering of stop times.
//!
//! Stop times carry seconds since the start of their service day, which may
//! exceed 24h. A window is a pair of wall-clock timestamps at most one day
//! apart. Filtering compares only times of day and then picks the single
//! calendar date whose service must be active, so no schedule is ever
//! expanded across several days.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, Timelike, TimeDelta};

use crate::models::calendar::ServiceCalendar;
use crate::models::types::{Result, StopTime, TransitError};
use crate::provider::StaticIndex;
use crate::time::SECONDS_PER_DAY;

/// Window used when a caller does not give one: ten minutes back, two hours ahead
pub fn default_window(now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    (now - TimeDelta::minutes(10), now + TimeDelta::hours(2))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    start_secs: u32,
    end_secs: u32,
    crosses_midnight: bool,
}

impl QueryWindow {
    /// Requires `start < end` and a span shorter than one day
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start >= end {
            return Err(TransitError::InvalidWindow(format!(
                "start {start} is not before end {end}"
            )));
        }
        if end - start >= TimeDelta::days(1) {
            return Err(TransitError::InvalidWindow(format!(
                "{start} to {end} spans 24 hours or more"
            )));
        }

        Ok(Self {
            start,
            end,
            start_secs: start.time().num_seconds_from_midnight(),
            end_secs: end.time().num_seconds_from_midnight(),
            crosses_midnight: end.date() > start.date(),
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn crosses_midnight(&self) -> bool {
        self.crosses_midnight
    }

    /// Whether a departure time of day falls inside the window
    ///
    /// When the window crosses midnight its end time of day is smaller than
    /// its start, and the test wraps around. Departures at or past 24:00:00
    /// never satisfy any of the three cases.
    pub fn contains(&self, departure_seconds: u32) -> bool {
        let (start, end, time) = (self.start_secs, self.end_secs, departure_seconds);

        (start <= time && time < end)
            || (start > end && end > time)
            || (end < start && start <= time && time < SECONDS_PER_DAY)
    }

    /// The date on which a departure's service must run for it to fall in this window
    ///
    /// Times before 24:00:00 belong to the window's start date whichever side of
    /// midnight they land on. Times of 24:00:00 and later continue the previous
    /// service day.
    pub fn service_date(&self, departure_seconds: u32) -> Option<NaiveDate> {
        let start_date = self.start.date();

        if departure_seconds < SECONDS_PER_DAY {
            return Some(start_date);
        }

        let day_before = start_date.checked_sub_days(Days::new(1));
        if !self.crosses_midnight {
            return day_before;
        }
        if departure_seconds - SECONDS_PER_DAY >= self.start_secs {
            day_before
        } else {
            Some(start_date)
        }
    }
}

/// Keep the candidates inside the window whose service runs on the matching date
///
/// Order is preserved. The window test runs before any trip lookup.
pub fn filter_stop_times(
    window: &QueryWindow,
    candidates: Vec<Arc<StopTime>>,
    index: &StaticIndex,
    calendar: &ServiceCalendar,
) -> Result<Vec<Arc<StopTime>>> {
    let mut kept = Vec::new();

    for stop_time in candidates {
        if !window.contains(stop_time.departure_seconds) {
            continue;
        }

        let trip = index.trip(&stop_time.trip_id)?;
        let active = window
            .service_date(stop_time.departure_seconds)
            .is_some_and(|date| calendar.is_active(&trip.service_id, date));
        if active {
            kept.push(stop_time);
        }
    }

    Ok(kept)
}
