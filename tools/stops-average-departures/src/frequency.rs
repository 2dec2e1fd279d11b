//! Departure counting over a whole feed period.

use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use timetable_transit::provider::loader::{self, open_table};
use timetable_transit::{ServiceCalendar, TripIdentifier};

pub const AVERAGE_COLUMN: &str = "avg_stop_times";

/// Average number of stop times per operating day, keyed by stop id
///
/// Operating days are the distinct dates mentioned anywhere in
/// calendar_dates.txt, removals included. A trip counts once for every date
/// its service is added on.
pub fn average_departures(root: &Path) -> Result<HashMap<String, f64>> {
    let exceptions = loader::load_calendar_dates(root)?;
    let operating_days = exceptions
        .iter()
        .map(|exception| exception.date)
        .collect::<HashSet<_>>()
        .len();
    log::info!("{operating_days} operating days found");

    let calendar = ServiceCalendar::from_exceptions(exceptions);

    let trips = loader::load_trips(root)?;
    let trip_frequency: HashMap<TripIdentifier, usize> = trips
        .into_iter()
        .map(|trip| {
            let runs = calendar.active_dates(&trip.service_id).len();
            (trip.id, runs)
        })
        .collect();
    log::info!("{} trips found", trip_frequency.len());

    let stop_frequency = count_stop_visits(root, &trip_frequency)?;
    log::info!("{} stops with traffic found", stop_frequency.len());

    if operating_days == 0 {
        log::warn!("calendar_dates.txt lists no dates, every average will be 0");
        return Ok(HashMap::new());
    }

    Ok(stop_frequency
        .into_iter()
        .map(|(stop_id, visits)| (stop_id, visits as f64 / operating_days as f64))
        .collect())
}

/// Sum of trip frequencies over every stop_times row, per stop
fn count_stop_visits(
    root: &Path,
    trip_frequency: &HashMap<TripIdentifier, usize>,
) -> Result<HashMap<String, usize>> {
    let (mut reader, headers) = open_table(root, loader::STOP_TIMES, &["trip_id", "stop_id"])?;
    let column = |name: &str| headers.iter().position(|header| header == name);
    let (Some(trip_column), Some(stop_column)) = (column("trip_id"), column("stop_id")) else {
        bail!("stop_times.txt lacks trip_id or stop_id");
    };

    let mut visits: HashMap<String, usize> = HashMap::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        let trip_id = record.get(trip_column).unwrap_or_default();
        let stop_id = record.get(stop_column).unwrap_or_default();

        let Some(runs) = trip_frequency.get(trip_id) else {
            bail!("stop_times.txt references unknown trip {trip_id}");
        };
        *visits.entry(stop_id.to_string()).or_default() += runs;
    }

    Ok(visits)
}

/// Round to four decimals, keeping at least one decimal digit
pub fn format_average(average: f64) -> String {
    let rounded = (average * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        rounded.to_string()
    }
}

/// Copy stops.txt from `root` to `output` with the average as an extra column
///
/// Stops without traffic get `0`. Returns the number of stops written.
pub fn write_stops_with_averages(
    root: &Path,
    output: &Path,
    averages: &HashMap<String, f64>,
) -> Result<usize> {
    let (mut reader, headers) = open_table(root, loader::STOPS, &["stop_id"])?;
    let Some(stop_column) = headers.iter().position(|header| header == "stop_id") else {
        bail!("stops.txt lacks stop_id");
    };

    let mut writer = csv::Writer::from_path(output)?;
    let mut out_headers = headers.clone();
    out_headers.push_field(AVERAGE_COLUMN);
    writer.write_record(&out_headers)?;

    let mut written = 0;
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        let average = record
            .get(stop_column)
            .and_then(|stop_id| averages.get(stop_id))
            .map(|average| format_average(*average))
            .unwrap_or_else(|| "0".to_string());

        let mut row: Vec<&str> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or_default())
            .collect();
        row.push(&average);
        writer.write_record(&row)?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}
