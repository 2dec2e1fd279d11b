//! Reading the GTFS text tables of an extracted schedule snapshot.
//!
//! Each table is validated for its required columns before the first row is
//! read, so an incomplete snapshot fails at startup rather than mid-query.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use geo::Point;
use serde::Deserialize;

use crate::identifiers::*;
use crate::models::types::*;
use crate::time::seconds_since_midnight;

pub const STOPS: &str = "stops";
pub const ROUTES: &str = "routes";
pub const TRIPS: &str = "trips";
pub const STOP_TIMES: &str = "stop_times";
pub const CALENDAR_DATES: &str = "calendar_dates";

const UTF8_BOM: char = '\u{feff}';

/// Open `<root>/<table>.txt` and check that every `required` column is present
pub fn open_table(
    root: &Path,
    table: &'static str,
    required: &[&'static str],
) -> Result<(Reader<File>, StringRecord)> {
    let path = root.join(format!("{table}.txt"));
    if !path.is_file() {
        return Err(TransitError::MissingTable(table));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&path)?;

    let headers: StringRecord = reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches(UTF8_BOM).trim())
        .collect();
    reader.set_headers(headers.clone());

    for column in required {
        if !headers.iter().any(|header| header == *column) {
            return Err(TransitError::MissingColumn { table, column });
        }
    }

    Ok((reader, headers))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required<'a>(table: &'static str, column: &'static str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TransitError::InvalidData(format!("Empty {column} in {table}")));
    }
    Ok(value)
}

// ============================================================================
// stops
// ============================================================================

#[derive(Deserialize)]
struct StopRow<'a> {
    stop_id: &'a str,
    #[serde(default, borrow)]
    stop_name: Option<&'a str>,
    #[serde(default, borrow)]
    platform_code: Option<&'a str>,
    #[serde(default)]
    stop_lat: Option<f64>,
    #[serde(default)]
    stop_lon: Option<f64>,
    #[serde(default, borrow)]
    parent_station: Option<&'a str>,
    #[serde(default)]
    location_type: Option<u8>,
}

pub fn load_stops(root: &Path) -> Result<Vec<Stop>> {
    let (mut reader, headers) = open_table(root, STOPS, &["stop_id"])?;
    let mut record = StringRecord::new();
    let mut stops = Vec::new();

    while reader.read_record(&mut record)? {
        let row: StopRow = record.deserialize(Some(&headers))?;
        let location_type = match row.location_type {
            None => LocationType::default(),
            Some(code) => LocationType::from_gtfs(code).ok_or_else(|| {
                TransitError::InvalidData(format!(
                    "Unknown location_type {code} for stop {}",
                    row.stop_id
                ))
            })?,
        };

        stops.push(Stop {
            id: StopIdentifier::new(required(STOPS, "stop_id", row.stop_id)?),
            name: non_empty(row.stop_name).unwrap_or_default().into(),
            platform_code: non_empty(row.platform_code).map(Arc::from),
            location: Point::new(row.stop_lon.unwrap_or_default(), row.stop_lat.unwrap_or_default()),
            parent_station: non_empty(row.parent_station).map(StopIdentifier::new),
            location_type,
        });
    }

    Ok(stops)
}

// ============================================================================
// routes
// ============================================================================

#[derive(Deserialize)]
struct RouteRow<'a> {
    route_id: &'a str,
    #[serde(default, borrow)]
    route_short_name: Option<&'a str>,
    #[serde(default, borrow)]
    route_long_name: Option<&'a str>,
    route_type: u16,
}

pub fn load_routes(root: &Path) -> Result<Vec<Route>> {
    let (mut reader, headers) = open_table(root, ROUTES, &["route_id", "route_type"])?;
    let mut record = StringRecord::new();
    let mut routes = Vec::new();

    while reader.read_record(&mut record)? {
        let row: RouteRow = record.deserialize(Some(&headers))?;
        routes.push(Route {
            id: RouteIdentifier::new(required(ROUTES, "route_id", row.route_id)?),
            short_name: non_empty(row.route_short_name).unwrap_or_default().into(),
            long_name: non_empty(row.route_long_name).unwrap_or_default().into(),
            route_type: row.route_type,
        });
    }

    Ok(routes)
}

// ============================================================================
// trips
// ============================================================================

#[derive(Deserialize)]
struct TripRow<'a> {
    trip_id: &'a str,
    route_id: &'a str,
    service_id: &'a str,
    #[serde(default, borrow)]
    trip_headsign: Option<&'a str>,
}

pub fn load_trips(root: &Path) -> Result<Vec<Trip>> {
    let (mut reader, headers) = open_table(root, TRIPS, &["trip_id", "route_id", "service_id"])?;
    let mut record = StringRecord::new();
    let mut trips = Vec::new();

    while reader.read_record(&mut record)? {
        let row: TripRow = record.deserialize(Some(&headers))?;
        trips.push(Trip {
            id: TripIdentifier::new(required(TRIPS, "trip_id", row.trip_id)?),
            route_id: RouteIdentifier::new(required(TRIPS, "route_id", row.route_id)?),
            service_id: ServiceIdentifier::new(required(TRIPS, "service_id", row.service_id)?),
            headsign: non_empty(row.trip_headsign).unwrap_or_default().into(),
        });
    }

    Ok(trips)
}

// ============================================================================
// calendar_dates
// ============================================================================

#[derive(Deserialize)]
struct CalendarDateRow<'a> {
    service_id: &'a str,
    date: &'a str,
    exception_type: u8,
}

pub fn load_calendar_dates(root: &Path) -> Result<Vec<ServiceException>> {
    let (mut reader, headers) =
        open_table(root, CALENDAR_DATES, &["service_id", "date", "exception_type"])?;
    let mut record = StringRecord::new();
    let mut exceptions = Vec::new();

    while reader.read_record(&mut record)? {
        let row: CalendarDateRow = record.deserialize(Some(&headers))?;
        let date = NaiveDate::parse_from_str(row.date.trim(), "%Y%m%d").map_err(|e| {
            TransitError::InvalidData(format!("Invalid date {:?} in calendar_dates: {e}", row.date))
        })?;
        let exception_type = ExceptionType::from_gtfs(row.exception_type).ok_or_else(|| {
            TransitError::InvalidData(format!("Unknown exception_type {}", row.exception_type))
        })?;

        exceptions.push(ServiceException {
            service_id: ServiceIdentifier::new(required(CALENDAR_DATES, "service_id", row.service_id)?),
            date,
            exception_type,
        });
    }

    Ok(exceptions)
}

// ============================================================================
// stop_times
// ============================================================================

#[derive(Deserialize)]
struct StopTimeRow<'a> {
    trip_id: &'a str,
    stop_id: &'a str,
    stop_sequence: u32,
    departure_time: &'a str,
    #[serde(default, borrow)]
    stop_headsign: Option<&'a str>,
}

/// Stream every stop_times row whose `(trip_id, stop_id)` passes `keep`
///
/// Departure seconds are derived only for kept rows. Rows without a
/// departure time (untimed intermediate stops) never depart and are skipped.
pub fn read_stop_times(
    root: &Path,
    mut keep: impl FnMut(&str, &str) -> bool,
    mut emit: impl FnMut(StopTime),
) -> Result<()> {
    let (mut reader, headers) = open_table(
        root,
        STOP_TIMES,
        &["trip_id", "stop_id", "stop_sequence", "departure_time"],
    )?;
    let mut record = StringRecord::new();
    let mut untimed = 0usize;

    while reader.read_record(&mut record)? {
        let row: StopTimeRow = record.deserialize(Some(&headers))?;
        let (trip_id, stop_id) = (row.trip_id.trim(), row.stop_id.trim());
        if !keep(trip_id, stop_id) {
            continue;
        }

        let departure_time = row.departure_time.trim();
        if departure_time.is_empty() {
            untimed += 1;
            continue;
        }

        emit(StopTime {
            trip_id: TripIdentifier::new(required(STOP_TIMES, "trip_id", trip_id)?),
            stop_id: StopIdentifier::new(required(STOP_TIMES, "stop_id", stop_id)?),
            stop_sequence: row.stop_sequence,
            departure_seconds: seconds_since_midnight(departure_time)?,
            departure_time: departure_time.into(),
            stop_headsign: non_empty(row.stop_headsign).map(Arc::from),
        });
    }

    if untimed > 0 {
        tracing::debug!("Skipped {untimed} stop times without a departure time");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, table: &str, contents: &str) {
        fs::write(dir.join(format!("{table}.txt")), contents).unwrap();
    }

    #[test]
    fn test_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_stops(dir.path()),
            Err(TransitError::MissingTable("stops"))
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "trips", "trip_id,route_id\nT1,R1\n");

        assert!(matches!(
            load_trips(dir.path()),
            Err(TransitError::MissingColumn { table: "trips", column: "service_id" })
        ));
    }

    #[test]
    fn test_load_stops_with_bom_and_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stops",
            "\u{feff}stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station,platform_code\n\
             S,Central,59.33,18.06,1,,\n\
             Q,Central,59.3301,18.0601,0,S,A\n\
             E,Central entrance,59.33,18.06,2,S,\n",
        );

        let stops = load_stops(dir.path()).unwrap();
        assert_eq!(stops.len(), 3);

        assert_eq!(stops[0].id, StopIdentifier::new("S"));
        assert!(stops[0].is_station());
        assert_eq!(stops[0].parent_station, None);

        assert_eq!(stops[1].parent_station, Some(StopIdentifier::new("S")));
        assert_eq!(stops[1].platform_code.as_deref(), Some("A"));
        assert_eq!(stops[1].location_type, LocationType::Quay);
        assert_eq!(stops[1].latitude(), 59.3301);

        assert_eq!(stops[2].location_type, LocationType::Entrance);
    }

    #[test]
    fn test_load_calendar_dates() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "calendar_dates",
            "service_id,date,exception_type\nSV1,20240110,1\nSV1,20240111,2\n",
        );

        let exceptions = load_calendar_dates(dir.path()).unwrap();
        assert_eq!(exceptions.len(), 2);
        assert_eq!(exceptions[0].date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(exceptions[1].exception_type, ExceptionType::Removed);
    }

    #[test]
    fn test_invalid_calendar_date() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "calendar_dates",
            "service_id,date,exception_type\nSV1,2024-01-10,1\n",
        );

        assert!(matches!(
            load_calendar_dates(dir.path()),
            Err(TransitError::InvalidData(_))
        ));
    }

    #[test]
    fn test_read_stop_times_filters_and_derives_seconds() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "stop_times",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence,stop_headsign\n\
             T1,08:04:00,08:05:00,Q,3,Airport\n\
             T1,,,X,4,\n\
             T2,25:29:00,25:30:00,Q,1,\n\
             T3,09:00:00,09:00:00,Z,1,\n",
        );

        let mut stop_times = Vec::new();
        read_stop_times(dir.path(), |_, stop_id| stop_id != "Z", |st| stop_times.push(st)).unwrap();

        assert_eq!(stop_times.len(), 2);
        assert_eq!(stop_times[0].departure_seconds, 29_100);
        assert_eq!(stop_times[0].stop_sequence, 3);
        assert_eq!(stop_times[0].stop_headsign.as_deref(), Some("Airport"));
        assert_eq!(&*stop_times[1].departure_time, "25:30:00");
        assert_eq!(stop_times[1].departure_seconds, 91_800);
        assert_eq!(stop_times[1].stop_headsign, None);
    }
}
