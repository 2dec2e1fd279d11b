use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use gtfs_realtime::trip_update::{StopTimeEvent, StopTimeUpdate};
use gtfs_realtime::{FeedEntity, FeedHeader, FeedMessage, TripDescriptor, TripUpdate};
use prost::Message;
use tempfile::TempDir;
use timetable_transit::prelude::*;

const TRIP_UPDATES: &str = "https://feeds.example/tripupdates.pb";
const VEHICLE_POSITIONS: &str = "https://feeds.example/vehiclepositions.pb";

fn write_snapshot(root: &Path) {
    let tables = [
        (
            "stops.txt",
            "\u{feff}stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station,platform_code\n\
             S,Central,59.33,18.06,1,,\n\
             Q,Central,59.331,18.061,0,S,A\n\
             Q2,Central,59.332,18.062,0,S,B\n\
             X,Depot,59.40,18.10,0,,\n",
        ),
        (
            "routes.txt",
            "route_id,route_short_name,route_long_name,route_type\n\
             R1,1,Ring line,700\n\
             R2,99,Mystery line,999\n",
        ),
        (
            "trips.txt",
            "route_id,service_id,trip_id,trip_headsign\n\
             R1,SV1,T1,Airport\n\
             R1,SV1,T2,Night\n\
             R1,SV2,T3,Airport\n\
             R1,SV1,T4,Airport\n\
             R1,SV1,T5,Night\n\
             R1,SV2,T6,Night\n\
             R1,SV1,T7,Night\n\
             R2,SV1,T9,Nowhere\n",
        ),
        (
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence,stop_headsign\n\
             T1,08:05:00,08:05:00,Q,3,\n\
             T2,25:30:00,25:30:00,Q,1,\n\
             T3,08:06:00,08:06:00,Q,1,\n\
             T4,08:02:00,08:02:00,Q2,1,Harbour\n\
             T4,08:20:00,,Q,2,\n\
             T5,00:30:00,00:30:00,Q,1,\n\
             T6,00:45:00,00:45:00,Q,1,\n\
             T7,23:30:00,23:30:00,Q,1,\n\
             T9,08:05:00,08:05:00,X,1,\n",
        ),
        (
            "calendar_dates.txt",
            "service_id,date,exception_type\n\
             SV1,20240110,1\n\
             SV2,20240111,1\n",
        ),
    ];

    for (name, contents) in tables {
        fs::write(root.join(name), contents).unwrap();
    }
}

/// Serves queued responses per URL and fails once a queue runs dry
#[derive(Default)]
struct ScriptedFetcher {
    responses: Mutex<HashMap<String, VecDeque<Result<Vec<u8>>>>>,
}

impl ScriptedFetcher {
    fn push(&self, url: &str, response: Result<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }
}

impl DataFetcher for ScriptedFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransitError::Fetch(format!("{url} is down"))));
        Box::pin(async move { response })
    }
}

fn delay_feed(trip_id: &str, stop_sequence: u32, delay: i32) -> Vec<u8> {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".into(),
            ..Default::default()
        },
        entity: vec![FeedEntity {
            id: "1".into(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some(trip_id.into()),
                    ..Default::default()
                },
                stop_time_update: vec![StopTimeUpdate {
                    stop_sequence: Some(stop_sequence),
                    departure: Some(StopTimeEvent {
                        delay: Some(delay),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }],
    }
    .encode_to_vec()
}

struct Fixture {
    _dir: TempDir,
    fetcher: Arc<ScriptedFetcher>,
    engine: DepartureQueryEngine,
}

fn fixture(mode: IndexMode) -> Fixture {
    let dir = TempDir::new().unwrap();
    write_snapshot(dir.path());

    let fetcher = Arc::new(ScriptedFetcher::default());
    let realtime = Arc::new(RealtimeFeedCache::new(
        fetcher.clone(),
        RealtimeConfig::new(TRIP_UPDATES, VEHICLE_POSITIONS),
    ));
    let engine = DepartureQueryEngine::open(dir.path(), mode, realtime).unwrap();

    Fixture {
        _dir: dir,
        fetcher,
        engine,
    }
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn stop(id: &str) -> StopIdentifier {
    StopIdentifier::new(id)
}

fn scheduled(board: &DeparturesTimetable) -> Vec<&str> {
    board
        .departures
        .iter()
        .map(|departure| departure.scheduled_departure_time.as_str())
        .collect()
}

#[tokio::test]
async fn test_departures_inside_the_window_are_sorted() {
    let f = fixture(IndexMode::Eager);
    f.fetcher.push(TRIP_UPDATES, Ok(delay_feed("T1", 3, 120)));

    let board = f
        .engine
        .create_departures_timetable(&stop("Q"), at(10, 8, 0), at(10, 8, 10))
        .await
        .unwrap();

    // T3 runs on the 11th only
    assert_eq!(scheduled(&board), vec!["08:02:00", "08:05:00"]);

    let first = &board.departures[0];
    assert_eq!(&*first.direction, "Harbour");
    assert_eq!(first.stop.id, stop("Q2"));
    assert_eq!(first.delay, 0);
    assert_eq!(first.realtime_departure_time, "08:02:00");

    let second = &board.departures[1];
    assert_eq!(&*second.direction, "Airport");
    assert_eq!(second.route_type, "BUS");
    assert_eq!(&*second.route_short, "1");
    assert_eq!(&*second.route_long, "Ring line");
    assert_eq!(second.delay, 120);
    assert_eq!(second.realtime_departure_time, "08:07:00");
    assert_eq!(second.occupancy, OccupancyStatus::Unknown);
    assert_eq!(second.position, None);

    let group: Vec<_> = board.stops.iter().map(|s| s.id.to_string()).collect();
    assert_eq!(group, vec!["S", "Q", "Q2"]);
}

#[tokio::test]
async fn test_window_end_is_exclusive() {
    let f = fixture(IndexMode::Eager);

    let board = f
        .engine
        .create_departures_timetable(&stop("Q"), at(10, 7, 0), at(10, 8, 0))
        .await
        .unwrap();

    assert!(board.departures.is_empty());
    assert_eq!(board.stops.len(), 3);
}

#[tokio::test]
async fn test_departures_past_midnight_are_not_returned() {
    let f = fixture(IndexMode::Eager);

    let board = f
        .engine
        .create_departures_timetable(&stop("Q"), at(11, 0, 0), at(11, 2, 0))
        .await
        .unwrap();

    // T2 at 25:30 on the 10th would be 01:30 on the 11th
    assert!(!scheduled(&board).contains(&"25:30:00"));
    assert_eq!(scheduled(&board), vec!["00:45:00"]);
}

#[tokio::test]
async fn test_window_across_midnight_uses_the_start_date() {
    let f = fixture(IndexMode::Eager);

    let board = f
        .engine
        .create_departures_timetable(&stop("Q"), at(10, 23, 0), at(11, 2, 0))
        .await
        .unwrap();

    // T5 runs on the 10th and is kept, T6 runs on the 11th only and is not
    assert_eq!(scheduled(&board), vec!["00:30:00", "23:30:00"]);
}

#[tokio::test]
async fn test_out_of_range_delay_keeps_the_scheduled_time() {
    let f = fixture(IndexMode::Eager);
    f.fetcher.push(TRIP_UPDATES, Ok(delay_feed("T5", 1, -100_000)));

    let board = f
        .engine
        .create_departures_timetable(&stop("Q"), at(10, 0, 0), at(10, 1, 0))
        .await
        .unwrap();

    assert_eq!(scheduled(&board), vec!["00:30:00"]);
    assert_eq!(board.departures[0].delay, -100_000);
    assert_eq!(board.departures[0].realtime_departure_time, "00:30:00");
}

#[tokio::test]
async fn test_quay_and_station_give_the_same_board() {
    let f = fixture(IndexMode::Eager);
    f.fetcher.push(TRIP_UPDATES, Ok(delay_feed("T1", 3, 120)));

    let from_quay = f
        .engine
        .create_departures_timetable(&stop("Q2"), at(10, 8, 0), at(10, 8, 30))
        .await
        .unwrap();
    let from_station = f
        .engine
        .create_departures_timetable(&stop("S"), at(10, 8, 0), at(10, 8, 30))
        .await
        .unwrap();

    assert_eq!(from_quay, from_station);
}

#[tokio::test]
async fn test_scan_mode_matches_eager_mode() {
    let eager = fixture(IndexMode::Eager);
    let scan = fixture(IndexMode::Scan);

    for (start, end) in [
        (at(10, 8, 0), at(10, 8, 10)),
        (at(10, 23, 0), at(11, 2, 0)),
        (at(11, 8, 0), at(11, 9, 0)),
    ] {
        let a = eager
            .engine
            .create_departures_timetable(&stop("S"), start, end)
            .await
            .unwrap();
        let b = scan
            .engine
            .create_departures_timetable(&stop("S"), start, end)
            .await
            .unwrap();
        assert_eq!(a, b, "{start} to {end}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_feed_outage_keeps_the_last_delays() {
    let f = fixture(IndexMode::Eager);
    f.fetcher.push(TRIP_UPDATES, Ok(delay_feed("T1", 3, 120)));

    let quay = stop("Q");
    let query = || {
        f.engine
            .create_departures_timetable(&quay, at(10, 8, 4), at(10, 8, 6))
    };

    let before = query().await.unwrap();
    assert_eq!(before.departures[0].realtime_departure_time, "08:07:00");

    // Stale now, and the next fetch fails
    tokio::time::advance(Duration::from_secs(61)).await;
    let after = query().await.unwrap();
    assert_eq!(after.departures[0].delay, 120);
    assert_eq!(after.departures[0].realtime_departure_time, "08:07:00");
}

#[tokio::test]
async fn test_unknown_route_type_fails_the_query() {
    let f = fixture(IndexMode::Eager);

    let result = f
        .engine
        .create_departures_timetable(&stop("X"), at(10, 8, 0), at(10, 8, 10))
        .await;

    assert!(matches!(result, Err(TransitError::UnknownRouteType(999))));
}

#[tokio::test]
async fn test_unknown_stop() {
    let f = fixture(IndexMode::Eager);

    let result = f
        .engine
        .create_departures_timetable(&stop("NOPE"), at(10, 8, 0), at(10, 8, 10))
        .await;

    assert!(matches!(result, Err(TransitError::StopNotFound(id)) if id == stop("NOPE")));
}

#[tokio::test]
async fn test_invalid_window() {
    let f = fixture(IndexMode::Eager);

    for (start, end) in [(at(10, 8, 0), at(10, 8, 0)), (at(10, 8, 0), at(11, 8, 0))] {
        let result = f
            .engine
            .create_departures_timetable(&stop("Q"), start, end)
            .await;
        assert!(matches!(result, Err(TransitError::InvalidWindow(_))));
    }
}

#[test]
fn test_only_stations_are_queryable() {
    let f = fixture(IndexMode::Eager);

    let stops = f.engine.list_queryable_stops();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].id, stop("S"));
    assert_eq!(&*stops[0].name, "Central");
}

#[test]
fn test_missing_table_fails_at_open() {
    let dir = TempDir::new().unwrap();
    write_snapshot(dir.path());
    fs::remove_file(dir.path().join("calendar_dates.txt")).unwrap();

    let realtime = Arc::new(RealtimeFeedCache::new(
        Arc::new(ScriptedFetcher::default()),
        RealtimeConfig::new(TRIP_UPDATES, VEHICLE_POSITIONS),
    ));
    let result = DepartureQueryEngine::open(dir.path(), IndexMode::Eager, realtime);

    assert!(matches!(result, Err(TransitError::MissingTable("calendar_dates"))));
}
