//! # timetable-transit
//!
//! Realtime departure boards from a static GTFS snapshot and two GTFS-RT feeds.
//!
//! ## Features
//!
//! - **Static index**: stops, routes, trips and stop times, either resident or scanned per query
//! - **Exception calendars**: services run on the dates listed in calendar_dates.txt
//! - **Midnight-safe windows**: query windows may cross midnight, schedule times may exceed 24:00:00
//! - **Realtime overlay**: delays, positions and occupancy with independent staleness windows
//! - **Pluggable networking**: bring your own HTTP client through [`DataFetcher`]
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use timetable_transit::prelude::*;
//!
//! # async fn run(fetcher: Arc<dyn DataFetcher>) -> timetable_transit::Result<()> {
//! let realtime = Arc::new(RealtimeFeedCache::new(
//!     fetcher,
//!     RealtimeConfig::new("https://example.com/tripupdates.pb", "https://example.com/vehiclepositions.pb"),
//! ));
//! let engine = DepartureQueryEngine::open(Path::new("gtfs/sweden"), IndexMode::Eager, realtime)?;
//!
//! let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(8, 0, 0).unwrap();
//! let board = engine
//!     .create_departures_timetable(&StopIdentifier::new("9021012080000000"), start, start + chrono::TimeDelta::hours(2))
//!     .await?;
//! println!("{} departures", board.departures.len());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod identifiers;
pub mod models;
pub mod network;
pub mod provider;
pub mod realtime;
pub mod time;

// Re-exports for convenience
pub mod prelude {
    pub use crate::engine::{
        default_window, ApiStop, Departure, DepartureQueryEngine, DeparturesTimetable, QueryWindow,
    };
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, types::*, ServiceCalendar};
    pub use crate::network::traits::*;
    pub use crate::provider::{IndexMode, StaticIndex};
    pub use crate::realtime::{OccupancyStatus, RealtimeConfig, RealtimeFeedCache, VehiclePosition};
}

pub use prelude::*;
