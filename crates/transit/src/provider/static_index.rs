//! In-memory index over a static schedule snapshot.
//!
//! Stops, routes and trips are always resident. Stop times go through a
//! [`StopTimeSource`] chosen when the index is opened.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};
use crate::provider::loader;
use crate::provider::stop_times::{EagerStopTimes, ScanStopTimes};
use crate::provider::IndexMode;

/// Lookup structures for one schedule snapshot
///
/// Immutable after construction and safe to share between concurrent queries.
pub struct StaticIndex {
    stops: HashMap<StopIdentifier, Arc<Stop>>,
    stations: Vec<Arc<Stop>>,
    children_by_parent: HashMap<StopIdentifier, Vec<Arc<Stop>>>,
    routes: HashMap<RouteIdentifier, Arc<Route>>,
    trips: HashMap<TripIdentifier, Arc<Trip>>,
    stop_times: Box<dyn StopTimeSource>,
}

impl StaticIndex {
    /// Load every table of the snapshot at `root`
    pub fn open(root: &Path, mode: IndexMode) -> Result<Self> {
        tracing::info!("Opening schedule snapshot at {}", root.display());

        let stops = loader::load_stops(root)?;
        let routes = loader::load_routes(root)?;
        let trips = loader::load_trips(root)?;

        let stop_times: Box<dyn StopTimeSource> = match mode {
            IndexMode::Eager => Box::new(EagerStopTimes::load(root)?),
            IndexMode::Scan => {
                tracing::warn!(
                    "Stop times are scanned per query. Memory use drops by up to 90%, at the cost of slower queries."
                );
                // Fail now rather than on the first query if the table is unusable
                loader::open_table(
                    root,
                    loader::STOP_TIMES,
                    &["trip_id", "stop_id", "stop_sequence", "departure_time"],
                )?;
                Box::new(ScanStopTimes::new(root))
            }
        };

        let index = Self::from_data(stops, routes, trips, stop_times);
        tracing::info!(
            "Indexed {} stops ({} stations), {} routes, {} trips",
            index.stops.len(),
            index.stations.len(),
            index.routes.len(),
            index.trips.len()
        );
        Ok(index)
    }

    /// Build the index from already parsed records
    pub fn from_data(
        stops: Vec<Stop>,
        routes: Vec<Route>,
        trips: Vec<Trip>,
        stop_times: Box<dyn StopTimeSource>,
    ) -> Self {
        let stops: Vec<Arc<Stop>> = stops.into_iter().map(Arc::new).collect();

        let stations = stops.iter().filter(|s| s.is_station()).cloned().collect();

        let mut children_by_parent: HashMap<StopIdentifier, Vec<Arc<Stop>>> = HashMap::new();
        for stop in &stops {
            if let Some(parent) = &stop.parent_station {
                children_by_parent
                    .entry(parent.clone())
                    .or_default()
                    .push(stop.clone());
            }
        }

        Self {
            stops: stops.into_iter().map(|s| (s.id.clone(), s)).collect(),
            stations,
            children_by_parent,
            routes: routes
                .into_iter()
                .map(|r| (r.id.clone(), Arc::new(r)))
                .collect(),
            trips: trips
                .into_iter()
                .map(|t| (t.id.clone(), Arc::new(t)))
                .collect(),
            stop_times,
        }
    }

    pub fn stop(&self, id: &StopIdentifier) -> Result<&Arc<Stop>> {
        self.stops
            .get(id)
            .ok_or_else(|| TransitError::StopNotFound(id.clone()))
    }

    /// Stops with location type station, in snapshot order
    pub fn all_stations(&self) -> &[Arc<Stop>] {
        &self.stations
    }

    /// Every stop whose parent station is `station_id`
    pub fn quays_of(&self, station_id: &StopIdentifier) -> &[Arc<Stop>] {
        self.children_by_parent
            .get(station_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn route(&self, id: &RouteIdentifier) -> Result<&Arc<Route>> {
        self.routes
            .get(id)
            .ok_or_else(|| TransitError::RouteNotFound(id.clone()))
    }

    pub fn trip(&self, id: &TripIdentifier) -> Result<&Arc<Trip>> {
        self.trips
            .get(id)
            .ok_or_else(|| TransitError::TripNotFound(id.clone()))
    }

    pub fn stop_times_for_stop(&self, stop_id: &StopIdentifier) -> Result<Vec<Arc<StopTime>>> {
        self.stop_times.for_stop(stop_id)
    }

    pub fn stop_times_for_trip(&self, trip_id: &TripIdentifier) -> Result<Vec<Arc<StopTime>>> {
        self.stop_times.for_trip(trip_id)
    }

    pub fn stop_times_for_stops(&self, stop_ids: &[StopIdentifier]) -> Result<Vec<Arc<StopTime>>> {
        self.stop_times.for_stops(stop_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    fn stop(id: &str, parent: Option<&str>, location_type: LocationType) -> Stop {
        Stop {
            id: StopIdentifier::new(id),
            name: "Test Stop".into(),
            platform_code: None,
            location: Point::new(18.0, 59.3),
            parent_station: parent.map(StopIdentifier::new),
            location_type,
        }
    }

    fn index() -> StaticIndex {
        StaticIndex::from_data(
            vec![
                stop("S", None, LocationType::Station),
                stop("Q1", Some("S"), LocationType::Quay),
                stop("Q2", Some("S"), LocationType::Quay),
                stop("Lone", None, LocationType::Quay),
            ],
            vec![Route {
                id: RouteIdentifier::new("R1"),
                short_name: "1".into(),
                long_name: "Ring line".into(),
                route_type: 700,
            }],
            vec![Trip {
                id: TripIdentifier::new("T1"),
                route_id: RouteIdentifier::new("R1"),
                service_id: ServiceIdentifier::new("SV1"),
                headsign: "Ring".into(),
            }],
            Box::new(EagerStopTimes::default()),
        )
    }

    #[test]
    fn test_empty_index() {
        let index = StaticIndex::from_data(vec![], vec![], vec![], Box::new(EagerStopTimes::default()));
        assert!(index.all_stations().is_empty());
        assert!(index.stop(&StopIdentifier::new("S")).is_err());
    }

    #[test]
    fn test_index_lookups() {
        let index = index();

        assert_eq!(index.stop(&StopIdentifier::new("Q1")).unwrap().parent_station, Some(StopIdentifier::new("S")));
        assert_eq!(index.route(&RouteIdentifier::new("R1")).unwrap().route_type, 700);
        assert_eq!(index.trip(&TripIdentifier::new("T1")).unwrap().service_id, ServiceIdentifier::new("SV1"));

        assert!(matches!(
            index.trip(&TripIdentifier::new("T9")),
            Err(TransitError::TripNotFound(_))
        ));
        assert!(matches!(
            index.route(&RouteIdentifier::new("R9")),
            Err(TransitError::RouteNotFound(_))
        ));
    }

    #[test]
    fn test_stop_hierarchy() {
        let index = index();

        let stations: Vec<_> = index.all_stations().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(stations, vec!["S"]);

        let quays: Vec<_> = index
            .quays_of(&StopIdentifier::new("S"))
            .iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(quays, vec!["Q1", "Q2"]);

        assert!(index.quays_of(&StopIdentifier::new("Lone")).is_empty());
    }
}
