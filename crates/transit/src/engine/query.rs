//! Departure board queries against one schedule snapshot.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::engine::response::{ApiStop, Departure, DeparturesTimetable};
use crate::engine::window::{filter_stop_times, QueryWindow};
use crate::identifiers::StopIdentifier;
use crate::models::calendar::ServiceCalendar;
use crate::models::types::*;
use crate::provider::{loader, IndexMode, StaticIndex};
use crate::realtime::RealtimeFeedCache;
use crate::time::add_seconds;

/// Joins the static index, the service calendar and the realtime cache
///
/// Cheap to share: all state sits behind `Arc`s and queries only read it.
pub struct DepartureQueryEngine {
    index: Arc<StaticIndex>,
    calendar: Arc<ServiceCalendar>,
    realtime: Arc<RealtimeFeedCache>,
}

impl DepartureQueryEngine {
    pub fn new(
        index: Arc<StaticIndex>,
        calendar: Arc<ServiceCalendar>,
        realtime: Arc<RealtimeFeedCache>,
    ) -> Self {
        Self {
            index,
            calendar,
            realtime,
        }
    }

    /// Build the index and calendar from the snapshot at `root`
    pub fn open(root: &Path, mode: IndexMode, realtime: Arc<RealtimeFeedCache>) -> Result<Self> {
        let calendar = ServiceCalendar::from_exceptions(loader::load_calendar_dates(root)?);
        let index = StaticIndex::open(root, mode)?;
        Ok(Self::new(Arc::new(index), Arc::new(calendar), realtime))
    }

    pub fn index(&self) -> &StaticIndex {
        &self.index
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    /// Stations a user would search for. Quays and entrances are left out.
    pub fn list_queryable_stops(&self) -> Vec<ApiStop> {
        self.index
            .all_stations()
            .iter()
            .map(|stop| ApiStop::from(stop.as_ref()))
            .collect()
    }

    /// The station a stop belongs to, followed by every stop beneath it
    pub fn resolve_stop_group(&self, stop_id: &StopIdentifier) -> Result<Vec<StopIdentifier>> {
        let mut stop = self.index.stop(stop_id)?;
        if let Some(parent) = &stop.parent_station {
            stop = self.index.stop(parent)?;
        }

        Ok(std::iter::once(stop.id.clone())
            .chain(self.index.quays_of(&stop.id).iter().map(|quay| quay.id.clone()))
            .collect())
    }

    /// Departures from the stop group of `stop_id` in `[window_start, window_end)`
    pub async fn create_departures_timetable(
        &self,
        stop_id: &StopIdentifier,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<DeparturesTimetable> {
        let window = QueryWindow::new(window_start, window_end)?;

        debug!("Resolving stop group for {stop_id}");
        let group = self.resolve_stop_group(stop_id)?;

        debug!("Gathering stop times for {} stops", group.len());
        let candidates = self.index.stop_times_for_stops(&group)?;

        debug!("Filtering {} stop times", candidates.len());
        let mut stop_times = filter_stop_times(&window, candidates, &self.index, &self.calendar)?;
        stop_times.sort_by_key(|stop_time| stop_time.departure_seconds);

        self.compile(&group, &stop_times).await
    }

    async fn compile(
        &self,
        group: &[StopIdentifier],
        stop_times: &[Arc<StopTime>],
    ) -> Result<DeparturesTimetable> {
        debug!("Compiling {} departures", stop_times.len());
        let (delays, vehicles) = tokio::join!(self.realtime.delays(), self.realtime.vehicles());

        let mut departures = Vec::with_capacity(stop_times.len());
        for stop_time in stop_times {
            let trip = self.index.trip(&stop_time.trip_id)?;
            let route = self.index.route(&trip.route_id)?;
            let stop = self.index.stop(&stop_time.stop_id)?;
            let route_type = RouteType::from_gtfs(route.route_type)
                .ok_or(TransitError::UnknownRouteType(route.route_type))?;

            let delay = delays
                .get(&(trip.id.clone(), stop_time.stop_sequence))
                .copied()
                .unwrap_or(0);
            let vehicle = vehicles.get(&trip.id).copied().unwrap_or_default();
            let realtime_departure_time = add_seconds(&stop_time.departure_time, delay)
                .unwrap_or_else(|e| {
                    warn!("Ignoring delay for trip {}: {e}", trip.id);
                    stop_time.departure_time.to_string()
                });

            departures.push(Departure {
                direction: stop_time
                    .stop_headsign
                    .clone()
                    .unwrap_or_else(|| trip.headsign.clone()),
                scheduled_departure_time: stop_time.departure_time.to_string(),
                realtime_departure_time,
                stop: ApiStop::from(stop.as_ref()),
                route_type: route_type.name(),
                route_long: route.long_name.clone(),
                route_short: route.short_name.clone(),
                delay,
                occupancy: vehicle.occupancy,
                position: vehicle.position,
            });
        }

        let stops = group
            .iter()
            .map(|stop_id| self.index.stop(stop_id).map(|stop| ApiStop::from(stop.as_ref())))
            .collect::<Result<_>>()?;

        Ok(DeparturesTimetable { stops, departures })
    }
}
