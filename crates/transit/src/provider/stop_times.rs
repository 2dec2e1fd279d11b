//! The two [`StopTimeSource`] implementations.
//!
//! [`EagerStopTimes`] keeps the whole stop_times table resident, indexed by
//! stop and by trip. [`ScanStopTimes`] keeps nothing and re-reads the table
//! on every call, for processes that answer a single query.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::identifiers::*;
use crate::models::traits::StopTimeSource;
use crate::models::types::{Result, StopTime};
use crate::provider::loader::read_stop_times;

#[derive(Debug, Default)]
pub struct EagerStopTimes {
    by_stop: HashMap<StopIdentifier, Vec<Arc<StopTime>>>,
    by_trip: HashMap<TripIdentifier, Vec<Arc<StopTime>>>,
}

impl EagerStopTimes {
    pub fn load(root: &Path) -> Result<Self> {
        let mut stop_times = Vec::new();
        read_stop_times(root, |_, _| true, |stop_time| stop_times.push(stop_time))?;
        tracing::info!("Loaded {} stop times", stop_times.len());
        Ok(Self::from_stop_times(stop_times))
    }

    pub fn from_stop_times(stop_times: impl IntoIterator<Item = StopTime>) -> Self {
        let mut index = Self::default();
        for stop_time in stop_times {
            let stop_time = Arc::new(stop_time);
            index
                .by_stop
                .entry(stop_time.stop_id.clone())
                .or_default()
                .push(stop_time.clone());
            index
                .by_trip
                .entry(stop_time.trip_id.clone())
                .or_default()
                .push(stop_time);
        }
        index
    }
}

impl StopTimeSource for EagerStopTimes {
    fn for_stop(&self, stop_id: &StopIdentifier) -> Result<Vec<Arc<StopTime>>> {
        Ok(self.by_stop.get(stop_id).cloned().unwrap_or_default())
    }

    fn for_trip(&self, trip_id: &TripIdentifier) -> Result<Vec<Arc<StopTime>>> {
        Ok(self.by_trip.get(trip_id).cloned().unwrap_or_default())
    }

    fn for_stops(&self, stop_ids: &[StopIdentifier]) -> Result<Vec<Arc<StopTime>>> {
        Ok(stop_ids
            .iter()
            .filter_map(|stop_id| self.by_stop.get(stop_id))
            .flatten()
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct ScanStopTimes {
    root: PathBuf,
}

impl ScanStopTimes {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan(&self, mut keep: impl FnMut(&str, &str) -> bool) -> Result<Vec<Arc<StopTime>>> {
        let mut stop_times = Vec::new();
        read_stop_times(&self.root, &mut keep, |stop_time| {
            stop_times.push(Arc::new(stop_time))
        })?;
        Ok(stop_times)
    }
}

impl StopTimeSource for ScanStopTimes {
    fn for_stop(&self, stop_id: &StopIdentifier) -> Result<Vec<Arc<StopTime>>> {
        self.scan(|_, stop| stop == stop_id.as_str())
    }

    fn for_trip(&self, trip_id: &TripIdentifier) -> Result<Vec<Arc<StopTime>>> {
        self.scan(|trip, _| trip == trip_id.as_str())
    }

    fn for_stops(&self, stop_ids: &[StopIdentifier]) -> Result<Vec<Arc<StopTime>>> {
        let wanted: HashSet<&str> = stop_ids.iter().map(StopIdentifier::as_str).collect();
        self.scan(|_, stop| wanted.contains(stop))
    }
}
