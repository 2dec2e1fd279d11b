//! Core traits for schedule data.
//!
//! These traits define the capability seams of the static index.
//! Implementations can be memory-resident or scan the source tables per call.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::types::{Result, StopTime};

/// Retrieval of stop-time records
///
/// Every returned record already carries its derived `departure_seconds`.
pub trait StopTimeSource: Send + Sync {
    /// All records at a single stop
    fn for_stop(&self, stop_id: &StopIdentifier) -> Result<Vec<Arc<StopTime>>>;

    /// All records of a single trip
    fn for_trip(&self, trip_id: &TripIdentifier) -> Result<Vec<Arc<StopTime>>>;

    /// All records at any of the given stops
    fn for_stops(&self, stop_ids: &[StopIdentifier]) -> Result<Vec<Arc<StopTime>>>;
}
