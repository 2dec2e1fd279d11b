//! Serializable results of a departure query.

use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::identifiers::StopIdentifier;
use crate::models::types::Stop;
use crate::realtime::{OccupancyStatus, VehiclePosition};

/// Public view of a stop
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiStop {
    pub id: StopIdentifier,
    pub name: Arc<str>,
    pub platform: Option<Arc<str>>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Stop> for ApiStop {
    fn from(stop: &Stop) -> Self {
        Self {
            id: stop.id.clone(),
            name: stop.name.clone(),
            platform: stop.platform_code.clone(),
            latitude: stop.latitude(),
            longitude: stop.longitude(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Departure {
    pub direction: Arc<str>,
    pub scheduled_departure_time: String,
    pub realtime_departure_time: String,
    pub stop: ApiStop,
    #[serde(rename = "type")]
    pub route_type: &'static str,
    pub route_long: Arc<str>,
    pub route_short: Arc<str>,
    /// Seconds, negative when early
    pub delay: i32,
    pub occupancy: OccupancyStatus,
    #[serde(serialize_with = "position_or_empty")]
    pub position: Option<VehiclePosition>,
}

/// The queried stop group and its departures, earliest first
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DeparturesTimetable {
    pub stops: Vec<ApiStop>,
    pub departures: Vec<Departure>,
}

// Clients expect `{}` rather than `null` when no vehicle is reporting.
fn position_or_empty<S: Serializer>(
    position: &Option<VehiclePosition>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match position {
        Some(position) => position.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}
