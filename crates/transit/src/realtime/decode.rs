//! Decoding GTFS-RT payloads into keyed lookup maps.

use std::collections::HashMap;

use gtfs_realtime::FeedMessage;
use prost::Message;
use serde::Serialize;

use crate::identifiers::TripIdentifier;
use crate::models::types::Result;

/// Delay in seconds per `(trip, stop_sequence)`. Absent keys mean no delay.
pub type DelayMap = HashMap<(TripIdentifier, u32), i32>;

/// Live vehicle data per trip. Absent keys mean no live data.
pub type VehicleMap = HashMap<TripIdentifier, VehicleState>;

/// GTFS-RT `OccupancyStatus`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyStatus {
    Empty,
    ManySeatsAvailable,
    FewSeatsAvailable,
    StandingRoomOnly,
    CrushedStandingRoomOnly,
    Full,
    NotAcceptingPassengers,
    #[default]
    Unknown,
}

impl OccupancyStatus {
    /// Map the feed's numeric code. Codes outside the seven categories are `Unknown`.
    pub fn from_gtfs_rt(value: i32) -> Self {
        match value {
            0 => Self::Empty,
            1 => Self::ManySeatsAvailable,
            2 => Self::FewSeatsAvailable,
            3 => Self::StandingRoomOnly,
            4 => Self::CrushedStandingRoomOnly,
            5 => Self::Full,
            6 => Self::NotAcceptingPassengers,
            _ => Self::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::ManySeatsAvailable => "MANY_SEATS_AVAILABLE",
            Self::FewSeatsAvailable => "FEW_SEATS_AVAILABLE",
            Self::StandingRoomOnly => "STANDING_ROOM_ONLY",
            Self::CrushedStandingRoomOnly => "CRUSHED_STANDING_ROOM_ONLY",
            Self::Full => "FULL",
            Self::NotAcceptingPassengers => "NOT_ACCEPTING_PASSENGERS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub latitude: f32,
    pub longitude: f32,
    pub bearing: f32,
    /// Kilometres per hour
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleState {
    pub position: Option<VehiclePosition>,
    pub occupancy: OccupancyStatus,
}

const MPS_TO_KMH: f32 = 3.6;

/// Decode a trip-updates feed
///
/// Entities without a trip update, and stop-time updates without a stop
/// sequence or departure delay, are ignored.
pub fn decode_delays(bytes: &[u8]) -> Result<DelayMap> {
    let feed = FeedMessage::decode(bytes)?;
    let mut delays = DelayMap::new();

    for entity in feed.entity {
        let Some(trip_update) = entity.trip_update else {
            continue;
        };
        let Some(trip_id) = trip_update.trip.trip_id else {
            continue;
        };
        let trip_id = TripIdentifier::new(trip_id);

        for update in trip_update.stop_time_update {
            let Some(stop_sequence) = update.stop_sequence else {
                continue;
            };
            let Some(delay) = update.departure.and_then(|departure| departure.delay) else {
                continue;
            };
            delays.insert((trip_id.clone(), stop_sequence), delay);
        }
    }

    Ok(delays)
}

/// Decode a vehicle-positions feed into position and occupancy per trip
///
/// Speed is converted from m/s to km/h here.
pub fn decode_vehicles(bytes: &[u8]) -> Result<VehicleMap> {
    let feed = FeedMessage::decode(bytes)?;
    let mut vehicles = VehicleMap::new();

    for entity in feed.entity {
        let Some(vehicle) = entity.vehicle else {
            continue;
        };
        let Some(trip_id) = vehicle.trip.and_then(|trip| trip.trip_id) else {
            continue;
        };

        let position = vehicle.position.map(|position| VehiclePosition {
            latitude: position.latitude,
            longitude: position.longitude,
            bearing: position.bearing.unwrap_or_default(),
            speed: position.speed.unwrap_or_default() * MPS_TO_KMH,
        });
        let occupancy = vehicle
            .occupancy_status
            .map(OccupancyStatus::from_gtfs_rt)
            .unwrap_or_default();

        vehicles.insert(TripIdentifier::new(trip_id), VehicleState { position, occupancy });
    }

    Ok(vehicles)
}
