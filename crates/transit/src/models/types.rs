//! Core data types and enums for schedule data.

use std::sync::Arc;

use chrono::NaiveDate;
use geo::Point;

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// Extended GTFS route types used by the departure boards
///
/// Only the codes present in the name table are recognised. Anything else is
/// reported as [`TransitError::UnknownRouteType`] when a departure is compiled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RouteType {
    Train = 100,
    Metro = 401,
    Bus = 700,
    OnDemand = 717,
    Tram = 900,
    Ferry = 1000,
}

impl RouteType {
    pub fn from_gtfs(value: u16) -> Option<Self> {
        match value {
            100 => Some(Self::Train),
            401 => Some(Self::Metro),
            700 => Some(Self::Bus),
            717 => Some(Self::OnDemand),
            900 => Some(Self::Tram),
            1000 => Some(Self::Ferry),
            _ => None,
        }
    }

    /// Display name shown on the departure board
    pub fn name(self) -> &'static str {
        match self {
            Self::Train => "TRAIN",
            Self::Metro => "METRO",
            Self::Bus => "BUS",
            Self::OnDemand => "FÖRBESTÄLLNINGSTRAFIK",
            Self::Tram => "TRAM",
            Self::Ferry => "FERRY",
        }
    }
}

/// GTFS `location_type` of a stop
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LocationType {
    /// A platform or quay. An empty `location_type` means this.
    #[default]
    Quay = 0,
    Station = 1,
    Entrance = 2,
    GenericNode = 3,
    BoardingArea = 4,
}

impl LocationType {
    pub fn from_gtfs(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Quay),
            1 => Some(Self::Station),
            2 => Some(Self::Entrance),
            3 => Some(Self::GenericNode),
            4 => Some(Self::BoardingArea),
            _ => None,
        }
    }
}

/// `exception_type` column of calendar_dates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExceptionType {
    Added = 1,
    Removed = 2,
}

impl ExceptionType {
    pub fn from_gtfs(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Added),
            2 => Some(Self::Removed),
            _ => None,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub id: StopIdentifier,
    pub name: Arc<str>,
    pub platform_code: Option<Arc<str>>,
    /// x = longitude, y = latitude
    pub location: Point,
    pub parent_station: Option<StopIdentifier>,
    pub location_type: LocationType,
}

impl Stop {
    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }

    pub fn is_station(&self) -> bool {
        self.location_type == LocationType::Station
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub id: RouteIdentifier,
    pub short_name: Arc<str>,
    pub long_name: Arc<str>,
    /// Raw GTFS code, mapped through [`RouteType::from_gtfs`] when needed
    pub route_type: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trip {
    pub id: TripIdentifier,
    pub route_id: RouteIdentifier,
    pub service_id: ServiceIdentifier,
    pub headsign: Arc<str>,
}

/// A single departure of a trip from a stop
///
/// `departure_seconds` is derived once from `departure_time` when the record
/// is read and is never wrapped: "25:10:00" is 90600, which still belongs to
/// the previous service day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: TripIdentifier,
    pub stop_id: StopIdentifier,
    pub stop_sequence: u32,
    pub departure_time: Box<str>,
    pub departure_seconds: u32,
    pub stop_headsign: Option<Arc<str>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceException {
    pub service_id: ServiceIdentifier,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Trip not found: {0}")]
    TripNotFound(TripIdentifier),

    #[error("Unknown route type: {0}")]
    UnknownRouteType(u16),

    #[error("Invalid query window: {0}")]
    InvalidWindow(String),

    #[error("Missing schedule table: {0}")]
    MissingTable(&'static str),

    #[error("Missing column {column} in {table}")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

pub type Result<T> = std::result::Result<T, TransitError>;
