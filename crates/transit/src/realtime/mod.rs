//! GTFS-RT feeds: decoding and the staleness-aware cache.

pub mod cache;
pub mod decode;

pub use cache::{RealtimeConfig, RealtimeFeedCache};
pub use decode::{DelayMap, OccupancyStatus, VehicleMap, VehiclePosition, VehicleState};
