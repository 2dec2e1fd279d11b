//! Schedule data models, types, and traits.

pub mod calendar;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use calendar::ServiceCalendar;
pub use traits::StopTimeSource;
pub use types::{
    ExceptionType, LocationType, Result, Route, RouteType, ServiceException, Stop, StopTime,
    TransitError, Trip,
};
