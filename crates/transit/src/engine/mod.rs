//! The departure query engine.

pub mod query;
pub mod response;
pub mod window;

pub use query::DepartureQueryEngine;
pub use response::{ApiStop, Departure, DeparturesTimetable};
pub use window::{default_window, QueryWindow};
