//! Static schedule providers.

pub mod loader;
pub mod static_index;
pub mod stop_times;

pub use static_index::StaticIndex;
pub use stop_times::{EagerStopTimes, ScanStopTimes};

/// How stop times are held by a [`StaticIndex`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexMode {
    /// Whole stop_times table resident, indexed by stop and trip.
    /// Suited to long-running servers.
    #[default]
    Eager,
    /// Nothing resident; the table is scanned on every lookup.
    /// Suited to processes that answer a single query.
    Scan,
}
