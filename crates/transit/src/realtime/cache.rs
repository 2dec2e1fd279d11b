//! Lazily refreshed cache over the two realtime feeds.
//!
//! Delays and vehicle data age independently. A read that finds its map
//! stale refetches before answering; a failed refetch keeps serving the last
//! good map and leaves its timestamp alone, so the next read tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::identifiers::TripIdentifier;
use crate::models::types::Result;
use crate::network::traits::DataFetcher;
use crate::realtime::decode::*;

pub const DEFAULT_DELAY_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_POSITION_TTL: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    pub trip_updates_url: String,
    pub vehicle_positions_url: String,
    /// Maximum age of the delay map
    pub delay_ttl: Duration,
    /// Maximum age of the position and occupancy map
    pub position_ttl: Duration,
}

impl RealtimeConfig {
    pub fn new(trip_updates_url: impl Into<String>, vehicle_positions_url: impl Into<String>) -> Self {
        Self {
            trip_updates_url: trip_updates_url.into(),
            vehicle_positions_url: vehicle_positions_url.into(),
            delay_ttl: DEFAULT_DELAY_TTL,
            position_ttl: DEFAULT_POSITION_TTL,
        }
    }
}

struct Snapshot<T> {
    data: Arc<T>,
    refreshed_at: Instant,
}

impl<T> Snapshot<T> {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.refreshed_at.elapsed() > ttl
    }
}

pub struct RealtimeFeedCache {
    fetcher: Arc<dyn DataFetcher>,
    config: RealtimeConfig,
    delays: RwLock<Option<Snapshot<DelayMap>>>,
    vehicles: RwLock<Option<Snapshot<VehicleMap>>>,
}

impl RealtimeFeedCache {
    pub fn new(fetcher: Arc<dyn DataFetcher>, config: RealtimeConfig) -> Self {
        Self {
            fetcher,
            config,
            delays: RwLock::new(None),
            vehicles: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Fetch and decode the trip-updates feed, then swap it in
    ///
    /// The lock is only taken for the swap. On error nothing is replaced.
    pub async fn refresh_delays(&self) -> Result<Arc<DelayMap>> {
        let bytes = self.fetcher.fetch(&self.config.trip_updates_url).await?;
        let fresh = Arc::new(decode_delays(&bytes)?);
        debug!("Refreshed delays for {} stop visits", fresh.len());

        *self.delays.write().await = Some(Snapshot {
            data: Arc::clone(&fresh),
            refreshed_at: Instant::now(),
        });
        Ok(fresh)
    }

    /// Fetch and decode the vehicle-positions feed, then swap it in
    pub async fn refresh_vehicles(&self) -> Result<Arc<VehicleMap>> {
        let bytes = self.fetcher.fetch(&self.config.vehicle_positions_url).await?;
        let fresh = Arc::new(decode_vehicles(&bytes)?);
        debug!("Refreshed vehicle data for {} trips", fresh.len());

        *self.vehicles.write().await = Some(Snapshot {
            data: Arc::clone(&fresh),
            refreshed_at: Instant::now(),
        });
        Ok(fresh)
    }

    /// Current delay map, refreshed first if older than the delay TTL
    pub async fn delays(&self) -> Arc<DelayMap> {
        let cached = {
            let guard = self.delays.read().await;
            match guard.as_ref() {
                Some(snapshot) if !snapshot.is_stale(self.config.delay_ttl) => {
                    return Arc::clone(&snapshot.data)
                }
                other => other.map(|snapshot| Arc::clone(&snapshot.data)),
            }
        };

        match self.refresh_delays().await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Trip updates unavailable, serving last known delays: {e}");
                cached.unwrap_or_default()
            }
        }
    }

    /// Current vehicle map, refreshed first if older than the position TTL
    pub async fn vehicles(&self) -> Arc<VehicleMap> {
        let cached = {
            let guard = self.vehicles.read().await;
            match guard.as_ref() {
                Some(snapshot) if !snapshot.is_stale(self.config.position_ttl) => {
                    return Arc::clone(&snapshot.data)
                }
                other => other.map(|snapshot| Arc::clone(&snapshot.data)),
            }
        };

        match self.refresh_vehicles().await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Vehicle positions unavailable, serving last known positions: {e}");
                cached.unwrap_or_default()
            }
        }
    }

    /// Delay in seconds for a stop visit, 0 when unknown
    pub async fn delay_for(&self, trip_id: &TripIdentifier, stop_sequence: u32) -> i32 {
        self.delays()
            .await
            .get(&(trip_id.clone(), stop_sequence))
            .copied()
            .unwrap_or(0)
    }

    pub async fn position_for(&self, trip_id: &TripIdentifier) -> Option<VehiclePosition> {
        self.vehicles()
            .await
            .get(trip_id)
            .and_then(|state| state.position)
    }

    pub async fn occupancy_for(&self, trip_id: &TripIdentifier) -> OccupancyStatus {
        self.vehicles()
            .await
            .get(trip_id)
            .map(|state| state.occupancy)
            .unwrap_or_default()
    }
}
