//! Station cache with atomic snapshot replacement

use chrono::{DateTime, Local};
use fuelwatch_api::{CacheSnapshot, StationRecord};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Holder of the current [`CacheSnapshot`].
///
/// Readers get an immutable `Arc` handle and never block a refresh for
/// longer than a pointer clone. A refresh swaps the whole snapshot; the
/// reminder tick edits a copy-on-write clone under the write lock. The lock
/// is never held across an `.await`.
#[derive(Debug, Default)]
pub struct CacheStore {
    current: RwLock<Arc<CacheSnapshot>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<CacheSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the station set and expiry in one swap
    pub fn replace(
        &self,
        stations: Vec<StationRecord>,
        expiry: DateTime<Local>,
        refreshed_at: DateTime<Local>,
    ) -> Arc<CacheSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let next = Arc::new(CacheSnapshot {
            stations,
            expiry: Some(expiry),
            generation: guard.generation + 1,
            refreshed_at: Some(refreshed_at),
        });
        *guard = Arc::clone(&next);

        debug!(
            generation = next.generation,
            station_count = next.stations.len(),
            "Snapshot replaced"
        );
        next
    }

    /// Edit the current snapshot in place.
    ///
    /// Handles already given out keep seeing the previous version.
    pub fn modify<R>(&self, f: impl FnOnce(&mut CacheSnapshot) -> R) -> R {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut guard))
    }
}
