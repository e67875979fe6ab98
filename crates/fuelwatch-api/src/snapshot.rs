//! Cache snapshot and scheduler state

use chrono::{DateTime, Local};
use fuelwatch_util::StationId;
use serde::{Deserialize, Serialize};

use crate::StationRecord;

/// The complete, atomically replaceable set of station records
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Stations in upstream order
    pub stations: Vec<StationRecord>,

    /// Freshness deadline promised by the last successful fetch.
    /// `None` until the first refresh succeeds.
    pub expiry: Option<DateTime<Local>>,

    /// Incremented on every successful refresh
    pub generation: u64,

    /// When the last successful refresh completed
    pub refreshed_at: Option<DateTime<Local>>,
}

impl CacheSnapshot {
    /// Snapshot with no stations and no deadline, expired by definition
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry,
            None => true,
        }
    }

    pub fn station(&self, id: StationId) -> Option<&StationRecord> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn station_mut(&mut self, id: StationId) -> Option<&mut StationRecord> {
        self.stations.iter_mut().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Observable state of the refresh scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulerState {
    /// Not started yet, or stopped
    Stopped,
    /// Waiting for the deadline or a manual trigger
    Idle { next_wake: DateTime<Local> },
    /// A refresh is in flight
    Refreshing,
}
