//! Registry of outstanding low-fuel reminders

use chrono::{DateTime, Local};
use fuelwatch_util::StationId;
use std::collections::HashMap;

/// An outstanding reminder for one station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEntry {
    pub station_id: StationId,
    pub station_name: String,
    pub raised_at: DateTime<Local>,
    /// Remaining hours when the reminder was raised
    pub remaining_hours: u64,
}

/// One entry per station currently inside a low-fuel episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderRegistry {
    entries: HashMap<StationId, ReminderEntry>,
}

impl ReminderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, station_id: StationId) -> bool {
        self.entries.contains_key(&station_id)
    }

    pub fn get(&self, station_id: StationId) -> Option<&ReminderEntry> {
        self.entries.get(&station_id)
    }

    /// Record a new episode. Returns false if one is already outstanding.
    pub fn raise(&mut self, entry: ReminderEntry) -> bool {
        if self.entries.contains_key(&entry.station_id) {
            return false;
        }
        self.entries.insert(entry.station_id, entry);
        true
    }

    /// End the episode for a station
    pub fn clear(&mut self, station_id: StationId) -> Option<ReminderEntry> {
        self.entries.remove(&station_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cloned entries, oldest first
    pub fn entries(&self) -> Vec<ReminderEntry> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| (e.raised_at, e.station_id));
        entries
    }
}
