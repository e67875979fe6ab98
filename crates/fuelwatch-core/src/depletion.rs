//! Fuel depletion simulation and reminder transitions
//!
//! Between refreshes the upstream quantities go stale, so every tick burns
//! one hour of fuel from each online station and re-evaluates how long it
//! can keep running. Stations entering the low band are collected into a
//! batch for notification; stations recovering above it leave the registry.

use chrono::{DateTime, Local};
use fuelwatch_api::{FuelState, LowFuelStation, StationRecord};
use fuelwatch_util::StationId;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

use crate::{CoreError, CoreResult, ReminderEntry, ReminderRegistry};

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Stations that were online, fuelled and had valid usage
    pub evaluated: usize,
    /// Newly low stations, in snapshot order; this is the notification batch
    pub raised: Vec<LowFuelStation>,
    /// Stations that left the low band
    pub cleared: Vec<StationId>,
    /// Stations excluded because their usage is zero
    pub invalid: Vec<StationId>,
}

/// Burns one hour of fuel and returns the whole hours left.
///
/// The quantity never drops below zero.
pub fn burn_one_hour(station_id: StationId, fuel: &mut FuelState) -> CoreResult<u64> {
    if fuel.usage_per_hour == 0 {
        return Err(CoreError::InvalidDepletionState { station_id });
    }

    fuel.quantity = fuel.quantity.saturating_sub(fuel.usage_per_hour);
    Ok(fuel.quantity / fuel.usage_per_hour)
}

/// Depletion engine
pub struct DepletionEngine {
    threshold_hours: u64,
    /// Stations whose zero usage has already been logged this episode
    invalid_logged: HashSet<StationId>,
}

impl DepletionEngine {
    pub fn new(threshold_hours: u64) -> Self {
        Self {
            threshold_hours,
            invalid_logged: HashSet::new(),
        }
    }

    pub fn threshold_hours(&self) -> u64 {
        self.threshold_hours
    }

    /// Run one tick over the station set.
    ///
    /// Fuel quantities are decremented in place and the registry is updated;
    /// nothing is sent from here.
    pub fn tick(
        &mut self,
        stations: &mut [StationRecord],
        registry: &mut ReminderRegistry,
        now: DateTime<Local>,
    ) -> TickReport {
        let mut report = TickReport::default();

        for record in stations.iter_mut() {
            if !record.state.is_online() {
                continue;
            }
            let Some(fuel) = record.fuel.as_mut() else {
                continue;
            };

            let remaining_hours = match burn_one_hour(record.id, fuel) {
                Ok(hours) => {
                    self.invalid_logged.remove(&record.id);
                    hours
                }
                Err(err) => {
                    if self.invalid_logged.insert(record.id) {
                        warn!(station_id = %record.id, error = %err, "Skipping station");
                    }
                    report.invalid.push(record.id);
                    continue;
                }
            };

            report.evaluated += 1;
            let low = remaining_hours <= self.threshold_hours;

            match (registry.contains(record.id), low) {
                (true, false) => {
                    debug!(
                        station_id = %record.id,
                        remaining_hours,
                        "Station recovered, clearing reminder"
                    );
                    registry.clear(record.id);
                    report.cleared.push(record.id);
                }
                (true, true) => {
                    trace!(
                        station_id = %record.id,
                        remaining_hours,
                        "Still low, reminder already sent"
                    );
                }
                (false, true) => {
                    debug!(station_id = %record.id, remaining_hours, "Station low on fuel");
                    registry.raise(ReminderEntry {
                        station_id: record.id,
                        station_name: record.name.clone(),
                        raised_at: now,
                        remaining_hours,
                    });
                    let fuel = fuel.clone();
                    report
                        .raised
                        .push(LowFuelStation::from_record(record, &fuel, remaining_hours));
                }
                (false, false) => {
                    trace!(station_id = %record.id, remaining_hours, "Enough fuel");
                }
            }
        }

        report
    }
}
