//! Station records

use fuelwatch_util::{LocationId, StationId, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Operational state of a station as reported upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationState {
    Unanchored,
    AnchoredOffline,
    Onlining,
    Reinforced,
    Online,
}

/// Upstream reported a state code outside 0..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown station state code: {0}")]
pub struct UnknownStationState(pub i64);

impl StationState {
    pub fn is_online(self) -> bool {
        self == StationState::Online
    }
}

impl TryFrom<i64> for StationState {
    type Error = UnknownStationState;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StationState::Unanchored),
            1 => Ok(StationState::AnchoredOffline),
            2 => Ok(StationState::Onlining),
            3 => Ok(StationState::Reinforced),
            4 => Ok(StationState::Online),
            other => Err(UnknownStationState(other)),
        }
    }
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StationState::Unanchored => "unanchored",
            StationState::AnchoredOffline => "anchored (offline)",
            StationState::Onlining => "onlining",
            StationState::Reinforced => "reinforced",
            StationState::Online => "online",
        };
        f.write_str(label)
    }
}

/// Fuel currently loaded in a station's bay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelState {
    pub type_id: TypeId,
    pub type_name: String,
    /// Units consumed per hour while online
    pub usage_per_hour: u64,
    pub quantity: u64,
}

impl FuelState {
    /// Whole operating hours left, or `None` when usage is zero.
    pub fn remaining_hours(&self) -> Option<u64> {
        self.quantity.checked_div(self.usage_per_hour)
    }
}

/// One monitored station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    pub id: StationId,
    pub name: String,
    pub state: StationState,
    pub type_id: TypeId,
    pub type_name: String,
    pub location_id: LocationId,
    pub location_name: String,
    /// Fuel bay size
    pub capacity: u64,
    /// Present only when a recognized fuel type was found in the bay
    pub fuel: Option<FuelState>,
}

impl StationRecord {
    /// Fuel state if the station is online and burning recognized fuel
    pub fn burning_fuel(&self) -> Option<&FuelState> {
        if self.state.is_online() {
            self.fuel.as_ref()
        } else {
            None
        }
    }
}

/// A station that crossed into the low-fuel band during a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowFuelStation {
    pub station_id: StationId,
    pub name: String,
    pub type_name: String,
    pub location_name: String,
    pub fuel_type_name: String,
    pub quantity: u64,
    pub usage_per_hour: u64,
    pub remaining_hours: u64,
}

impl LowFuelStation {
    pub fn from_record(record: &StationRecord, fuel: &FuelState, remaining_hours: u64) -> Self {
        Self {
            station_id: record.id,
            name: record.name.clone(),
            type_name: record.type_name.clone(),
            location_name: record.location_name.clone(),
            fuel_type_name: fuel.type_name.clone(),
            quantity: fuel.quantity,
            usage_per_hour: fuel.usage_per_hour,
            remaining_hours,
        }
    }
}
