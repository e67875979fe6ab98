//! Data exchanged with the upstream station API and the reference dataset

use chrono::{DateTime, Local};
use fuelwatch_api::StationState;
use fuelwatch_util::{LocationId, StationId, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream API key (key id + verification code)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredential {
    pub key_id: i64,
    pub verification_code: String,
}

impl ApiCredential {
    pub fn new(key_id: i64, verification_code: impl Into<String>) -> Self {
        Self {
            key_id,
            verification_code: verification_code.into(),
        }
    }
}

// Keeps verification codes out of logs
impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("key_id", &self.key_id)
            .field("verification_code", &"<redacted>")
            .finish()
    }
}

/// Someone who receives low-fuel reminders
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub username: String,
    pub email: String,
}

impl Recipient {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }
}

/// One row of the upstream station list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSummary {
    pub id: StationId,
    pub type_id: TypeId,
    pub location_id: LocationId,
    pub state: StationState,
}

/// Station list for one credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationListing {
    pub stations: Vec<StationSummary>,
    /// Upstream promises the list will not change before this instant
    pub cached_until: DateTime<Local>,
}

/// Consumable stored in a station's fuel bay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelBayItem {
    pub type_id: TypeId,
    pub quantity: u64,
}

/// Detailed state of one station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDetails {
    pub id: StationId,
    pub state: StationState,
    /// Bay contents in upstream order
    pub fuel: Vec<FuelBayItem>,
}
