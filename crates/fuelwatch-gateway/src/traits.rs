//! Gateway traits

use async_trait::async_trait;
use fuelwatch_api::LowFuelStation;
use fuelwatch_util::{LocationId, StationId, TypeId};
use std::time::Duration;
use thiserror::Error;

use crate::{ApiCredential, Recipient, StationDetails, StationListing};

/// Errors from gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Remote station data and reference lookups.
///
/// Implementations must not hold state the monitor depends on; every call
/// may fail and the monitor treats each one as a possible abort point.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All configured upstream credentials
    async fn load_all_credentials(&self) -> GatewayResult<Vec<ApiCredential>>;

    /// Everyone who should receive low-fuel reminders
    async fn load_all_recipients(&self) -> GatewayResult<Vec<Recipient>>;

    /// Station list visible to a credential
    async fn fetch_station_list(&self, credential: &ApiCredential) -> GatewayResult<StationListing>;

    /// Detailed state, including fuel bay, of one station
    async fn fetch_station_details(
        &self,
        credential: &ApiCredential,
        station_id: StationId,
    ) -> GatewayResult<StationDetails>;

    /// Hourly fuel consumption of a station type burning a fuel type
    async fn lookup_fuel_usage(
        &self,
        station_type: TypeId,
        fuel_type: TypeId,
    ) -> GatewayResult<u64>;

    /// Display name of a type (station type or fuel type)
    async fn lookup_type_name(&self, type_id: TypeId) -> GatewayResult<String>;

    /// Display name of a location
    async fn lookup_location_name(&self, location_id: LocationId) -> GatewayResult<String>;

    /// Fuel bay capacity of a station type
    async fn lookup_capacity(&self, station_type: TypeId) -> GatewayResult<u64>;

    /// Display name given to a station
    async fn lookup_station_name(&self, station_id: StationId) -> GatewayResult<String>;
}

/// Outbound low-fuel reminder delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one reminder covering the whole batch to one recipient
    async fn send_fuel_reminder(
        &self,
        recipient: &Recipient,
        batch: &[LowFuelStation],
    ) -> NotifyResult<()>;
}
