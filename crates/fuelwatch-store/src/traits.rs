//! Store trait definitions

use fuelwatch_gateway::{ApiCredential, Recipient};
use fuelwatch_util::{LocationId, StationId, TypeId};

use crate::{AuditEvent, StoreResult};

/// Main store trait
///
/// Lookups return `StoreError::NotFound` when the key has no row.
pub trait Store: Send + Sync {
    // Reference data

    /// Hourly fuel usage of a station type burning a fuel type
    fn fuel_usage(&self, station_type: TypeId, fuel_type: TypeId) -> StoreResult<u64>;

    /// Display name of a station or fuel type
    fn type_name(&self, type_id: TypeId) -> StoreResult<String>;

    /// Display name of a location
    fn location_name(&self, location_id: LocationId) -> StoreResult<String>;

    /// Fuel bay capacity of a station type
    fn capacity(&self, station_type: TypeId) -> StoreResult<u64>;

    /// Display name given to a station
    fn station_name(&self, station_id: StationId) -> StoreResult<String>;

    // Accounts

    /// All upstream credentials, ordered by key id
    fn credentials(&self) -> StoreResult<Vec<ApiCredential>>;

    /// All reminder recipients, ordered by username
    fn recipients(&self) -> StoreResult<Vec<Recipient>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
