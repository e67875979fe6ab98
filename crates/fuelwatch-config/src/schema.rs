//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Upstream station API
    pub upstream: RawUpstreamConfig,

    /// Refresh scheduling
    #[serde(default)]
    pub refresh: RawRefreshConfig,

    /// Low-fuel reminders
    #[serde(default)]
    pub reminders: RawReminderConfig,

    /// Fuel catalogue settings
    #[serde(default)]
    pub fuel: RawFuelConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the reference database and mail outbox
    pub data_dir: Option<PathBuf>,

    /// Public URL of the station pages, linked from reminder mails
    pub public_url: Option<String>,

    /// Sender address for reminder mails
    pub sender: Option<String>,
}

/// Upstream station API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawUpstreamConfig {
    /// Base URL of the station API
    pub base_url: String,

    /// Timeout applied to every upstream and reference lookup
    pub timeout_seconds: Option<u64>,
}

/// Refresh scheduling
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRefreshConfig {
    /// Delay before retrying a failed refresh
    pub retry_backoff_seconds: Option<u64>,

    /// Lower bound between two successful refreshes
    pub min_interval_seconds: Option<u64>,

    /// Refresh interval when no credentials are configured
    pub empty_fleet_interval_seconds: Option<u64>,
}

/// Low-fuel reminders
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReminderConfig {
    /// Interval between reminder ticks
    pub interval_seconds: Option<u64>,

    /// Stations with at most this many hours of fuel are reported
    pub low_fuel_threshold_hours: Option<u64>,
}

/// Fuel catalogue settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFuelConfig {
    /// Fuel type IDs that count as station fuel
    pub recognized_types: Option<Vec<i64>>,

    /// Volume of one fuel unit
    pub volume_per_unit: Option<u64>,
}
