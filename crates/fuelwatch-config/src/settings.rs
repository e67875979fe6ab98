//! Validated settings structures

use crate::schema::{
    RawConfig, RawFuelConfig, RawRefreshConfig, RawReminderConfig, RawServiceConfig,
    RawUpstreamConfig,
};
use fuelwatch_util::{TypeId, data_dir_without_env};
use std::path::PathBuf;
use std::time::Duration;

/// Fuel block type IDs burned by control towers
pub const DEFAULT_FUEL_TYPES: [i64; 4] = [4051, 4246, 4247, 4312];

/// Volume of one fuel block
pub const DEFAULT_VOLUME_PER_UNIT: u64 = 5;

/// Stations with at most this many hours of fuel are reported
pub const DEFAULT_LOW_FUEL_THRESHOLD_HOURS: u64 = 36;

/// Validated settings ready for use by the monitor
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceSettings,
    pub upstream: UpstreamSettings,
    pub refresh: RefreshSettings,
    pub reminders: ReminderSettings,
    pub fuel: FuelSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let upstream = UpstreamSettings::from_raw(raw.upstream);

        // Every gateway call made by the background tasks shares the upstream timeout
        let mut refresh = RefreshSettings::from_raw(raw.refresh);
        refresh.gateway_timeout = upstream.timeout;
        let mut reminders = ReminderSettings::from_raw(raw.reminders);
        reminders.gateway_timeout = upstream.timeout;

        Self {
            service: ServiceSettings::from_raw(raw.service),
            upstream,
            refresh,
            reminders,
            fuel: FuelSettings::from_raw(raw.fuel),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub data_dir: PathBuf,
    pub public_url: Option<String>,
    pub sender: String,
}

impl ServiceSettings {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            public_url: raw.public_url.map(|u| u.trim_end_matches('/').to_string()),
            sender: raw
                .sender
                .unwrap_or_else(|| "fuelwatch@localhost".to_string()),
        }
    }
}

/// Upstream station API settings
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl UpstreamSettings {
    fn from_raw(raw: RawUpstreamConfig) -> Self {
        Self {
            base_url: raw.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(raw.timeout_seconds.unwrap_or(30)),
        }
    }
}

/// Refresh scheduling settings
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Delay before retrying after a failed refresh
    pub retry_backoff: Duration,
    /// Minimum delay after a successful refresh, even if the upstream
    /// deadline is already in the past
    pub min_interval: Duration,
    /// Expiry granted to an empty fleet (no credentials configured)
    pub empty_fleet_interval: Duration,
    /// Timeout applied to each gateway call
    pub gateway_timeout: Duration,
}

impl RefreshSettings {
    fn from_raw(raw: RawRefreshConfig) -> Self {
        let defaults = Self::default();
        Self {
            retry_backoff: raw
                .retry_backoff_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_backoff),
            min_interval: raw
                .min_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.min_interval),
            empty_fleet_interval: raw
                .empty_fleet_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.empty_fleet_interval),
            gateway_timeout: defaults.gateway_timeout,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_secs(60),
            min_interval: Duration::from_secs(30),
            empty_fleet_interval: Duration::from_secs(3600),
            gateway_timeout: Duration::from_secs(30),
        }
    }
}

/// Reminder tick settings
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub interval: Duration,
    pub low_fuel_threshold_hours: u64,
    /// Timeout applied to recipient lookup and each delivery
    pub gateway_timeout: Duration,
}

impl ReminderSettings {
    fn from_raw(raw: RawReminderConfig) -> Self {
        let defaults = Self::default();
        Self {
            interval: raw
                .interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            low_fuel_threshold_hours: raw
                .low_fuel_threshold_hours
                .unwrap_or(defaults.low_fuel_threshold_hours),
            gateway_timeout: defaults.gateway_timeout,
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            low_fuel_threshold_hours: DEFAULT_LOW_FUEL_THRESHOLD_HOURS,
            gateway_timeout: Duration::from_secs(30),
        }
    }
}

/// Fuel catalogue settings
#[derive(Debug, Clone)]
pub struct FuelSettings {
    /// Recognized fuel types, in priority order
    pub recognized_types: Vec<TypeId>,
    pub volume_per_unit: u64,
}

impl FuelSettings {
    fn from_raw(raw: RawFuelConfig) -> Self {
        let defaults = Self::default();
        Self {
            recognized_types: raw
                .recognized_types
                .map(|types| types.into_iter().map(TypeId::new).collect())
                .unwrap_or(defaults.recognized_types),
            volume_per_unit: raw.volume_per_unit.unwrap_or(defaults.volume_per_unit),
        }
    }

    pub fn is_recognized(&self, type_id: TypeId) -> bool {
        self.recognized_types.contains(&type_id)
    }
}

impl Default for FuelSettings {
    fn default() -> Self {
        Self {
            recognized_types: DEFAULT_FUEL_TYPES.into_iter().map(TypeId::new).collect(),
            volume_per_unit: DEFAULT_VOLUME_PER_UNIT,
        }
    }
}
