//! Default locations for the config file and the data directory
//!
//! Both follow the XDG base directory layout and need no root access.

use std::path::PathBuf;

/// Overrides [`default_config_path`]
pub const FUELWATCH_CONFIG_ENV: &str = "FUELWATCH_CONFIG";

/// Overrides the configured data directory (read by the daemon's CLI)
pub const FUELWATCH_DATA_DIR_ENV: &str = "FUELWATCH_DATA_DIR";

const APP_DIR: &str = "fuelwatch";

/// `$XDG_<kind>_HOME/fuelwatch`, falling back to `~/<home_relative>/fuelwatch`
fn xdg_app_dir(xdg_var: &str, home_relative: &str) -> Option<PathBuf> {
    std::env::var_os(xdg_var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(home_relative)))
        .map(|base| base.join(APP_DIR))
}

/// `$FUELWATCH_CONFIG`, else `config.toml` in the XDG config dir, else
/// `/etc/fuelwatch/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(FUELWATCH_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    xdg_app_dir("XDG_CONFIG_HOME", ".config")
        .unwrap_or_else(|| PathBuf::from("/etc").join(APP_DIR))
        .join("config.toml")
}

/// Data directory used when the config leaves `service.data_dir` unset.
///
/// Ignores `$FUELWATCH_DATA_DIR`; the daemon applies that override itself.
pub fn data_dir_without_env() -> PathBuf {
    xdg_app_dir("XDG_DATA_HOME", ".local/share")
        .unwrap_or_else(|| std::env::temp_dir().join(APP_DIR))
}
