//! Configuration parsing and validation for fuelwatch
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Upstream API, refresh and reminder settings
//! - Recognized fuel types
//! - Validation with clear error messages

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Settings> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Settings::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use fuelwatch_util::TypeId;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [upstream]
            base_url = "https://api.example.com/"
        "#;

        let settings = parse_config(config).unwrap();
        assert_eq!(settings.upstream.base_url, "https://api.example.com");
        assert_eq!(settings.upstream.timeout, Duration::from_secs(30));
        assert_eq!(settings.reminders.low_fuel_threshold_hours, 36);
        assert_eq!(settings.reminders.interval, Duration::from_secs(3600));
        assert_eq!(settings.fuel.volume_per_unit, 5);
        assert!(settings.fuel.is_recognized(TypeId::new(4312)));
        assert!(!settings.fuel.is_recognized(TypeId::new(16275)));
    }

    #[test]
    fn upstream_timeout_applies_to_gateway_calls() {
        let config = r#"
            config_version = 1

            [upstream]
            base_url = "https://api.example.com"
            timeout_seconds = 7
        "#;

        let settings = parse_config(config).unwrap();
        assert_eq!(settings.refresh.gateway_timeout, Duration::from_secs(7));
        assert_eq!(settings.reminders.gateway_timeout, Duration::from_secs(7));
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99

            [upstream]
            base_url = "https://api.example.com"
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let config = r#"
            config_version = 1

            [upstream]
            base_url = "api.example.com"

            [fuel]
            volume_per_unit = 0
        "#;

        match parse_config(config) {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "config_version = 1\n[upstream]\nbase_url = \"http://localhost:8080\"\n[refresh]\nretry_backoff_seconds = 15"
        )
        .unwrap();

        let settings = load_config(file.path()).unwrap();
        assert_eq!(settings.refresh.retry_backoff, Duration::from_secs(15));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
