//! Configuration validation

use crate::schema::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid upstream URL '{value}': {message}")]
    InvalidUrl { value: String, message: String },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("Duplicate recognized fuel type: {0}")]
    DuplicateFuelType(i64),

    #[error("At least one recognized fuel type is required")]
    NoFuelTypes,

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_url(&config.upstream.base_url) {
        errors.push(e);
    }

    let positive_fields = [
        ("upstream.timeout_seconds", config.upstream.timeout_seconds),
        ("refresh.retry_backoff_seconds", config.refresh.retry_backoff_seconds),
        ("refresh.min_interval_seconds", config.refresh.min_interval_seconds),
        (
            "refresh.empty_fleet_interval_seconds",
            config.refresh.empty_fleet_interval_seconds,
        ),
        ("reminders.interval_seconds", config.reminders.interval_seconds),
        (
            "reminders.low_fuel_threshold_hours",
            config.reminders.low_fuel_threshold_hours,
        ),
        ("fuel.volume_per_unit", config.fuel.volume_per_unit),
    ];
    for (field, value) in positive_fields {
        if value == Some(0) {
            errors.push(ValidationError::MustBePositive { field });
        }
    }

    if let Some(types) = &config.fuel.recognized_types {
        if types.is_empty() {
            errors.push(ValidationError::NoFuelTypes);
        }

        let mut seen = HashSet::new();
        for type_id in types {
            if !seen.insert(type_id) {
                errors.push(ValidationError::DuplicateFuelType(*type_id));
            }
        }
    }

    if let Some(public_url) = &config.service.public_url
        && public_url.trim().is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "service.public_url cannot be empty".into(),
        ));
    }

    errors
}

/// Check that a URL is non-empty and uses http or https
pub fn validate_url(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidUrl {
            value: value.into(),
            message: "URL cannot be empty".into(),
        });
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| ValidationError::InvalidUrl {
            value: value.into(),
            message: "expected http:// or https:// scheme".into(),
        })?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(ValidationError::InvalidUrl {
            value: value.into(),
            message: "missing host".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        RawFuelConfig, RawRefreshConfig, RawReminderConfig, RawServiceConfig, RawUpstreamConfig,
    };

    fn make_config() -> RawConfig {
        RawConfig {
            config_version: 1,
            service: RawServiceConfig::default(),
            upstream: RawUpstreamConfig {
                base_url: "https://api.example.com".into(),
                timeout_seconds: None,
            },
            refresh: RawRefreshConfig::default(),
            reminders: RawReminderConfig::default(),
            fuel: RawFuelConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&make_config()).is_empty());
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url("https://api.example.com").is_ok());
        assert!(validate_url("http://localhost:8080/api").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https://").is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = make_config();
        config.refresh.retry_backoff_seconds = Some(0);
        config.reminders.low_fuel_threshold_hours = Some(0);
        config.fuel.volume_per_unit = Some(0);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::MustBePositive { .. })));
    }

    #[test]
    fn test_fuel_type_validation() {
        let mut config = make_config();
        config.fuel.recognized_types = Some(vec![4051, 4246, 4051]);
        let errors = validate_config(&config);
        assert!(matches!(errors[..], [ValidationError::DuplicateFuelType(4051)]));

        config.fuel.recognized_types = Some(vec![]);
        let errors = validate_config(&config);
        assert!(matches!(errors[..], [ValidationError::NoFuelTypes]));
    }
}
