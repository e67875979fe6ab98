//! Check a fuelwatch configuration file without starting the service
//!
//! Exit codes: 0 valid, 1 invalid or unreadable, 2 usage error.

use fuelwatch_config::{load_config, ConfigError, Settings, CURRENT_CONFIG_VERSION};
use fuelwatch_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn print_summary(settings: &Settings) {
    let fuel_types = settings
        .fuel
        .recognized_types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    println!("Configuration is valid (version {})", CURRENT_CONFIG_VERSION);
    println!();
    println!("  upstream            {}", settings.upstream.base_url);
    println!("  upstream timeout    {}", format_duration(settings.upstream.timeout));
    println!("  retry backoff       {}", format_duration(settings.refresh.retry_backoff));
    println!("  min refresh gap     {}", format_duration(settings.refresh.min_interval));
    println!("  reminder interval   {}", format_duration(settings.reminders.interval));
    println!("  low fuel threshold  {}h", settings.reminders.low_fuel_threshold_hours);
    println!("  fuel types          {}", fuel_types);
    println!("  volume per unit     {}", settings.fuel.volume_per_unit);
    println!("  data directory      {}", settings.service.data_dir.display());
    println!("  mail sender         {}", settings.service.sender);
    if let Some(url) = &settings.service.public_url {
        println!("  public url          {}", url);
    }
}

fn print_error(error: &ConfigError) {
    eprintln!("Configuration is invalid");
    eprintln!();
    match error {
        ConfigError::ValidationFailed { errors } => {
            for err in errors {
                eprintln!("  - {}", err);
            }
        }
        ConfigError::UnsupportedVersion(version) => {
            eprintln!(
                "  config_version = {} is not supported (expected {})",
                version, CURRENT_CONFIG_VERSION
            );
        }
        other => eprintln!("  {}", other),
    }
}

fn main() -> ExitCode {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: validate-config <config-file>");
        eprintln!("default location: {}", default_config_path().display());
        return ExitCode::from(2);
    };

    match load_config(&path) {
        Ok(settings) => {
            print_summary(&settings);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&e);
            ExitCode::from(1)
        }
    }
}
