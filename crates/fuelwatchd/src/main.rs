//! fuelwatchd - The fuelwatch background service
//!
//! This is the main entry point for the fuelwatchd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization and reference data import
//! - Upstream HTTP gateway and mail outbox
//! - Fleet monitor (refresh scheduler and reminder ticker)

use anyhow::{Context, Result};
use clap::Parser;
use fuelwatch_adapters::{HttpStationApi, OutboxNotifier, ServiceGateway};
use fuelwatch_config::{load_config, Settings};
use fuelwatch_core::{FleetMonitor, MonitorTasks};
use fuelwatch_gateway::{Gateway, Notifier};
use fuelwatch_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use fuelwatch_util::{default_config_path, format_hours};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// fuelwatchd - Station fuel monitoring and low-fuel reminders
#[derive(Parser, Debug)]
#[command(name = "fuelwatchd")]
#[command(about = "Station fuel monitoring and low-fuel reminders", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/fuelwatch/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set FUELWATCH_DATA_DIR env var)
    #[arg(short, long, env = "FUELWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// SQL script with reference data to import before starting
    #[arg(long)]
    import: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    monitor: FleetMonitor,
    tasks: MonitorTasks,
    store: Arc<dyn Store>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let mut settings = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            upstream = %settings.upstream.base_url,
            "Configuration loaded"
        );

        if let Some(data_dir) = &args.data_dir {
            settings.service.data_dir = data_dir.clone();
        }
        let data_dir = settings.service.data_dir.clone();

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("fuelwatch.db");
        let sqlite = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?;

        if let Some(script) = &args.import {
            let sql = std::fs::read_to_string(script)
                .with_context(|| format!("Failed to read reference data {:?}", script))?;
            sqlite
                .import_script(&sql)
                .with_context(|| format!("Failed to import reference data {:?}", script))?;
            info!(script = %script.display(), "Reference data imported");
        }

        let store: Arc<dyn Store> = Arc::new(sqlite);
        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let (gateway, notifier) = Self::build_adapters(&settings, store.clone())?;
        let (monitor, tasks) = FleetMonitor::start(&settings, gateway, notifier, store.clone());

        Ok(Self {
            monitor,
            tasks,
            store,
        })
    }

    fn build_adapters(
        settings: &Settings,
        store: Arc<dyn Store>,
    ) -> Result<(Arc<dyn Gateway>, Arc<dyn Notifier>)> {
        let upstream = HttpStationApi::new(&settings.upstream)
            .context("Failed to create upstream client")?;
        let gateway: Arc<dyn Gateway> = Arc::new(ServiceGateway::new(upstream, store));

        let outbox_dir = settings.service.data_dir.join("outbox");
        info!(outbox = %outbox_dir.display(), "Reminders go to mail outbox");
        let notifier: Arc<dyn Notifier> = Arc::new(OutboxNotifier::new(
            outbox_dir,
            settings.service.sender.clone(),
            settings.service.public_url.clone(),
        ));

        Ok((gateway, notifier))
    }

    async fn run(self) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;
        let mut sigusr1 = signal(SignalKind::user_defined1())
            .context("Failed to create SIGUSR1 handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP: refresh now
                _ = sighup.recv() => {
                    info!("Received SIGHUP, refreshing");
                    self.monitor.trigger_refresh();
                }

                // SIGUSR1: dump fleet status to the log
                _ = sigusr1.recv() => {
                    Self::log_status(&self.monitor, self.store.as_ref());
                }
            }
        }

        self.tasks.shutdown().await;

        if let Err(e) = self.store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    fn log_status(monitor: &FleetMonitor, store: &dyn Store) {
        let snapshot = monitor.load_snapshot();
        info!(
            store_healthy = store.is_healthy(),
            generation = snapshot.generation,
            stations = snapshot.len(),
            expiry = ?snapshot.expiry,
            state = ?monitor.scheduler_state(),
            "Fleet status"
        );

        for station in &snapshot.stations {
            match station.burning_fuel() {
                Some(fuel) => info!(
                    station_id = %station.id,
                    name = %station.name,
                    fuel = %fuel.type_name,
                    quantity = fuel.quantity,
                    remaining = %remaining(fuel.remaining_hours()),
                    "Station"
                ),
                None => info!(
                    station_id = %station.id,
                    name = %station.name,
                    state = ?station.state,
                    "Station"
                ),
            }
        }

        let list = monitor.shopping_list();
        for entry in &list.entries {
            info!(
                fuel = %entry.name,
                quantity = entry.quantity,
                volume = entry.volume,
                "Shopping list"
            );
        }
        info!(total_volume = list.total_volume(), "Shopping list total");

        for reminder in monitor.active_reminders() {
            info!(
                station_id = %reminder.station_id,
                name = %reminder.station_name,
                raised_at = %reminder.raised_at,
                remaining_hours = reminder.remaining_hours,
                "Active reminder"
            );
        }
    }
}

fn remaining(hours: Option<u64>) -> String {
    hours.map(format_hours).unwrap_or_else(|| "-".into())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "fuelwatchd starting"
    );

    let service = Service::new(&args).await?;
    service.run().await
}
