//! Fleet monitor: wiring and the in-process read API

use chrono::{DateTime, Local};
use fuelwatch_api::{CacheSnapshot, SchedulerState, ShoppingList};
use fuelwatch_config::Settings;
use fuelwatch_gateway::{Gateway, Notifier};
use fuelwatch_store::Store;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    compute_shopping_list, CacheStore, RefreshScheduler, ReminderEntry, ReminderRegistry,
    ReminderTicker, SnapshotFetcher, Trigger,
};

/// Handle to a running monitor.
///
/// Cheap to clone; every method returns immediately without network I/O.
#[derive(Clone)]
pub struct FleetMonitor {
    cache: Arc<CacheStore>,
    registry: Arc<Mutex<ReminderRegistry>>,
    refresh_trigger: Trigger,
    reminder_trigger: Trigger,
    state: watch::Receiver<SchedulerState>,
    volume_per_unit: u64,
}

/// The background tasks behind a [`FleetMonitor`]
pub struct MonitorTasks {
    shutdown: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl FleetMonitor {
    /// Spawn the refresh scheduler and reminder ticker.
    ///
    /// Must be called from within a tokio runtime. The first refresh starts
    /// right away.
    pub fn start(
        settings: &Settings,
        gateway: Arc<dyn Gateway>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn Store>,
    ) -> (Self, MonitorTasks) {
        let cache = Arc::new(CacheStore::new());
        let registry = Arc::new(Mutex::new(ReminderRegistry::new()));
        let refresh_trigger = Trigger::new();
        let reminder_trigger = Trigger::new();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let fetcher = SnapshotFetcher::new(
            gateway.clone(),
            settings.fuel.clone(),
            settings.refresh.gateway_timeout,
            settings.refresh.empty_fleet_interval,
        );
        let scheduler = RefreshScheduler::new(
            fetcher,
            cache.clone(),
            store.clone(),
            settings.refresh.clone(),
            refresh_trigger.clone(),
            reminder_trigger.clone(),
        );
        let state = scheduler.subscribe();

        let ticker = ReminderTicker::new(
            cache.clone(),
            registry.clone(),
            gateway,
            notifier,
            store,
            settings.reminders.clone(),
            reminder_trigger.clone(),
        );

        let tasks = MonitorTasks {
            scheduler: tokio::spawn(scheduler.run(shutdown_rx.clone())),
            ticker: tokio::spawn(ticker.run(shutdown_rx)),
            shutdown,
        };

        info!(
            threshold_hours = settings.reminders.low_fuel_threshold_hours,
            fuel_types = settings.fuel.recognized_types.len(),
            "Fleet monitor started"
        );

        let monitor = Self {
            cache,
            registry,
            refresh_trigger,
            reminder_trigger,
            state,
            volume_per_unit: settings.fuel.volume_per_unit,
        };
        (monitor, tasks)
    }

    /// Current snapshot, possibly stale.
    ///
    /// An expired snapshot triggers a refresh only once the scheduler's own
    /// wake-up time has passed without it waking, e.g. after a suspend.
    /// Reads never cut a retry backoff or minimum interval short, and never
    /// add to a refresh that is pending or in flight.
    pub fn load_snapshot(&self) -> Arc<CacheSnapshot> {
        let snapshot = self.cache.load();
        let now = fuelwatch_util::now();
        if snapshot.is_expired(now) && self.wake_overdue(now) {
            debug!(generation = snapshot.generation, "Snapshot expired, requesting refresh");
            self.refresh_trigger.fire();
        }
        snapshot
    }

    /// `Stopped` before the first refresh means it is about to run
    fn wake_overdue(&self, now: DateTime<Local>) -> bool {
        match *self.state.borrow() {
            SchedulerState::Idle { next_wake } => next_wake <= now,
            SchedulerState::Refreshing | SchedulerState::Stopped => false,
        }
    }

    /// Ask for a refresh as soon as possible
    pub fn trigger_refresh(&self) {
        self.refresh_trigger.fire();
    }

    /// Ask for a reminder tick as soon as possible
    pub fn trigger_reminder_check(&self) {
        self.reminder_trigger.fire();
    }

    /// Fuel needed to top up every online station
    pub fn shopping_list(&self) -> ShoppingList {
        compute_shopping_list(&self.load_snapshot(), self.volume_per_unit)
    }

    /// Outstanding reminders, oldest first
    pub fn active_reminders(&self) -> Vec<ReminderEntry> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        *self.state.borrow()
    }
}

impl MonitorTasks {
    /// Stop both tasks, letting any in-flight refresh or tick finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        if let Err(e) = self.scheduler.await {
            warn!(error = %e, "Refresh scheduler task failed");
        }
        if let Err(e) = self.ticker.await {
            warn!(error = %e, "Reminder ticker task failed");
        }
        info!("Fleet monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelwatch_api::StationState;
    use fuelwatch_config::{
        FuelSettings, RefreshSettings, ReminderSettings, ServiceSettings, UpstreamSettings,
    };
    use fuelwatch_gateway::{
        ApiCredential, FuelBayItem, MockGateway, MockNotifier, Recipient, StationDetails,
        StationListing, StationSummary,
    };
    use fuelwatch_store::SqliteStore;
    use fuelwatch_util::{LocationId, StationId, TypeId};
    use std::time::Duration;

    const TOWER: TypeId = TypeId::new(12235);
    const NITROGEN: TypeId = TypeId::new(4051);
    const MOON: LocationId = LocationId::new(40009082);

    fn settings() -> Settings {
        Settings {
            service: ServiceSettings {
                data_dir: std::env::temp_dir(),
                public_url: None,
                sender: "fuelwatch@localhost".into(),
            },
            upstream: UpstreamSettings {
                base_url: "http://localhost".into(),
                timeout: Duration::from_secs(30),
            },
            refresh: RefreshSettings::default(),
            reminders: ReminderSettings::default(),
            fuel: FuelSettings::default(),
        }
    }

    fn gateway(quantity: u64) -> Arc<MockGateway> {
        let station_id = StationId::new(1);
        let gateway = MockGateway::new();
        gateway.update(|data| {
            data.credentials.push(ApiCredential::new(1, "code"));
            data.recipients.push(Recipient::new("alice", "alice@example.com"));
            data.listings.insert(
                1,
                StationListing {
                    stations: vec![StationSummary {
                        id: station_id,
                        type_id: TOWER,
                        location_id: MOON,
                        state: StationState::Online,
                    }],
                    cached_until: Local::now() + chrono::Duration::hours(1),
                },
            );
            data.details.insert(
                station_id,
                StationDetails {
                    id: station_id,
                    state: StationState::Online,
                    fuel: vec![FuelBayItem {
                        type_id: NITROGEN,
                        quantity,
                    }],
                },
            );
            data.fuel_usage.insert((TOWER, NITROGEN), 10);
            data.type_names.insert(TOWER, "Amarr Control Tower".into());
            data.type_names.insert(NITROGEN, "Nitrogen Fuel Block".into());
            data.location_names.insert(MOON, "Jita IV - Moon 4".into());
            data.capacities.insert(TOWER, 1_000);
            data.station_names.insert(station_id, "Home Tower".into());
        });
        Arc::new(gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn start_refresh_tick_and_shutdown() {
        let gateway = gateway(100);
        let notifier = Arc::new(MockNotifier::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let (monitor, tasks) =
            FleetMonitor::start(&settings(), gateway.clone(), notifier.clone(), store);

        tokio::time::sleep(Duration::from_secs(1)).await;

        // Refresh ran and signalled a tick: 100 - 10 = 90 → 9h left
        let snapshot = monitor.load_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.stations[0].fuel.as_ref().unwrap().quantity, 90);
        assert!(matches!(monitor.scheduler_state(), SchedulerState::Idle { .. }));

        let reminders = monitor.active_reminders();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].station_name, "Home Tower");
        assert_eq!(reminders[0].remaining_hours, 9);
        assert_eq!(notifier.sent().len(), 1);

        // 1000 / 5 - 90
        let list = monitor.shopping_list();
        assert_eq!(list.get(NITROGEN).unwrap().quantity, 110);
        assert_eq!(list.total_volume(), 550);

        tasks.shutdown().await;
        assert_eq!(monitor.scheduler_state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_resets_quantity_and_clears() {
        let gateway = gateway(100);
        let notifier = Arc::new(MockNotifier::new());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (monitor, tasks) =
            FleetMonitor::start(&settings(), gateway.clone(), notifier.clone(), store);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(monitor.active_reminders().len(), 1);

        // Refuelled upstream
        gateway.update(|data| {
            if let Some(details) = data.details.get_mut(&StationId::new(1)) {
                details.fuel[0].quantity = 500;
            }
        });
        monitor.trigger_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // 500 - 10 = 490 → 49h, episode over
        assert!(monitor.active_reminders().is_empty());
        assert_eq!(gateway.station_list_calls(), 2);
        assert_eq!(notifier.sent().len(), 1);

        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reads_during_backoff_do_not_retry() {
        let gateway = gateway(100);
        gateway.set_fail_upstream(true);
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::new());
        let (monitor, tasks) = FleetMonitor::start(&settings(), gateway.clone(), notifier, store);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.station_list_calls(), 1);

        // Expired (empty) snapshot read every second inside the 60s backoff
        for _ in 0..30 {
            assert!(monitor.load_snapshot().is_empty());
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(gateway.station_list_calls(), 1);
        assert!(matches!(monitor.scheduler_state(), SchedulerState::Idle { .. }));

        // A manual trigger still skips the backoff
        gateway.set_fail_upstream(false);
        monitor.trigger_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.station_list_calls(), 2);
        assert_eq!(monitor.load_snapshot().len(), 1);

        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn read_at_startup_does_not_queue_second_refresh() {
        let gateway = gateway(800);
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::new());
        let (monitor, tasks) = FleetMonitor::start(&settings(), gateway.clone(), notifier, store);

        assert!(monitor.load_snapshot().is_empty());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(gateway.station_list_calls(), 1);
        assert_eq!(monitor.load_snapshot().generation, 1);

        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_in_flight_refresh() {
        let gateway = gateway(800);
        gateway.set_station_list_delay(Some(Duration::from_secs(10)));
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let notifier = Arc::new(MockNotifier::new());
        let (monitor, tasks) = FleetMonitor::start(&settings(), gateway.clone(), notifier, store);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(monitor.scheduler_state(), SchedulerState::Refreshing);
        assert_eq!(monitor.load_snapshot().generation, 0);

        tasks.shutdown().await;

        // The refresh completed and swapped in a whole snapshot
        let snapshot = monitor.load_snapshot();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(monitor.scheduler_state(), SchedulerState::Stopped);
        assert_eq!(gateway.station_list_calls(), 1);
    }

    fn detached(cache: Arc<CacheStore>, state: SchedulerState) -> FleetMonitor {
        let (_state_tx, state) = watch::channel(state);
        FleetMonitor {
            cache,
            registry: Arc::new(Mutex::new(ReminderRegistry::new())),
            refresh_trigger: Trigger::new(),
            reminder_trigger: Trigger::new(),
            state,
            volume_per_unit: 5,
        }
    }

    async fn refresh_requested(monitor: &FleetMonitor) -> bool {
        tokio::time::timeout(Duration::from_millis(50), monitor.refresh_trigger.fired())
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn expired_snapshot_requests_refresh_when_wake_overdue() {
        let overdue = SchedulerState::Idle {
            next_wake: fuelwatch_util::now() - chrono::Duration::minutes(1),
        };
        let monitor = detached(Arc::new(CacheStore::new()), overdue);

        assert!(monitor.load_snapshot().is_empty());
        assert!(refresh_requested(&monitor).await);
    }

    #[tokio::test]
    async fn expired_snapshot_waits_for_scheduler() {
        let pending = [
            SchedulerState::Stopped,
            SchedulerState::Refreshing,
            SchedulerState::Idle {
                next_wake: fuelwatch_util::now() + chrono::Duration::minutes(1),
            },
        ];

        for state in pending {
            let monitor = detached(Arc::new(CacheStore::new()), state);
            monitor.load_snapshot();
            assert!(!refresh_requested(&monitor).await, "fired while {:?}", state);
        }
    }

    #[tokio::test]
    async fn fresh_snapshot_never_requests_refresh() {
        let now = fuelwatch_util::now();
        let cache = Arc::new(CacheStore::new());
        cache.replace(Vec::new(), now + chrono::Duration::hours(1), now);

        let overdue = SchedulerState::Idle {
            next_wake: now - chrono::Duration::minutes(1),
        };
        let monitor = detached(cache, overdue);

        assert_eq!(monitor.load_snapshot().generation, 1);
        assert!(!refresh_requested(&monitor).await);
    }
}
