//! Refresh scheduler
//!
//! A single task owns every refresh. It sleeps until the cache deadline (or
//! a bounded backoff after a failure) and wakes early on a manual trigger.
//! Triggers are coalesced: however many arrive while a refresh is in flight,
//! exactly one follow-up refresh runs.

use chrono::{DateTime, Local};
use fuelwatch_api::{CacheSnapshot, SchedulerState};
use fuelwatch_config::RefreshSettings;
use fuelwatch_store::{AuditEvent, AuditEventType, Store};
use fuelwatch_util::{RefreshId, deadline_after, duration_until};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info};

use crate::{CacheStore, CoreResult, SnapshotFetcher};

/// Coalescing wake-up signal.
///
/// Firing while nobody waits stores a single permit, so any number of
/// fires before the next wait result in one wake-up.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    notify: Arc<Notify>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.notify.notify_one();
    }

    pub(crate) async fn fired(&self) {
        self.notify.notified().await;
    }
}

/// Owner of the refresh loop
pub struct RefreshScheduler {
    fetcher: SnapshotFetcher,
    cache: Arc<CacheStore>,
    store: Arc<dyn Store>,
    settings: RefreshSettings,
    refresh_trigger: Trigger,
    reminder_trigger: Trigger,
    state: watch::Sender<SchedulerState>,
}

impl RefreshScheduler {
    pub fn new(
        fetcher: SnapshotFetcher,
        cache: Arc<CacheStore>,
        store: Arc<dyn Store>,
        settings: RefreshSettings,
        refresh_trigger: Trigger,
        reminder_trigger: Trigger,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            fetcher,
            cache,
            store,
            settings,
            refresh_trigger,
            reminder_trigger,
            state,
        }
    }

    /// Observe scheduler state transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run a single refresh attempt.
    ///
    /// On success the cache is swapped and the new snapshot returned. On
    /// failure the cache is left exactly as it was.
    pub async fn refresh_once(&self) -> CoreResult<Arc<CacheSnapshot>> {
        let refresh_id = RefreshId::new();
        let started = fuelwatch_util::now();
        debug!(%refresh_id, "Refreshing station cache");

        match self.fetcher.fetch(refresh_id, started).await {
            Ok(fleet) => {
                let refreshed_at = fuelwatch_util::now();
                let snapshot = self.cache.replace(fleet.stations, fleet.expiry, refreshed_at);

                info!(
                    %refresh_id,
                    station_count = snapshot.stations.len(),
                    expiry = %fleet.expiry,
                    generation = snapshot.generation,
                    "Station cache refreshed"
                );

                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::RefreshCompleted {
                        refresh_id,
                        station_count: snapshot.stations.len(),
                        expiry: fleet.expiry,
                    },
                ));

                Ok(snapshot)
            }
            Err(e) => {
                error!(%refresh_id, error = %e, "Refresh failed, keeping stale cache");

                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::RefreshFailed {
                    refresh_id,
                    error: e.to_string(),
                }));

                Err(e)
            }
        }
    }

    /// When to wake after an attempt finished at `now`
    pub fn next_wake(
        &self,
        outcome: &CoreResult<Arc<CacheSnapshot>>,
        now: DateTime<Local>,
    ) -> DateTime<Local> {
        match outcome {
            Ok(snapshot) => {
                let earliest = deadline_after(now, self.settings.min_interval);
                snapshot.expiry.map_or(earliest, |expiry| expiry.max(earliest))
            }
            Err(_) => deadline_after(now, self.settings.retry_backoff),
        }
    }

    /// Refresh loop. The first refresh runs immediately.
    ///
    /// Shutdown is only observed while idle; an in-flight refresh completes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Refresh scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.state.send_replace(SchedulerState::Refreshing);
            let outcome = self.refresh_once().await;
            if outcome.is_ok() {
                self.reminder_trigger.fire();
            }

            let now = fuelwatch_util::now();
            let next_wake = self.next_wake(&outcome, now);
            self.state.send_replace(SchedulerState::Idle { next_wake });
            debug!(next_wake = %next_wake, "Next refresh scheduled");

            tokio::select! {
                _ = tokio::time::sleep(duration_until(next_wake, now)) => {
                    debug!("Cache deadline reached");
                }
                _ = self.refresh_trigger.fired() => {
                    debug!("Refresh triggered");
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!("Refresh scheduler stopped");
    }
}
