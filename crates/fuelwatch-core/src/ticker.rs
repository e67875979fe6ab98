//! Periodic reminder tick and notification dispatch

use fuelwatch_api::LowFuelStation;
use fuelwatch_config::ReminderSettings;
use fuelwatch_gateway::{Gateway, Notifier, NotifyError};
use fuelwatch_store::{AuditEvent, AuditEventType, Store};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::refresh::with_timeout;
use crate::{CacheStore, CoreError, DepletionEngine, ReminderRegistry, TickReport, Trigger};

/// Result of one tick including delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub report: TickReport,
    /// Recipients that received the batch
    pub delivered: usize,
    /// Recipients whose delivery failed
    pub failed: Vec<String>,
}

/// Owner of the reminder loop
pub struct ReminderTicker {
    cache: Arc<CacheStore>,
    registry: Arc<Mutex<ReminderRegistry>>,
    engine: DepletionEngine,
    gateway: Arc<dyn Gateway>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn Store>,
    settings: ReminderSettings,
    trigger: Trigger,
}

impl ReminderTicker {
    pub fn new(
        cache: Arc<CacheStore>,
        registry: Arc<Mutex<ReminderRegistry>>,
        gateway: Arc<dyn Gateway>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn Store>,
        settings: ReminderSettings,
        trigger: Trigger,
    ) -> Self {
        Self {
            cache,
            registry,
            engine: DepletionEngine::new(settings.low_fuel_threshold_hours),
            gateway,
            notifier,
            store,
            settings,
            trigger,
        }
    }

    /// Run one tick against the live snapshot and notify about newly low
    /// stations.
    ///
    /// Registry changes are committed before any delivery is attempted and
    /// are never rolled back.
    pub async fn run_tick(&mut self) -> TickOutcome {
        let now = fuelwatch_util::now();

        // Registry before cache; neither lock survives this block
        let report = {
            let mut registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let engine = &mut self.engine;
            self.cache
                .modify(|snapshot| engine.tick(&mut snapshot.stations, &mut registry, now))
        };

        for station in &report.raised {
            info!(
                station_id = %station.station_id,
                name = %station.name,
                remaining_hours = station.remaining_hours,
                "Station low on fuel"
            );
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ReminderRaised {
                station_id: station.station_id,
                station_name: station.name.clone(),
                remaining_hours: station.remaining_hours,
            }));
        }
        for station_id in &report.cleared {
            info!(station_id = %station_id, "Station refuelled, reminder cleared");
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::ReminderCleared {
                station_id: *station_id,
            }));
        }

        let mut outcome = TickOutcome::default();
        if report.raised.is_empty() {
            debug!(evaluated = report.evaluated, "No new low-fuel stations");
        } else {
            self.dispatch(&report.raised, &mut outcome).await;
        }
        outcome.report = report;
        outcome
    }

    async fn dispatch(&self, batch: &[LowFuelStation], outcome: &mut TickOutcome) {
        let limit = self.settings.gateway_timeout;

        let recipients = match with_timeout(limit, self.gateway.load_all_recipients()).await {
            Ok(recipients) => recipients,
            Err(e) => {
                error!(error = %e, batch_size = batch.len(), "Failed to load reminder recipients");
                return;
            }
        };

        for recipient in &recipients {
            let sent = match tokio::time::timeout(
                limit,
                self.notifier.send_fuel_reminder(recipient, batch),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(NotifyError::Timeout(limit)),
            };

            match sent {
                Ok(()) => {
                    debug!(
                        recipient = %recipient.username,
                        batch_size = batch.len(),
                        "Reminder sent"
                    );
                    outcome.delivered += 1;
                }
                Err(source) => {
                    let err = CoreError::NotificationDeliveryFailed {
                        recipient: recipient.username.clone(),
                        source,
                    };
                    warn!(error = %err, "Reminder delivery failed");
                    let _ = self.store.append_audit(AuditEvent::new(
                        AuditEventType::NotificationFailed {
                            recipient: recipient.username.clone(),
                            error: err.to_string(),
                        },
                    ));
                    outcome.failed.push(recipient.username.clone());
                }
            }
        }

        info!(
            batch_size = batch.len(),
            delivered = outcome.delivered,
            failed = outcome.failed.len(),
            "Fuel reminders dispatched"
        );
    }

    /// Tick loop: fixed interval plus manual triggers.
    ///
    /// Shutdown is only observed between ticks.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.settings.interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = period.as_secs(),
            threshold_hours = self.engine.threshold_hours(),
            "Reminder ticker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    debug!("Scheduled reminder check");
                }
                _ = self.trigger.fired() => {
                    debug!("Reminder check triggered");
                }
                result = shutdown.changed() => {
                    if result.is_err() {
                        break;
                    }
                    continue;
                }
            }

            self.run_tick().await;
        }

        info!("Reminder ticker stopped");
    }
}
