//! Mock gateway and notifier for testing

use async_trait::async_trait;
use fuelwatch_api::LowFuelStation;
use fuelwatch_util::{LocationId, StationId, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    ApiCredential, Gateway, GatewayError, GatewayResult, Notifier, NotifyError, NotifyResult,
    Recipient, StationDetails, StationListing,
};

/// In-memory reference and upstream data served by [`MockGateway`]
#[derive(Debug, Default, Clone)]
pub struct MockData {
    pub credentials: Vec<ApiCredential>,
    pub recipients: Vec<Recipient>,
    pub listings: HashMap<i64, StationListing>,
    pub details: HashMap<StationId, StationDetails>,
    pub fuel_usage: HashMap<(TypeId, TypeId), u64>,
    pub type_names: HashMap<TypeId, String>,
    pub location_names: HashMap<LocationId, String>,
    pub capacities: HashMap<TypeId, u64>,
    pub station_names: HashMap<StationId, String>,
}

/// Mock gateway for unit/integration testing
pub struct MockGateway {
    data: Arc<Mutex<MockData>>,

    /// Configure upstream fetches (list and details) to fail
    pub fail_upstream: Arc<Mutex<bool>>,

    /// Configure reference lookups to fail
    pub fail_lookups: Arc<Mutex<bool>>,

    /// Configure recipient loading to fail
    pub fail_recipients: Arc<Mutex<bool>>,

    /// Artificial latency for station list fetches
    pub station_list_delay: Arc<Mutex<Option<Duration>>>,

    station_list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_data(MockData::default())
    }

    pub fn with_data(data: MockData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            fail_upstream: Arc::new(Mutex::new(false)),
            fail_lookups: Arc::new(Mutex::new(false)),
            fail_recipients: Arc::new(Mutex::new(false)),
            station_list_delay: Arc::new(Mutex::new(None)),
            station_list_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Mutate the served data
    pub fn update(&self, f: impl FnOnce(&mut MockData)) {
        f(&mut self.data.lock().unwrap());
    }

    pub fn set_fail_upstream(&self, fail: bool) {
        *self.fail_upstream.lock().unwrap() = fail;
    }

    pub fn set_fail_lookups(&self, fail: bool) {
        *self.fail_lookups.lock().unwrap() = fail;
    }

    pub fn set_station_list_delay(&self, delay: Option<Duration>) {
        *self.station_list_delay.lock().unwrap() = delay;
    }

    /// Number of station list fetches so far
    pub fn station_list_calls(&self) -> usize {
        self.station_list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of station list fetches observed running at once
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_upstream(&self) -> GatewayResult<()> {
        if *self.fail_upstream.lock().unwrap() {
            return Err(GatewayError::Unavailable("Mock upstream failure".into()));
        }
        Ok(())
    }

    fn check_lookups(&self) -> GatewayResult<()> {
        if *self.fail_lookups.lock().unwrap() {
            return Err(GatewayError::NotFound("Mock lookup failure".into()));
        }
        Ok(())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn missing<T>(what: impl std::fmt::Display) -> GatewayResult<T> {
    Err(GatewayError::NotFound(what.to_string()))
}

#[async_trait]
impl Gateway for MockGateway {
    async fn load_all_credentials(&self) -> GatewayResult<Vec<ApiCredential>> {
        self.check_lookups()?;
        Ok(self.data.lock().unwrap().credentials.clone())
    }

    async fn load_all_recipients(&self) -> GatewayResult<Vec<Recipient>> {
        if *self.fail_recipients.lock().unwrap() {
            return Err(GatewayError::Unavailable("Mock recipient failure".into()));
        }
        Ok(self.data.lock().unwrap().recipients.clone())
    }

    async fn fetch_station_list(
        &self,
        credential: &ApiCredential,
    ) -> GatewayResult<StationListing> {
        self.station_list_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.station_list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check_upstream()?;
        match self.data.lock().unwrap().listings.get(&credential.key_id) {
            Some(listing) => Ok(listing.clone()),
            None => missing(format!("listing for key {}", credential.key_id)),
        }
    }

    async fn fetch_station_details(
        &self,
        _credential: &ApiCredential,
        station_id: StationId,
    ) -> GatewayResult<StationDetails> {
        self.check_upstream()?;
        match self.data.lock().unwrap().details.get(&station_id) {
            Some(details) => Ok(details.clone()),
            None => missing(format!("details for station {}", station_id)),
        }
    }

    async fn lookup_fuel_usage(
        &self,
        station_type: TypeId,
        fuel_type: TypeId,
    ) -> GatewayResult<u64> {
        self.check_lookups()?;
        match self.data.lock().unwrap().fuel_usage.get(&(station_type, fuel_type)) {
            Some(usage) => Ok(*usage),
            None => missing(format!("fuel usage for {}/{}", station_type, fuel_type)),
        }
    }

    async fn lookup_type_name(&self, type_id: TypeId) -> GatewayResult<String> {
        self.check_lookups()?;
        match self.data.lock().unwrap().type_names.get(&type_id) {
            Some(name) => Ok(name.clone()),
            None => missing(format!("type {}", type_id)),
        }
    }

    async fn lookup_location_name(&self, location_id: LocationId) -> GatewayResult<String> {
        self.check_lookups()?;
        match self.data.lock().unwrap().location_names.get(&location_id) {
            Some(name) => Ok(name.clone()),
            None => missing(format!("location {}", location_id)),
        }
    }

    async fn lookup_capacity(&self, station_type: TypeId) -> GatewayResult<u64> {
        self.check_lookups()?;
        match self.data.lock().unwrap().capacities.get(&station_type) {
            Some(capacity) => Ok(*capacity),
            None => missing(format!("capacity of {}", station_type)),
        }
    }

    async fn lookup_station_name(&self, station_id: StationId) -> GatewayResult<String> {
        self.check_lookups()?;
        match self.data.lock().unwrap().station_names.get(&station_id) {
            Some(name) => Ok(name.clone()),
            None => missing(format!("station name {}", station_id)),
        }
    }
}

/// A reminder recorded by [`MockNotifier`]
#[derive(Debug, Clone)]
pub struct SentReminder {
    pub recipient: Recipient,
    pub batch: Vec<LowFuelStation>,
}

/// Mock notifier recording every delivery
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentReminder>>,

    /// Usernames whose deliveries fail
    pub fail_for: Arc<Mutex<HashSet<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, username: impl Into<String>) {
        self.fail_for.lock().unwrap().insert(username.into());
    }

    /// Successfully delivered reminders
    pub fn sent(&self) -> Vec<SentReminder> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_fuel_reminder(
        &self,
        recipient: &Recipient,
        batch: &[LowFuelStation],
    ) -> NotifyResult<()> {
        if self.fail_for.lock().unwrap().contains(&recipient.username) {
            return Err(NotifyError::Rejected(format!(
                "Mock delivery failure for {}",
                recipient.username
            )));
        }

        self.sent.lock().unwrap().push(SentReminder {
            recipient: recipient.clone(),
            batch: batch.to_vec(),
        });
        Ok(())
    }
}
