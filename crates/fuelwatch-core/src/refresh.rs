//! Fetching a complete station snapshot through the gateway

use chrono::{DateTime, Local};
use fuelwatch_api::{FuelState, StationRecord};
use fuelwatch_config::FuelSettings;
use fuelwatch_gateway::{
    ApiCredential, Gateway, GatewayError, GatewayResult, StationDetails, StationSummary,
};
use fuelwatch_util::{RefreshId, deadline_after};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::{CoreError, CoreResult};

/// Run a gateway call under a time limit
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}

/// A complete, freshly fetched station set
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedFleet {
    pub stations: Vec<StationRecord>,
    /// Earliest upstream cache deadline across all credentials
    pub expiry: DateTime<Local>,
}

/// Assembles station records from the gateway.
///
/// Any failing call aborts the whole fetch; there are no partial results.
pub struct SnapshotFetcher {
    gateway: Arc<dyn Gateway>,
    fuel: FuelSettings,
    timeout: Duration,
    empty_fleet_interval: Duration,
}

impl SnapshotFetcher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        fuel: FuelSettings,
        timeout: Duration,
        empty_fleet_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            fuel,
            timeout,
            empty_fleet_interval,
        }
    }

    /// Fetch every station visible to every configured credential
    pub async fn fetch(
        &self,
        refresh_id: RefreshId,
        now: DateTime<Local>,
    ) -> CoreResult<FetchedFleet> {
        let credentials = with_timeout(self.timeout, self.gateway.load_all_credentials())
            .await
            .map_err(|e| CoreError::upstream("credentials", e))?;

        if credentials.is_empty() {
            debug!(%refresh_id, "No credentials configured, fleet is empty");
            return Ok(FetchedFleet {
                stations: Vec::new(),
                expiry: deadline_after(now, self.empty_fleet_interval),
            });
        }

        let mut stations = Vec::new();
        let mut expiry: Option<DateTime<Local>> = None;

        for credential in &credentials {
            let listing = with_timeout(self.timeout, self.gateway.fetch_station_list(credential))
                .await
                .map_err(|e| {
                    CoreError::upstream(format!("station list for key {}", credential.key_id), e)
                })?;

            trace!(
                %refresh_id,
                key_id = credential.key_id,
                station_count = listing.stations.len(),
                cached_until = %listing.cached_until,
                "Station list fetched"
            );

            for summary in &listing.stations {
                stations.push(self.fetch_station(credential, summary).await?);
            }

            expiry = Some(match expiry {
                Some(current) => current.min(listing.cached_until),
                None => listing.cached_until,
            });
        }

        Ok(FetchedFleet {
            stations,
            expiry: expiry.unwrap_or_else(|| deadline_after(now, self.empty_fleet_interval)),
        })
    }

    async fn fetch_station(
        &self,
        credential: &ApiCredential,
        summary: &StationSummary,
    ) -> CoreResult<StationRecord> {
        let gateway = &self.gateway;
        let limit = self.timeout;

        let details = with_timeout(limit, gateway.fetch_station_details(credential, summary.id))
            .await
            .map_err(|e| CoreError::upstream(format!("details of station {}", summary.id), e))?;

        let fuel = self.resolve_fuel(summary, &details).await?;

        let name = with_timeout(limit, gateway.lookup_station_name(summary.id))
            .await
            .map_err(|e| CoreError::reference(format!("name of station {}", summary.id), e))?;
        let type_name = with_timeout(limit, gateway.lookup_type_name(summary.type_id))
            .await
            .map_err(|e| CoreError::reference(format!("type name {}", summary.type_id), e))?;
        let location_name = with_timeout(limit, gateway.lookup_location_name(summary.location_id))
            .await
            .map_err(|e| CoreError::reference(format!("location {}", summary.location_id), e))?;
        let capacity = with_timeout(limit, gateway.lookup_capacity(summary.type_id))
            .await
            .map_err(|e| CoreError::reference(format!("capacity of {}", summary.type_id), e))?;

        Ok(StationRecord {
            id: summary.id,
            name,
            state: summary.state,
            type_id: summary.type_id,
            type_name,
            location_id: summary.location_id,
            location_name,
            capacity,
            fuel,
        })
    }

    /// The first recognized fuel in the bay, in upstream order
    async fn resolve_fuel(
        &self,
        summary: &StationSummary,
        details: &StationDetails,
    ) -> CoreResult<Option<FuelState>> {
        let Some(item) = details
            .fuel
            .iter()
            .find(|item| self.fuel.is_recognized(item.type_id))
        else {
            return Ok(None);
        };

        let usage_per_hour = with_timeout(
            self.timeout,
            self.gateway.lookup_fuel_usage(summary.type_id, item.type_id),
        )
        .await
        .map_err(|e| {
            CoreError::reference(format!("fuel usage {}/{}", summary.type_id, item.type_id), e)
        })?;
        let type_name = with_timeout(self.timeout, self.gateway.lookup_type_name(item.type_id))
            .await
            .map_err(|e| CoreError::reference(format!("type name {}", item.type_id), e))?;

        Ok(Some(FuelState {
            type_id: item.type_id,
            type_name,
            usage_per_hour,
            quantity: item.quantity,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelwatch_api::StationState;
    use fuelwatch_gateway::{FuelBayItem, MockGateway, StationListing};
    use fuelwatch_util::{LocationId, StationId, TypeId};

    const TOWER: TypeId = TypeId::new(12235);
    const NITROGEN: TypeId = TypeId::new(4051);
    const HYDROGEN: TypeId = TypeId::new(4246);
    const STRONTIUM: TypeId = TypeId::new(16275);
    const MOON: LocationId = LocationId::new(40009082);

    fn seeded_gateway() -> MockGateway {
        let gateway = MockGateway::new();
        gateway.update(|data| {
            data.fuel_usage.insert((TOWER, NITROGEN), 40);
            data.fuel_usage.insert((TOWER, HYDROGEN), 40);
            data.type_names.insert(TOWER, "Amarr Control Tower".into());
            data.type_names.insert(NITROGEN, "Nitrogen Fuel Block".into());
            data.type_names.insert(HYDROGEN, "Hydrogen Fuel Block".into());
            data.location_names.insert(MOON, "Jita IV - Moon 4".into());
            data.capacities.insert(TOWER, 140_000);
        });
        gateway
    }

    fn add_station(gateway: &MockGateway, key_id: i64, id: i64, fuel: Vec<FuelBayItem>) {
        let station_id = StationId::new(id);
        gateway.update(|data| {
            if !data.credentials.iter().any(|c| c.key_id == key_id) {
                data.credentials.push(ApiCredential::new(key_id, "code"));
            }
            let listing = data.listings.entry(key_id).or_insert_with(|| StationListing {
                stations: Vec::new(),
                cached_until: Local::now(),
            });
            listing.stations.push(StationSummary {
                id: station_id,
                type_id: TOWER,
                location_id: MOON,
                state: StationState::Online,
            });
            data.details.insert(
                station_id,
                StationDetails {
                    id: station_id,
                    state: StationState::Online,
                    fuel,
                },
            );
            data.station_names.insert(station_id, format!("Tower {}", id));
        });
    }

    fn fetcher(gateway: MockGateway) -> SnapshotFetcher {
        SnapshotFetcher::new(
            Arc::new(gateway),
            FuelSettings::default(),
            Duration::from_secs(5),
            Duration::from_secs(3600),
        )
    }

    fn item(type_id: TypeId, quantity: u64) -> FuelBayItem {
        FuelBayItem { type_id, quantity }
    }

    #[tokio::test]
    async fn assembles_records() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![item(STRONTIUM, 400), item(NITROGEN, 7_000)]);

        let fleet = fetcher(gateway).fetch(RefreshId::new(), Local::now()).await.unwrap();
        assert_eq!(fleet.stations.len(), 1);

        let record = &fleet.stations[0];
        assert_eq!(record.name, "Tower 100");
        assert_eq!(record.type_name, "Amarr Control Tower");
        assert_eq!(record.location_name, "Jita IV - Moon 4");
        assert_eq!(record.capacity, 140_000);

        let fuel = record.fuel.as_ref().unwrap();
        assert_eq!(fuel.type_id, NITROGEN);
        assert_eq!(fuel.type_name, "Nitrogen Fuel Block");
        assert_eq!(fuel.usage_per_hour, 40);
        assert_eq!(fuel.quantity, 7_000);
    }

    #[tokio::test]
    async fn first_recognized_fuel_wins() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![item(HYDROGEN, 10), item(NITROGEN, 20)]);

        let fleet = fetcher(gateway).fetch(RefreshId::new(), Local::now()).await.unwrap();
        let fuel = fleet.stations[0].fuel.as_ref().unwrap();
        assert_eq!(fuel.type_id, HYDROGEN);
        assert_eq!(fuel.quantity, 10);
    }

    #[tokio::test]
    async fn no_recognized_fuel_means_no_fuel_state() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![item(STRONTIUM, 400)]);

        let fleet = fetcher(gateway).fetch(RefreshId::new(), Local::now()).await.unwrap();
        assert!(fleet.stations[0].fuel.is_none());
    }

    #[tokio::test]
    async fn expiry_is_minimum_across_credentials() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![]);
        add_station(&gateway, 2, 200, vec![]);

        let now = Local::now();
        let early = now + chrono::Duration::minutes(10);
        let late = now + chrono::Duration::minutes(50);
        gateway.update(|data| {
            // Later credential reports the earlier deadline
            data.listings.get_mut(&1).unwrap().cached_until = late;
            data.listings.get_mut(&2).unwrap().cached_until = early;
        });

        let fleet = fetcher(gateway).fetch(RefreshId::new(), now).await.unwrap();
        assert_eq!(fleet.stations.len(), 2);
        assert_eq!(fleet.expiry, early);
    }

    #[tokio::test]
    async fn no_credentials_gives_empty_fleet() {
        let now = Local::now();
        let fleet = fetcher(MockGateway::new()).fetch(RefreshId::new(), now).await.unwrap();
        assert!(fleet.stations.is_empty());
        assert_eq!(fleet.expiry, deadline_after(now, Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn missing_reference_data_aborts() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![item(NITROGEN, 10)]);
        gateway.update(|data| {
            data.capacities.clear();
        });

        let result = fetcher(gateway).fetch(RefreshId::new(), Local::now()).await;
        assert!(matches!(result, Err(CoreError::ReferenceDataMissing { .. })));
    }

    #[tokio::test]
    async fn upstream_failure_aborts() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![]);
        gateway.set_fail_upstream(true);

        let result = fetcher(gateway).fetch(RefreshId::new(), Local::now()).await;
        assert!(matches!(result, Err(CoreError::UpstreamUnavailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let gateway = seeded_gateway();
        add_station(&gateway, 1, 100, vec![]);
        gateway.set_station_list_delay(Some(Duration::from_secs(60)));

        let result = fetcher(gateway).fetch(RefreshId::new(), Local::now()).await;
        match result {
            Err(CoreError::UpstreamUnavailable { source, .. }) => {
                assert!(matches!(source, GatewayError::Timeout(_)));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
