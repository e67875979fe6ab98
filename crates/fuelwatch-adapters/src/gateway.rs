//! Production gateway: HTTP upstream plus SQLite reference data

use async_trait::async_trait;
use fuelwatch_gateway::{
    ApiCredential, Gateway, GatewayError, GatewayResult, Recipient, StationDetails,
    StationListing,
};
use fuelwatch_store::{Store, StoreError};
use fuelwatch_util::{LocationId, StationId, TypeId};
use std::sync::Arc;

use crate::HttpStationApi;

fn from_store(e: StoreError) -> GatewayError {
    match e {
        StoreError::NotFound(what) => GatewayError::NotFound(what),
        StoreError::InvalidValue { table, value } => {
            GatewayError::Malformed(format!("{} holds {}", table, value))
        }
        other => GatewayError::Internal(other.to_string()),
    }
}

/// Gateway combining the upstream API with locally stored reference data
pub struct ServiceGateway {
    upstream: HttpStationApi,
    store: Arc<dyn Store>,
}

impl ServiceGateway {
    pub fn new(upstream: HttpStationApi, store: Arc<dyn Store>) -> Self {
        Self { upstream, store }
    }
}

#[async_trait]
impl Gateway for ServiceGateway {
    async fn load_all_credentials(&self) -> GatewayResult<Vec<ApiCredential>> {
        self.store.credentials().map_err(from_store)
    }

    async fn load_all_recipients(&self) -> GatewayResult<Vec<Recipient>> {
        self.store.recipients().map_err(from_store)
    }

    async fn fetch_station_list(
        &self,
        credential: &ApiCredential,
    ) -> GatewayResult<StationListing> {
        self.upstream.station_list(credential).await
    }

    async fn fetch_station_details(
        &self,
        credential: &ApiCredential,
        station_id: StationId,
    ) -> GatewayResult<StationDetails> {
        self.upstream.station_details(credential, station_id).await
    }

    async fn lookup_fuel_usage(
        &self,
        station_type: TypeId,
        fuel_type: TypeId,
    ) -> GatewayResult<u64> {
        self.store.fuel_usage(station_type, fuel_type).map_err(from_store)
    }

    async fn lookup_type_name(&self, type_id: TypeId) -> GatewayResult<String> {
        self.store.type_name(type_id).map_err(from_store)
    }

    async fn lookup_location_name(&self, location_id: LocationId) -> GatewayResult<String> {
        self.store.location_name(location_id).map_err(from_store)
    }

    async fn lookup_capacity(&self, station_type: TypeId) -> GatewayResult<u64> {
        self.store.capacity(station_type).map_err(from_store)
    }

    async fn lookup_station_name(&self, station_id: StationId) -> GatewayResult<String> {
        self.store.station_name(station_id).map_err(from_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelwatch_config::UpstreamSettings;
    use fuelwatch_store::SqliteStore;
    use std::time::Duration;

    fn gateway(store: Arc<SqliteStore>) -> ServiceGateway {
        let upstream = HttpStationApi::new(&UpstreamSettings {
            base_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        ServiceGateway::new(upstream, store)
    }

    #[tokio::test]
    async fn lookups_come_from_store() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .set_fuel_usage(TypeId::new(12235), TypeId::new(4051), 40)
            .unwrap();
        store
            .set_station_name(StationId::new(1), "Home Tower")
            .unwrap();
        store.add_credential(&ApiCredential::new(7, "code")).unwrap();
        store
            .add_recipient(&Recipient::new("alice", "alice@example.com"))
            .unwrap();

        let gateway = gateway(store);
        assert_eq!(
            gateway
                .lookup_fuel_usage(TypeId::new(12235), TypeId::new(4051))
                .await
                .unwrap(),
            40
        );
        assert_eq!(
            gateway.lookup_station_name(StationId::new(1)).await.unwrap(),
            "Home Tower"
        );
        assert_eq!(gateway.load_all_credentials().await.unwrap().len(), 1);
        assert_eq!(gateway.load_all_recipients().await.unwrap()[0].username, "alice");
    }

    #[tokio::test]
    async fn missing_reference_maps_to_not_found() {
        let gateway = gateway(Arc::new(SqliteStore::in_memory().unwrap()));
        assert!(matches!(
            gateway.lookup_capacity(TypeId::new(12235)).await,
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            gateway.lookup_location_name(LocationId::new(1)).await,
            Err(GatewayError::NotFound(_))
        ));
    }
}
