//! HTTP client for the upstream station API
//!
//! Both endpoints take the credential as query parameters:
//!
//! - `GET {base}/corp/stations` lists the stations visible to a key, together
//!   with the instant until which the upstream will serve the same answer.
//! - `GET {base}/corp/stations/{id}` returns the state and fuel bay of one
//!   station.
//!
//! State is transmitted as the numeric wire code (0-4).

use chrono::{DateTime, Local, Utc};
use fuelwatch_api::StationState;
use fuelwatch_config::UpstreamSettings;
use fuelwatch_gateway::{
    ApiCredential, FuelBayItem, GatewayError, GatewayResult, StationDetails, StationListing,
    StationSummary,
};
use fuelwatch_util::{LocationId, StationId, TypeId};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ListingPayload {
    cached_until: DateTime<Utc>,
    stations: Vec<SummaryPayload>,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    id: i64,
    type_id: i64,
    location_id: i64,
    state: i64,
}

#[derive(Debug, Deserialize)]
struct DetailsPayload {
    id: i64,
    state: i64,
    #[serde(default)]
    fuel: Vec<FuelPayload>,
}

#[derive(Debug, Deserialize)]
struct FuelPayload {
    type_id: i64,
    quantity: i64,
}

fn decode_state(code: i64) -> GatewayResult<StationState> {
    StationState::try_from(code).map_err(|e| GatewayError::Malformed(e.to_string()))
}

impl TryFrom<ListingPayload> for StationListing {
    type Error = GatewayError;

    fn try_from(payload: ListingPayload) -> GatewayResult<Self> {
        let stations = payload
            .stations
            .into_iter()
            .map(|s| {
                Ok(StationSummary {
                    id: StationId::new(s.id),
                    type_id: TypeId::new(s.type_id),
                    location_id: LocationId::new(s.location_id),
                    state: decode_state(s.state)?,
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(StationListing {
            stations,
            cached_until: payload.cached_until.with_timezone(&Local),
        })
    }
}

impl TryFrom<DetailsPayload> for StationDetails {
    type Error = GatewayError;

    fn try_from(payload: DetailsPayload) -> GatewayResult<Self> {
        let fuel = payload
            .fuel
            .into_iter()
            .map(|f| {
                let quantity = u64::try_from(f.quantity).map_err(|_| {
                    GatewayError::Malformed(format!(
                        "negative quantity {} for type {}",
                        f.quantity, f.type_id
                    ))
                })?;
                Ok(FuelBayItem {
                    type_id: TypeId::new(f.type_id),
                    quantity,
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(StationDetails {
            id: StationId::new(payload.id),
            state: decode_state(payload.state)?,
            fuel,
        })
    }
}

/// Upstream station API client
#[derive(Clone)]
pub struct HttpStationApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpStationApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStationApi")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpStationApi {
    pub fn new(settings: &UpstreamSettings) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .user_agent(concat!("fuelwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
        })
    }

    fn list_url(&self) -> String {
        format!("{}/corp/stations", self.base_url)
    }

    fn details_url(&self, station_id: StationId) -> String {
        format!("{}/corp/stations/{}", self.base_url, station_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &ApiCredential,
    ) -> GatewayResult<T> {
        let response = self
            .client
            .get(url)
            .query(&[
                ("key_id", credential.key_id.to_string()),
                ("vcode", credential.verification_code.clone()),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        debug!(url = %url, key_id = credential.key_id, status = %status, "Upstream responded");

        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(GatewayError::NotFound(url.to_string()));
            }
            s => {
                return Err(GatewayError::Unavailable(format!("{} returned {}", url, s)));
            }
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Unavailable(e.to_string())
        }
    }

    /// Station list visible to a credential
    pub async fn station_list(&self, credential: &ApiCredential) -> GatewayResult<StationListing> {
        let payload: ListingPayload = self.get_json(&self.list_url(), credential).await?;
        payload.try_into()
    }

    /// State and fuel bay of one station
    pub async fn station_details(
        &self,
        credential: &ApiCredential,
        station_id: StationId,
    ) -> GatewayResult<StationDetails> {
        let payload: DetailsPayload = self
            .get_json(&self.details_url(station_id), credential)
            .await?;
        payload.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> UpstreamSettings {
        UpstreamSettings {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let api = HttpStationApi::new(&settings("https://api.example.com/")).unwrap();
        assert_eq!(api.list_url(), "https://api.example.com/corp/stations");
        assert_eq!(
            api.details_url(StationId::new(1_000_001)),
            "https://api.example.com/corp/stations/1000001"
        );
    }

    #[test]
    fn decodes_listing() {
        let payload: ListingPayload = serde_json::from_str(
            r#"{
                "cached_until": "2025-12-25T14:30:00Z",
                "stations": [
                    {"id": 1000001, "type_id": 12235, "location_id": 40009082, "state": 4},
                    {"id": 1000002, "type_id": 12235, "location_id": 40009083, "state": 1}
                ]
            }"#,
        )
        .unwrap();

        let listing = StationListing::try_from(payload).unwrap();
        assert_eq!(listing.stations.len(), 2);
        assert_eq!(listing.stations[0].state, StationState::Online);
        assert_eq!(listing.stations[1].state, StationState::AnchoredOffline);
        assert_eq!(
            listing.cached_until.with_timezone(&Utc).to_rfc3339(),
            "2025-12-25T14:30:00+00:00"
        );
    }

    #[test]
    fn decodes_details_in_upstream_order() {
        let payload: DetailsPayload = serde_json::from_str(
            r#"{
                "id": 1000001,
                "state": 4,
                "fuel": [
                    {"type_id": 16275, "quantity": 400},
                    {"type_id": 4051, "quantity": 7000}
                ]
            }"#,
        )
        .unwrap();

        let details = StationDetails::try_from(payload).unwrap();
        assert_eq!(details.fuel.len(), 2);
        assert_eq!(details.fuel[0].type_id, TypeId::new(16275));
        assert_eq!(details.fuel[1].quantity, 7000);
    }

    #[test]
    fn rejects_unknown_state_and_negative_quantity() {
        let bad_state: DetailsPayload =
            serde_json::from_str(r#"{"id": 1, "state": 9}"#).unwrap();
        assert!(matches!(
            StationDetails::try_from(bad_state),
            Err(GatewayError::Malformed(_))
        ));

        let bad_quantity: DetailsPayload = serde_json::from_str(
            r#"{"id": 1, "state": 4, "fuel": [{"type_id": 4051, "quantity": -5}]}"#,
        )
        .unwrap();
        assert!(matches!(
            StationDetails::try_from(bad_quantity),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let api = HttpStationApi::new(&settings("http://127.0.0.1:9")).unwrap();
        let result = api.station_list(&ApiCredential::new(1, "code")).await;
        assert!(matches!(
            result,
            Err(GatewayError::Unavailable(_)) | Err(GatewayError::Timeout(_))
        ));
    }
}
