//! Geocoding and travel-time lookups.
//!
//! [`GoogleMapsClient`] talks to the Google geocode and distance matrix JSON
//! APIs and caches answers in memory. [`DisabledRouting`] is used when no API
//! key is configured and answers `None` to everything.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use common::types::GeoPoint;
use configs::MapsConfig;

use crate::errors::ServiceError;
use crate::metrics::EXTERNAL_LOOKUP_FAILURES_TOTAL;

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Resolve a postal address. `Ok(None)` means the provider had no match.
    async fn geocode(&self, street: &str, city: &str, zip_code: &str) -> Result<Option<GeoPoint>, ServiceError>;

    /// Driving time in whole minutes (seconds / 60, rounded down).
    async fn eta_minutes(&self, origin: GeoPoint, dest: GeoPoint) -> Result<Option<i32>, ServiceError>;
}

/// Build the provider matching the configuration.
pub fn provider_from_config(cfg: &MapsConfig) -> anyhow::Result<std::sync::Arc<dyn RoutingProvider>> {
    match cfg.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => Ok(std::sync::Arc::new(GoogleMapsClient::new(key, cfg)?)),
        None => Ok(std::sync::Arc::new(DisabledRouting)),
    }
}

pub struct DisabledRouting;

#[async_trait]
impl RoutingProvider for DisabledRouting {
    async fn geocode(&self, _street: &str, _city: &str, _zip_code: &str) -> Result<Option<GeoPoint>, ServiceError> {
        Ok(None)
    }

    async fn eta_minutes(&self, _origin: GeoPoint, _dest: GeoPoint) -> Result<Option<i32>, ServiceError> {
        Ok(None)
    }
}

pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    geocode_cache: Cache<String, GeoPoint>,
    eta_cache: Cache<String, i32>,
}

impl GoogleMapsClient {
    pub fn new(api_key: &str, cfg: &MapsConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let ttl = Duration::from_secs(cfg.cache_ttl_secs);
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            geocode_cache: Cache::builder().max_capacity(10_000).time_to_live(ttl).build(),
            eta_cache: Cache::builder().max_capacity(10_000).time_to_live(ttl).build(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value, ServiceError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::External(format!("{path}: {e}")))?
            .error_for_status()
            .map_err(|e| ServiceError::External(format!("{path}: {e}")))?;
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| ServiceError::External(format!("{path}: invalid body: {e}")))
    }
}

#[async_trait]
impl RoutingProvider for GoogleMapsClient {
    #[instrument(skip(self))]
    async fn geocode(&self, street: &str, city: &str, zip_code: &str) -> Result<Option<GeoPoint>, ServiceError> {
        let address = format!("{street}, {city}, {zip_code}");
        let key = address.to_lowercase();
        if let Some(hit) = self.geocode_cache.get(&key).await {
            debug!("geocode cache hit");
            return Ok(Some(hit));
        }
        let body = match self.get_json("geocode/json", &[("address", address)]).await {
            Ok(b) => b,
            Err(e) => {
                EXTERNAL_LOOKUP_FAILURES_TOTAL.with_label_values(&["geocode"]).inc();
                warn!(error = %e, "geocode request failed");
                return Err(e);
            }
        };
        let point = parse_geocode(&body);
        if let Some(p) = point {
            self.geocode_cache.insert(key, p).await;
        }
        Ok(point)
    }

    #[instrument(skip(self))]
    async fn eta_minutes(&self, origin: GeoPoint, dest: GeoPoint) -> Result<Option<i32>, ServiceError> {
        let key = format!("{}|{}", origin.cache_key(), dest.cache_key());
        if let Some(hit) = self.eta_cache.get(&key).await {
            return Ok(Some(hit));
        }
        let query = [
            ("origins", format!("{},{}", origin.lat, origin.lng)),
            ("destinations", format!("{},{}", dest.lat, dest.lng)),
        ];
        let body = match self.get_json("distancematrix/json", &query).await {
            Ok(b) => b,
            Err(e) => {
                EXTERNAL_LOOKUP_FAILURES_TOTAL.with_label_values(&["eta"]).inc();
                warn!(error = %e, "distance matrix request failed");
                return Err(e);
            }
        };
        let minutes = parse_distance_matrix(&body);
        if let Some(m) = minutes {
            self.eta_cache.insert(key, m).await;
        }
        Ok(minutes)
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: GeoPoint,
}

#[derive(Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Deserialize)]
struct MatrixElement {
    duration: Option<MatrixValue>,
}

#[derive(Deserialize)]
struct MatrixValue {
    value: i64,
}

/// First result's location when the API answered `OK`.
pub fn parse_geocode(body: &serde_json::Value) -> Option<GeoPoint> {
    let resp: GeocodeResponse = serde_json::from_value(body.clone()).ok()?;
    if resp.status != "OK" {
        return None;
    }
    let loc = resp.results.into_iter().next()?.geometry.location;
    common::geo::valid_coordinates(loc.lat, loc.lng).then_some(loc)
}

/// Duration of the first element in minutes.
pub fn parse_distance_matrix(body: &serde_json::Value) -> Option<i32> {
    let resp: MatrixResponse = serde_json::from_value(body.clone()).ok()?;
    let secs = resp.rows.into_iter().next()?.elements.into_iter().next()?.duration?.value;
    i32::try_from(secs / 60).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn geocode_takes_first_ok_result() {
        let body = json!({
            "status": "OK",
            "results": [
                {"geometry": {"location": {"lat": 50.0875, "lng": 14.4213}}},
                {"geometry": {"location": {"lat": 1.0, "lng": 1.0}}}
            ]
        });
        assert_eq!(parse_geocode(&body), Some(GeoPoint::new(50.0875, 14.4213)));
    }

    #[test]
    fn geocode_non_ok_status_is_none() {
        assert_eq!(parse_geocode(&json!({"status": "ZERO_RESULTS", "results": []})), None);
        assert_eq!(parse_geocode(&json!({"status": "OK", "results": []})), None);
        assert_eq!(parse_geocode(&json!({"unexpected": true})), None);
    }

    #[test]
    fn matrix_duration_is_floored_to_minutes() {
        let body = json!({"rows": [{"elements": [{"status": "OK", "duration": {"value": 1799, "text": "30 mins"}}]}]});
        assert_eq!(parse_distance_matrix(&body), Some(29));
    }

    #[test]
    fn matrix_missing_duration_is_none() {
        let body = json!({"rows": [{"elements": [{"status": "NOT_FOUND"}]}]});
        assert_eq!(parse_distance_matrix(&body), None);
        assert_eq!(parse_distance_matrix(&json!({"rows": []})), None);
    }

    #[tokio::test]
    async fn disabled_routing_answers_none() {
        let r = DisabledRouting;
        assert_eq!(r.geocode("Main 1", "Praha", "11000").await.unwrap(), None);
        let p = GeoPoint::new(50.0, 14.0);
        assert_eq!(r.eta_minutes(p, p).await.unwrap(), None);
    }

    #[test]
    fn provider_selection_follows_api_key() {
        let mut cfg = MapsConfig::default();
        assert!(provider_from_config(&cfg).is_ok());
        cfg.api_key = Some("test-key".into());
        assert!(provider_from_config(&cfg).is_ok());
    }
}
