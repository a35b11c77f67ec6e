use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::error::RuleError;

/// Maximum number of concurrent in-flight geocode lookups (§4.1).
const MAX_CONCURRENT_LOOKUPS: usize = 10;
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A geocoded point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Great-circle distance in miles, using the Earth radius the spec
    /// mandates (3959 mi) rather than a more precise WGS-84 ellipsoid model.
    #[must_use]
    pub fn distance_miles(self, other: Self) -> f64 {
        const EARTH_RADIUS_MILES: f64 = 3959.0;
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_MILES * c
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
    #[allow(dead_code)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

/// HTTP client for the geocoding API (§6). A thin wrapper so the cache can
/// be unit-tested against a mock implementation.
#[derive(Debug, Clone)]
pub struct GeocoderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeocoderClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), api_key }
    }

    /// Geocode a free-form address string. Returns `Ok(None)` when the
    /// provider has no result for the query (not an error).
    #[tracing::instrument(skip(self), fields(query = %query))]
    pub async fn geocode(&self, query: &str) -> Result<Option<LatLng>, RuleError> {
        let mut req = self.http.get(&self.base_url).query(&[("address", query)]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key)]);
        }
        let resp = tokio::time::timeout(LOOKUP_TIMEOUT, req.send())
            .await
            .map_err(|_| RuleError::GeocoderTimeout)??;
        let parsed: GeocodeResponse = resp
            .json()
            .await
            .map_err(|e| RuleError::GeocoderResponse(e.to_string()))?;
        Ok(parsed
            .results
            .first()
            .map(|r| LatLng { lat: r.geometry.location.lat, lng: r.geometry.location.lng }))
    }
}

/// Process-wide cache of geocoding lookups, keyed by the query string. A
/// cached `None` means "looked up, no result" and is never re-queried
/// (§4.1: "Failed lookups cache null to avoid re-querying").
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: DashMap<String, Option<LatLng>>,
}

impl GeocodeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_cached(&self, key: &str) -> Option<Option<LatLng>> {
        self.entries.get(key).map(|v| *v)
    }

    /// Resolve every key in `keys` not already cached, with bounded
    /// concurrency, and populate the cache in place. Errors from individual
    /// lookups are swallowed as cache misses (`None`) -- the caller logs via
    /// `tracing` and the predicate simply fails to match, matching the
    /// batch-level "errors are logged and counted but don't abort" policy
    /// used elsewhere in the system.
    pub async fn warm(&self, keys: impl IntoIterator<Item = String>, client: &GeocoderClient) {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_LOOKUPS));
        let pending: Vec<String> =
            keys.into_iter().filter(|k| !self.entries.contains_key(k)).collect();

        let futures = pending.into_iter().map(|key| {
            let semaphore = Arc::clone(&semaphore);
            let client = client.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let result = client.geocode(&key).await;
                (key, result)
            }
        });

        let results = futures::future::join_all(futures).await;
        for (key, result) in results {
            match result {
                Ok(point) => {
                    self.entries.insert(key, point);
                }
                Err(err) => {
                    tracing::warn!(error = %err, key = %key, "geocode lookup failed, caching as miss");
                    self.entries.insert(key, None);
                }
            }
        }
    }
}
