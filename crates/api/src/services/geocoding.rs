//! Geocoding client for address-to-coordinate resolution.
//!
//! Talks to a Google-geocode-shaped HTTP service. Resolution is best effort:
//! the public entry point logs failures and reports them as `None`, so a shop
//! save never fails because the mapping service is down. Successful lookups
//! are cached with a TTL; failures are never cached, which lets the next save
//! retry.

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use garden_core::{Coordinates, CoordinatesError};

use crate::config::GeocodingConfig;

/// Errors that can occur when looking up an address.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Service answered but reported a non-OK geocoding status.
    #[error("Geocoding status {status}: {message}")]
    Status { status: String, message: String },

    /// The address matched nothing.
    #[error("No geocoding results")]
    NoResults,

    /// The returned location is outside the valid coordinate ranges.
    #[error("Invalid coordinates in response: {0}")]
    Coordinates(#[from] CoordinatesError),

    /// Failed to parse the response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the external geocoding service.
///
/// Successful resolutions are cached by rendered address for the configured
/// TTL.
#[derive(Clone)]
pub struct GeocodingClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    cache: Cache<String, Coordinates>,
}

impl GeocodingClient {
    /// Create a new geocoding client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            cache,
        })
    }

    /// Resolve a rendered address to coordinates, best effort.
    ///
    /// Returns `None` after logging on any failure: transport error, non-OK
    /// service status, empty or malformed response, out-of-range location.
    pub async fn resolve(&self, address: &str) -> Option<Coordinates> {
        if let Some(coordinates) = self.cache.get(address).await {
            debug!(address, "Geocoding cache hit");
            return Some(coordinates);
        }

        match self.lookup(address).await {
            Ok(coordinates) => {
                self.cache.insert(address.to_string(), coordinates).await;
                debug!(
                    address,
                    latitude = coordinates.latitude(),
                    longitude = coordinates.longitude(),
                    "Resolved address"
                );
                Some(coordinates)
            }
            Err(e) => {
                warn!(address, error = %e, "Geocoding failed");
                None
            }
        }
    }

    /// Single lookup against the service, bypassing the cache.
    async fn lookup(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[("address", address), ("key", self.api_key.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        if body.status != "OK" {
            return Err(GeocodeError::Status {
                status: body.status,
                message: body.error_message.unwrap_or_default(),
            });
        }

        let location = body
            .results
            .into_iter()
            .next()
            .ok_or(GeocodeError::NoResults)?
            .geometry
            .location;

        Ok(Coordinates::new(location.lat, location.lng)?)
    }
}

/// Response envelope from the geocoding service.
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

/// One geocoding match.
#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Spawn a stub geocoding server that always answers with `body` and
    /// counts how many requests it served.
    async fn spawn_stub(body: serde_json::Value) -> (Url, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let app = axum::Router::new().route(
            "/geocode",
            axum::routing::get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let body = body.clone();
                async move { axum::Json(body) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}/geocode")).unwrap();
        (url, calls)
    }

    fn config_for(base_url: Url) -> GeocodingConfig {
        GeocodingConfig {
            base_url,
            api_key: SecretString::from("test-key"),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(300),
        }
    }

    #[tokio::test]
    async fn test_resolve_caches_successful_lookups() {
        let body = serde_json::json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 35.6812, "lng": 139.7671}}}]
        });
        let (url, calls) = spawn_stub(body).await;
        let client = GeocodingClient::new(&config_for(url)).unwrap();

        let first = client.resolve("東京都千代田区丸の内1-9-1").await.unwrap();
        assert_eq!(first.latitude(), 35.6812);
        assert_eq!(first.longitude(), 139.7671);

        let second = client.resolve("東京都千代田区丸の内1-9-1").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_does_not_cache_failures() {
        let body = serde_json::json!({"status": "ZERO_RESULTS", "results": []});
        let (url, calls) = spawn_stub(body).await;
        let client = GeocodingClient::new(&config_for(url)).unwrap();

        assert!(client.resolve("no such place").await.is_none());
        assert!(client.resolve("no such place").await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_rejects_out_of_range_location() {
        let body = serde_json::json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 95.0, "lng": 139.0}}}]
        });
        let (url, _calls) = spawn_stub(body).await;
        let client = GeocodingClient::new(&config_for(url)).unwrap();

        assert!(client.resolve("somewhere").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_survives_unreachable_service() {
        // Nothing listens on port 9; connection errors must come back as None
        let url = Url::parse("http://127.0.0.1:9/geocode").unwrap();
        let mut config = config_for(url);
        config.timeout = Duration::from_secs(1);
        let client = GeocodingClient::new(&config).unwrap();

        assert!(client.resolve("東京都渋谷区神南1-1-1").await.is_none());
    }
}
