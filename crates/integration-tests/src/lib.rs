//! Shared harness for garden API integration tests.
//!
//! Every test spawns its own full application on an ephemeral port, backed by
//! a fresh in-memory SQLite database and a scriptable stub geocoding service.
//! Nothing here talks to the network beyond loopback, so the suite runs
//! without credentials or external processes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use url::Url;

use garden_api::config::{GardenConfig, GeocodingConfig};
use garden_api::db::create_in_memory_pool;
use garden_api::state::AppState;

/// Stub geocoding service.
///
/// Tests script what the next lookup returns and can observe how many lookups
/// the application actually performed.
pub struct StubGeocoder {
    url: Url,
    calls: Arc<AtomicUsize>,
    response: Arc<Mutex<Value>>,
}

impl StubGeocoder {
    /// Spawn the stub on an ephemeral port. It starts with no scripted
    /// result, so lookups fail until [`respond_with`](Self::respond_with) is
    /// called.
    pub async fn spawn() -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let response = Arc::new(Mutex::new(json!({"status": "ZERO_RESULTS", "results": []})));

        let app = axum::Router::new().route("/geocode", {
            let calls = Arc::clone(&calls);
            let response = Arc::clone(&response);
            axum::routing::get(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let body = response.lock().expect("stub response lock").clone();
                async move { axum::Json(body) }
            })
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub geocoder");
        let addr = listener.local_addr().expect("Failed to read stub geocoder address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub geocoder exited");
        });

        Self {
            url: Url::parse(&format!("http://{addr}/geocode")).expect("Failed to build stub URL"),
            calls,
            response,
        }
    }

    /// Script the next lookups to resolve to the given location.
    pub fn respond_with(&self, latitude: f64, longitude: f64) {
        *self.response.lock().expect("stub response lock") = json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": latitude, "lng": longitude}}}]
        });
    }

    /// Script the next lookups to find nothing.
    pub fn respond_not_found(&self) {
        *self.response.lock().expect("stub response lock") =
            json!({"status": "ZERO_RESULTS", "results": []});
    }

    /// Number of lookups served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// One running application instance plus handles for assertions.
///
/// The pool is the same one the application uses, so tests can inspect rows
/// directly after driving the HTTP surface.
pub struct TestApp {
    pub client: reqwest::Client,
    pub base_url: String,
    pub pool: SqlitePool,
    pub geocoder: StubGeocoder,
}

impl TestApp {
    /// Spawn the full router on an ephemeral port with a fresh database.
    pub async fn spawn() -> Self {
        let geocoder = StubGeocoder::spawn().await;
        let pool = create_in_memory_pool()
            .await
            .expect("Failed to create test database");

        let config = GardenConfig {
            database_url: SecretString::from("sqlite::memory:"),
            host: "127.0.0.1".parse().expect("Failed to parse test host"),
            port: 0,
            geocoding: GeocodingConfig {
                base_url: geocoder.url.clone(),
                api_key: SecretString::from("test-key"),
                timeout: Duration::from_secs(2),
                cache_ttl: Duration::from_secs(300),
            },
            sentry_dsn: None,
        };

        let state = AppState::new(config, pool.clone()).expect("Failed to build application state");
        let app = garden_api::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read test server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server exited");
        });

        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            pool,
            geocoder,
        }
    }

    /// Absolute URL for a path on the test server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register a user through the API and return their bearer token.
    ///
    /// The email is derived from `name`, so each name registers at most once
    /// per instance.
    pub async fn register_user(&self, name: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/accounts/users"))
            .json(&json!({
                "email": format!("{name}@example.com"),
                "display_name": name,
            }))
            .send()
            .await
            .expect("Failed to send registration request");
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "registration failed for {name}"
        );

        let body: Value = response
            .json()
            .await
            .expect("Failed to parse registration response");
        body["api_token"]
            .as_str()
            .expect("Registration response missing api_token")
            .to_string()
    }
}
