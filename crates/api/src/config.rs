//! Garden API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GARDEN_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`)
//! - `GEOCODING_API_KEY` - API key for the geocoding service
//!
//! ## Optional
//! - `GARDEN_HOST` - Bind address (default: 127.0.0.1)
//! - `GARDEN_PORT` - Listen port (default: 8000)
//! - `GEOCODING_BASE_URL` - Geocoding endpoint
//!   (default: `https://maps.googleapis.com/maps/api/geocode/json`)
//! - `GEOCODING_TIMEOUT_SECS` - Per-request timeout for geocoding calls (default: 10)
//! - `GEOCODING_CACHE_TTL_SECS` - TTL for cached geocoding results (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Garden application configuration.
#[derive(Debug, Clone)]
pub struct GardenConfig {
    /// `SQLite` connection string (may embed a filesystem path)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Geocoding service configuration
    pub geocoding: GeocodingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Geocoding service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeocodingConfig {
    /// Endpoint of the Google-geocode-shaped service
    pub base_url: Url,
    /// API key sent with every lookup
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long a successful resolution stays cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for GeocodingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodingConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl GardenConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GARDEN_DATABASE_URL")?;
        let host = get_env_or_default("GARDEN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GARDEN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("GARDEN_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GARDEN_PORT".to_string(), e.to_string()))?;

        let geocoding = GeocodingConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            geocoding,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GeocodingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default(
            "GEOCODING_BASE_URL",
            "https://maps.googleapis.com/maps/api/geocode/json",
        );
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("GEOCODING_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            api_key: get_required_secret("GEOCODING_API_KEY")?,
            timeout: get_duration_secs("GEOCODING_TIMEOUT_SECS", 10)?,
            cache_ttl: get_duration_secs("GEOCODING_CACHE_TTL_SECS", 300)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole-second duration from an environment variable.
fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    let secs = value
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(Duration::from_secs(secs))
}
