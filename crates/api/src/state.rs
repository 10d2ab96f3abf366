//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::GardenConfig;
use crate::services::{GeocodeError, GeocodingClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GardenConfig,
    pool: SqlitePool,
    geocoder: GeocodingClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Garden configuration
    /// * `pool` - `SQLite` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the geocoding client cannot be built.
    pub fn new(config: GardenConfig, pool: SqlitePool) -> Result<Self, GeocodeError> {
        let geocoder = GeocodingClient::new(&config.geocoding)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                geocoder,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &GardenConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the geocoding client.
    #[must_use]
    pub fn geocoder(&self) -> &GeocodingClient {
        &self.inner.geocoder
    }
}
