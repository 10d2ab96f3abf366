//! Database operations for the garden `SQLite` database.
//!
//! ## Tables
//!
//! - `users` - Accounts with opaque API tokens
//! - `addresses` - One structured address per shop
//! - `shops` - Core directory entries
//! - `shop_types` / `shop_concepts` / `shop_layouts` - Tag vocabularies
//! - `shop_type_links` / `shop_concept_links` / `shop_layout_links` - Shop/tag junctions
//! - `shop_photos` - Photo URLs attached to shops
//! - `reviews` / `review_photos` - User reviews and their photos
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/api/migrations/` and applied at
//! startup via [`MIGRATOR`].

pub mod photos;
pub mod reviews;
pub mod shops;
pub mod tags;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use photos::ShopPhotoRepository;
pub use reviews::ReviewRepository;
pub use shops::ShopRepository;
pub use tags::TagRepository;
pub use users::UserRepository;

/// Embedded migrations from `crates/api/migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// The database file is created if missing. Foreign key enforcement is
/// enabled per connection; `SQLite` ships with it off.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create an in-memory pool with migrations applied, for tests.
///
/// Each `SQLite` in-memory connection is its own empty database, so the pool
/// is capped at a single connection that is never reaped. Repositories drain
/// every query through that one connection; nothing here holds a connection
/// while acquiring another.
///
/// # Errors
///
/// Returns `sqlx::Error` if the pool cannot be created or migrations fail.
pub async fn create_in_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
