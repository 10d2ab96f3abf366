//! User repository for database operations.
//!
//! Queries are runtime-checked (`query_as` with row structs) so builds need
//! no live database.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use garden_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

/// Parameters for registering a new user.
#[derive(Debug)]
pub struct NewUser {
    /// Opaque public identifier, generated by the caller.
    pub public_id: Uuid,
    pub email: Email,
    pub display_name: String,
    pub introduction: String,
    pub avatar_url: Option<String>,
    /// Bearer token issued once at registration.
    pub api_token: String,
}

/// Internal row type for user queries.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    public_id: String,
    email: String,
    display_name: String,
    introduction: String,
    avatar_url: Option<String>,
    api_token: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let public_id = Uuid::parse_str(&self.public_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid public id in database: {e}"))
        })?;
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(self.id),
            public_id,
            email,
            display_name: self.display_name,
            introduction: self.introduction,
            avatar_url: self.avatar_url,
            api_token: self.api_token,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new user. The account starts active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users
                (public_id, email, display_name, introduction, avatar_url,
                 api_token, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING id, public_id, email, display_name, introduction,
                      avatar_url, api_token, is_active, created_at, updated_at
            ",
        )
        .bind(new_user.public_id.to_string())
        .bind(new_user.email.as_str())
        .bind(&new_user.display_name)
        .bind(&new_user.introduction)
        .bind(&new_user.avatar_url)
        .bind(&new_user.api_token)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_user()
    }

    /// Get a user by their public identifier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_public_id(&self, public_id: Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, public_id, email, display_name, introduction,
                   avatar_url, api_token, is_active, created_at, updated_at
            FROM users
            WHERE public_id = ?
            ",
        )
        .bind(public_id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get a user by their bearer token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_api_token(&self, api_token: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, public_id, email, display_name, introduction,
                   avatar_url, api_token, is_active, created_at, updated_at
            FROM users
            WHERE api_token = ?
            ",
        )
        .bind(api_token)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }
}
