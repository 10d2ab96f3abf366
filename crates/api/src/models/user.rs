//! User domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use garden_core::{Email, UserId};

/// A registered account (domain type).
///
/// Clients only ever see `public_id`; the numeric `id` stays internal.
#[derive(Debug, Clone)]
pub struct User {
    /// Internal numeric ID.
    pub id: UserId,
    /// Opaque public identifier exposed by the API.
    pub public_id: Uuid,
    /// User's email address.
    pub email: Email,
    /// Name shown on profiles and reviews.
    pub display_name: String,
    /// Free-form self introduction. Empty by default.
    pub introduction: String,
    /// Avatar image URL, if one was set.
    pub avatar_url: Option<String>,
    /// Opaque bearer token issued once at registration.
    pub api_token: String,
    /// Deactivated accounts keep their rows but cannot authenticate.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}
