//! Account handlers: registration and public profile lookup.
//!
//! Registration issues the account's opaque bearer token. The token appears
//! in the registration response only; there is no rotation or recovery.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use garden_core::Email;

use crate::db::users::NewUser;
use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result, ValidationErrors};
use crate::models::User;
use crate::routes::required_string;
use crate::state::AppState;

/// Public profile shape for a user. The numeric row ID and the API token
/// stay internal.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uid: Uuid,
    pub email: Email,
    pub display_name: String,
    pub introduction: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.public_id,
            email: user.email,
            display_name: user.display_name,
            introduction: user.introduction,
            avatar_url: user.avatar_url,
            is_active: user.is_active,
        }
    }
}

/// Response for a successful registration: the profile plus the one-time
/// bearer token.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub uid: Uuid,
    pub email: Email,
    pub display_name: String,
    pub introduction: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub api_token: String,
}

impl From<User> for RegisterResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.public_id,
            email: user.email,
            display_name: user.display_name,
            introduction: user.introduction,
            avatar_url: user.avatar_url,
            is_active: user.is_active,
            api_token: user.api_token,
        }
    }
}

/// Request for registering a user.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: Option<String>,
    display_name: Option<String>,
    introduction: Option<String>,
    avatar_url: Option<String>,
}

/// Generate an opaque 256-bit bearer token, URL-safe base64 without padding.
fn generate_api_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Register a user and issue their API token.
///
/// # Errors
///
/// Returns a field-level error map if a required field is missing, the email
/// is malformed, or the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let mut errors = ValidationErrors::new();
    let display_name = required_string(&mut errors, "display_name", body.display_name);
    let raw_email = required_string(&mut errors, "email", body.email);
    if !raw_email.is_empty() && Email::parse(&raw_email).is_err() {
        errors.add("email", "Enter a valid email address.");
    }
    errors.into_result()?;

    let email = Email::parse(&raw_email)
        .map_err(|_| AppError::field("email", "Enter a valid email address."))?;

    let new_user = NewUser {
        public_id: Uuid::new_v4(),
        email,
        display_name,
        introduction: body.introduction.unwrap_or_default(),
        avatar_url: body.avatar_url,
        api_token: generate_api_token(),
    };

    let user = match UserRepository::new(state.pool()).create(&new_user).await {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AppError::field(
                "email",
                "A user with this email already exists.",
            ));
        }
        Err(e) => return Err(e.into()),
    };
    debug!(uid = %user.public_id, "Registered user");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get a user's public profile by their UUID.
///
/// # Errors
///
/// Returns 404 if no user has this UUID.
pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    let user = UserRepository::new(state.pool())
        .get_by_public_id(uid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_tokens_are_unique_and_url_safe() {
        let a = generate_api_token();
        let b = generate_api_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
