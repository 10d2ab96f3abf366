//! Authentication extractor for bearer-token requests.
//!
//! Registration hands each user an opaque API token. Requests present it as
//! `Authorization: Bearer <token>`; the extractor resolves it to the stored
//! user and rejects unknown tokens and inactive accounts.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     CurrentUser(user): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

        let user = UserRepository::new(state.pool())
            .get_by_api_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token.".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("User inactive or deleted.".to_string()));
        }

        // Associate subsequent errors on this request with the user
        set_sentry_user(&user.public_id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with_auth(value: &str) -> Parts {
        let request = Request::builder()
            .uri("/api/shops/shops")
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth("Bearer abc123");
        assert_eq!(bearer_token(&parts), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let parts = parts_with_auth("Token abc123");
        assert_eq!(bearer_token(&parts), None);

        let request = Request::builder().uri("/api/shops/shops").body(()).unwrap();
        let parts = request.into_parts().0;
        assert_eq!(bearer_token(&parts), None);
    }
}
