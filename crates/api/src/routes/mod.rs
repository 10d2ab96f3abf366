//! HTTP route handlers for the garden API.
//!
//! # Route Structure
//!
//! ```text
//! # Shop directory
//! GET    /api/shops/shops          - Search the directory
//! POST   /api/shops/shops          - Create a shop (auth)
//! GET    /api/shops/shops/{id}     - Shop detail
//! PATCH  /api/shops/shops/{id}     - Partial update (auth; PUT is an alias)
//! DELETE /api/shops/shops/{id}     - Delete a shop with its address, photos, reviews (auth)
//!
//! # Tag vocabularies (kind = types | concepts | layouts)
//! GET    /api/shops/{kind}         - List one vocabulary
//! POST   /api/shops/{kind}         - Add a tag (auth)
//! DELETE /api/shops/{kind}/{id}    - Remove a tag (auth)
//!
//! # Photos
//! GET    /api/shops/photos         - List photos newest-first, `?shop_id=` filters
//! POST   /api/shops/photos         - Attach a photo to a shop (auth)
//!
//! # Reviews (every operation requires auth)
//! GET    /api/shops/reviews        - List reviews, `?shop_id=` filters
//! POST   /api/shops/reviews        - Write a review
//! GET    /api/shops/reviews/{id}   - Review detail
//! DELETE /api/shops/reviews/{id}   - Delete a review with its photos
//! POST   /api/shops/reviews/{id}/photos - Attach a photo to a review
//!
//! # Accounts
//! POST   /api/accounts/users       - Register; returns the API token once
//! GET    /api/accounts/users/{uid} - Public profile by UUID
//! ```

pub mod accounts;
pub mod photos;
pub mod reviews;
pub mod shops;
pub mod tags;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::error::ValidationErrors;
use crate::state::AppState;

/// Build the shop directory routes.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/shops", get(shops::list_shops).post(shops::create_shop))
        .route(
            "/shops/{id}",
            get(shops::get_shop)
                .patch(shops::update_shop)
                .put(shops::update_shop)
                .delete(shops::delete_shop),
        )
        .route(
            "/photos",
            get(photos::list_photos).post(photos::create_photo),
        )
        .route(
            "/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/reviews/{id}",
            get(reviews::get_review).delete(reviews::delete_review),
        )
        .route("/reviews/{id}/photos", post(reviews::add_review_photo))
        // The vocabulary segment matches types, concepts, and layouts; the
        // static routes above take precedence over the parameter
        .route("/{kind}", get(tags::list_tags).post(tags::create_tag))
        .route("/{kind}/{id}", delete(tags::delete_tag))
}

/// Build the account routes.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(accounts::register))
        .route("/users/{uid}", get(accounts::get_user))
}

/// Build all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/shops", shop_routes())
        .nest("/api/accounts", account_routes())
}

/// Require a string field to be present and non-blank, recording the
/// violation otherwise. Returns an empty string on failure so callers can
/// keep accumulating errors before bailing out.
pub(crate) fn required_string(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> String {
    match value {
        None => {
            errors.add(field, "This field is required.");
            String::new()
        }
        Some(value) if value.trim().is_empty() => {
            errors.add(field, "This field may not be blank.");
            String::new()
        }
        Some(value) => value,
    }
}

/// Treat an empty query parameter as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
