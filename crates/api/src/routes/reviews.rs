//! Review handlers. Every review operation requires authentication.
//!
//! Reviews are attributed to the authenticated caller; a client-supplied
//! `user` value is ignored, and `likes` always starts at 0.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use garden_core::{ReviewId, ReviewPhotoId, ShopId};

use crate::db::reviews::NewReview;
use crate::db::{ReviewRepository, ShopRepository};
use crate::error::{AppError, Result, ValidationErrors};
use crate::middleware::CurrentUser;
use crate::models::{Review, ReviewPhoto};
use crate::routes::{non_empty, required_string};
use crate::state::AppState;

/// Response shape for a review photo.
#[derive(Debug, Serialize)]
pub struct ReviewPhotoResponse {
    pub id: ReviewPhotoId,
    pub image_url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<ReviewPhoto> for ReviewPhotoResponse {
    fn from(photo: ReviewPhoto) -> Self {
        Self {
            id: photo.id,
            image_url: photo.image_url,
            uploaded_at: photo.uploaded_at,
        }
    }
}

/// Response shape for a review. `user` is the author's display name; the
/// numeric user ID is never exposed.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: ReviewId,
    pub shop: ShopId,
    pub user: String,
    pub title: String,
    pub content: String,
    pub likes: i64,
    pub photos: Vec<ReviewPhotoResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            shop: review.shop_id,
            user: review.author_name,
            title: review.title,
            content: review.content,
            likes: review.likes,
            photos: review
                .photos
                .into_iter()
                .map(ReviewPhotoResponse::from)
                .collect(),
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

/// Query parameters for the review listing.
#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    shop_id: Option<String>,
}

/// Request for writing a review.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    shop: Option<i64>,
    title: Option<String>,
    content: Option<String>,
}

/// Request for attaching a photo to a review.
#[derive(Debug, Deserialize)]
pub struct CreateReviewPhotoRequest {
    image_url: Option<String>,
}

/// List reviews with their photos, optionally for a single shop.
///
/// # Errors
///
/// Returns a field-level error map if `shop_id` is not an integer.
pub async fn list_reviews(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<ReviewResponse>>> {
    let shop_id = match non_empty(query.shop_id) {
        Some(raw) => {
            let id = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::field("shop_id", "A valid integer is required."))?;
            Some(ShopId::new(id))
        }
        None => None,
    };

    let reviews = ReviewRepository::new(state.pool()).list(shop_id).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// Get a single review.
///
/// # Errors
///
/// Returns 404 if the review does not exist.
pub async fn get_review(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Json<ReviewResponse>> {
    let review = ReviewRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(review.into()))
}

/// Write a review, attributed to the authenticated caller.
///
/// # Errors
///
/// Returns a field-level error map if a required field is missing or the
/// referenced shop does not exist.
pub async fn create_review(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let mut errors = ValidationErrors::new();
    let title = required_string(&mut errors, "title", body.title);
    let content = required_string(&mut errors, "content", body.content);
    if body.shop.is_none() {
        errors.add("shop", "This field is required.");
    }
    errors.into_result()?;

    // The guard above rejected the missing case
    let shop_id = ShopId::new(body.shop.unwrap_or_default());
    if !ShopRepository::new(state.pool()).exists(shop_id).await? {
        return Err(AppError::field(
            "shop",
            &format!("Shop {shop_id} does not exist."),
        ));
    }

    let review = ReviewRepository::new(state.pool())
        .create(&NewReview {
            shop_id,
            user_id: user.id,
            title,
            content,
        })
        .await?;
    debug!(review_id = %review.id, shop_id = %shop_id, "Created review");

    Ok((StatusCode::CREATED, Json(review.into())))
}

/// Delete a review together with its photos.
///
/// # Errors
///
/// Returns 404 if the review does not exist.
pub async fn delete_review(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    let deleted = ReviewRepository::new(state.pool()).delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    debug!(review_id = %id, "Deleted review");
    Ok(StatusCode::NO_CONTENT)
}

/// Attach a photo to a review.
///
/// # Errors
///
/// Returns 404 if the review does not exist, or a field-level error map if
/// `image_url` is missing.
pub async fn add_review_photo(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(body): Json<CreateReviewPhotoRequest>,
) -> Result<(StatusCode, Json<ReviewPhotoResponse>)> {
    let mut errors = ValidationErrors::new();
    let image_url = required_string(&mut errors, "image_url", body.image_url);
    errors.into_result()?;

    let repo = ReviewRepository::new(state.pool());
    if repo.get(id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let photo = repo.add_photo(id, &image_url).await?;
    debug!(review_id = %id, photo_id = %photo.id, "Attached review photo");

    Ok((StatusCode::CREATED, Json(photo.into())))
}
