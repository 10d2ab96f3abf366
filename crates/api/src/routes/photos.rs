//! Shop photo handlers. Metadata only; image bytes live elsewhere.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use garden_core::{ShopId, ShopPhotoId};

use crate::db::photos::NewShopPhoto;
use crate::db::{ShopPhotoRepository, ShopRepository};
use crate::error::{AppError, Result, ValidationErrors};
use crate::middleware::CurrentUser;
use crate::models::ShopPhoto;
use crate::routes::{non_empty, required_string};
use crate::state::AppState;

/// Response shape for a shop photo. `uploaded_by` is the uploader's public
/// ID, null once the uploader is deleted.
#[derive(Debug, Serialize)]
pub struct ShopPhotoResponse {
    pub id: ShopPhotoId,
    pub image_url: String,
    pub caption: String,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<ShopPhoto> for ShopPhotoResponse {
    fn from(photo: ShopPhoto) -> Self {
        Self {
            id: photo.id,
            image_url: photo.image_url,
            caption: photo.caption,
            uploaded_by: photo.uploaded_by,
            uploaded_at: photo.uploaded_at,
        }
    }
}

/// Query parameters for the photo listing.
#[derive(Debug, Deserialize)]
pub struct PhotoListQuery {
    shop_id: Option<String>,
}

/// Request for attaching a photo to a shop.
#[derive(Debug, Deserialize)]
pub struct CreatePhotoRequest {
    shop_id: Option<i64>,
    image_url: Option<String>,
    caption: Option<String>,
}

/// List photos newest-first, optionally for a single shop.
///
/// # Errors
///
/// Returns a field-level error map if `shop_id` is not an integer.
pub async fn list_photos(
    State(state): State<AppState>,
    Query(query): Query<PhotoListQuery>,
) -> Result<Json<Vec<ShopPhotoResponse>>> {
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

    let photos = ShopPhotoRepository::new(state.pool()).list(shop_id).await?;
    Ok(Json(photos.into_iter().map(ShopPhotoResponse::from).collect()))
}

/// Attach a photo to a shop, attributed to the authenticated caller.
///
/// # Errors
///
/// Returns a field-level error map if a required field is missing or the
/// referenced shop does not exist.
pub async fn create_photo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<CreatePhotoRequest>,
) -> Result<(StatusCode, Json<ShopPhotoResponse>)> {
    let mut errors = ValidationErrors::new();
    let image_url = required_string(&mut errors, "image_url", body.image_url);
    if body.shop_id.is_none() {
        errors.add("shop_id", "This field is required.");
    }
    errors.into_result()?;

    // The guard above rejected the missing case
    let shop_id = ShopId::new(body.shop_id.unwrap_or_default());
    if !ShopRepository::new(state.pool()).exists(shop_id).await? {
        return Err(AppError::field(
            "shop_id",
            &format!("Shop {shop_id} does not exist."),
        ));
    }

    let photo = ShopPhotoRepository::new(state.pool())
        .create(&NewShopPhoto {
            shop_id,
            image_url,
            caption: body.caption.unwrap_or_default(),
            uploaded_by: user.id,
        })
        .await?;
    debug!(photo_id = %photo.id, shop_id = %shop_id, "Attached shop photo");

    Ok((StatusCode::CREATED, Json(photo.into())))
}
