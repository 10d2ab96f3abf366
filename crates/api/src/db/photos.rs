//! Shop photo repository. Metadata only; image bytes live elsewhere.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use garden_core::{ShopId, ShopPhotoId, UserId};

use super::RepositoryError;
use crate::models::ShopPhoto;

/// Parameters for attaching a photo to a shop.
#[derive(Debug)]
pub struct NewShopPhoto {
    pub shop_id: ShopId,
    pub image_url: String,
    /// May be empty.
    pub caption: String,
    /// The authenticated uploader.
    pub uploaded_by: UserId,
}

/// Internal row type for photo queries. `uploaded_by` carries the uploader's
/// public ID, or NULL once the uploader is deleted.
#[derive(sqlx::FromRow)]
struct ShopPhotoRow {
    id: i64,
    shop_id: i64,
    image_url: String,
    caption: String,
    uploaded_by: Option<String>,
    uploaded_at: DateTime<Utc>,
}

impl ShopPhotoRow {
    fn into_photo(self) -> Result<ShopPhoto, RepositoryError> {
        let uploaded_by = self
            .uploaded_by
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid public id in database: {e}"))
            })?;

        Ok(ShopPhoto {
            id: ShopPhotoId::new(self.id),
            shop_id: ShopId::new(self.shop_id),
            image_url: self.image_url,
            caption: self.caption,
            uploaded_by,
            uploaded_at: self.uploaded_at,
        })
    }
}

const PHOTO_SELECT: &str = "SELECT p.id, p.shop_id, p.image_url, p.caption, \
     u.public_id AS uploaded_by, p.uploaded_at \
     FROM shop_photos p LEFT JOIN users u ON u.id = p.uploaded_by";

/// Repository for shop photo operations.
pub struct ShopPhotoRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShopPhotoRepository<'a> {
    /// Create a new shop photo repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List photos newest-first, optionally for a single shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list(&self, shop_id: Option<ShopId>) -> Result<Vec<ShopPhoto>, RepositoryError> {
        let rows = match shop_id {
            Some(shop_id) => {
                let sql = format!(
                    "{PHOTO_SELECT} WHERE p.shop_id = ? ORDER BY p.uploaded_at DESC, p.id DESC"
                );
                sqlx::query_as::<_, ShopPhotoRow>(&sql)
                    .bind(shop_id.as_i64())
                    .fetch_all(self.pool)
                    .await?
            }
            None => {
                let sql = format!("{PHOTO_SELECT} ORDER BY p.uploaded_at DESC, p.id DESC");
                sqlx::query_as::<_, ShopPhotoRow>(&sql)
                    .fetch_all(self.pool)
                    .await?
            }
        };

        rows.into_iter().map(ShopPhotoRow::into_photo).collect()
    }

    /// Attach a photo to a shop.
    ///
    /// The shop must exist; callers validate that before inserting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new_photo: &NewShopPhoto) -> Result<ShopPhoto, RepositoryError> {
        let photo_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO shop_photos (shop_id, image_url, caption, uploaded_by, uploaded_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(new_photo.shop_id.as_i64())
        .bind(&new_photo.image_url)
        .bind(&new_photo.caption)
        .bind(new_photo.uploaded_by.as_i64())
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        let sql = format!("{PHOTO_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, ShopPhotoRow>(&sql)
            .bind(photo_id)
            .fetch_one(self.pool)
            .await?;

        row.into_photo()
    }
}
