//! Review repository, including owned review photos.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use garden_core::{ReviewId, ReviewPhotoId, ShopId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewPhoto};

/// Parameters for creating a review. `likes` always starts at 0.
#[derive(Debug)]
pub struct NewReview {
    pub shop_id: ShopId,
    /// The authenticated author.
    pub user_id: UserId,
    pub title: String,
    pub content: String,
}

/// Internal row type for review queries. `author_name` is the author's
/// display name, joined in so responses never expose the numeric user ID.
#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    shop_id: i64,
    user_id: i64,
    author_name: String,
    title: String,
    content: String,
    likes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self, photos: Vec<ReviewPhoto>) -> Review {
        Review {
            id: ReviewId::new(self.id),
            shop_id: ShopId::new(self.shop_id),
            user_id: UserId::new(self.user_id),
            author_name: self.author_name,
            title: self.title,
            content: self.content,
            likes: self.likes,
            photos,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Internal row type for review photo queries.
#[derive(sqlx::FromRow)]
struct ReviewPhotoRow {
    id: i64,
    review_id: i64,
    image_url: String,
    uploaded_at: DateTime<Utc>,
}

impl ReviewPhotoRow {
    fn into_photo(self) -> ReviewPhoto {
        ReviewPhoto {
            id: ReviewPhotoId::new(self.id),
            review_id: ReviewId::new(self.review_id),
            image_url: self.image_url,
            uploaded_at: self.uploaded_at,
        }
    }
}

const REVIEW_SELECT: &str = "SELECT r.id, r.shop_id, r.user_id, \
     u.display_name AS author_name, r.title, r.content, r.likes, \
     r.created_at, r.updated_at \
     FROM reviews r JOIN users u ON u.id = r.user_id";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List reviews with their photos, optionally for a single shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, shop_id: Option<ShopId>) -> Result<Vec<Review>, RepositoryError> {
        let rows = match shop_id {
            Some(shop_id) => {
                let sql = format!("{REVIEW_SELECT} WHERE r.shop_id = ? ORDER BY r.id");
                sqlx::query_as::<_, ReviewRow>(&sql)
                    .bind(shop_id.as_i64())
                    .fetch_all(self.pool)
                    .await?
            }
            None => {
                let sql = format!("{REVIEW_SELECT} ORDER BY r.id");
                sqlx::query_as::<_, ReviewRow>(&sql)
                    .fetch_all(self.pool)
                    .await?
            }
        };

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut photos = self.photos_for_reviews(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_review(photos.remove(&id).unwrap_or_default())
            })
            .collect())
    }

    /// Get a review with its photos.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = ?");
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let photos = sqlx::query_as::<_, ReviewPhotoRow>(
            "SELECT id, review_id, image_url, uploaded_at FROM review_photos \
             WHERE review_id = ? ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(row.into_review(
            photos.into_iter().map(ReviewPhotoRow::into_photo).collect(),
        )))
    }

    /// Create a review. `likes` starts at 0.
    ///
    /// The shop must exist; callers validate that before inserting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new_review: &NewReview) -> Result<Review, RepositoryError> {
        let now = Utc::now();

        let review_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO reviews (shop_id, user_id, title, content, likes, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING id
            ",
        )
        .bind(new_review.shop_id.as_i64())
        .bind(new_review.user_id.as_i64())
        .bind(&new_review.title)
        .bind(&new_review.content)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        self.get(ReviewId::new(review_id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a review. Its photos cascade away.
    ///
    /// # Returns
    ///
    /// Returns `true` if the review was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attach a photo to a review.
    ///
    /// The review must exist; callers validate that before inserting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_photo(
        &self,
        review_id: ReviewId,
        image_url: &str,
    ) -> Result<ReviewPhoto, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewPhotoRow>(
            r"
            INSERT INTO review_photos (review_id, image_url, uploaded_at)
            VALUES (?, ?, ?)
            RETURNING id, review_id, image_url, uploaded_at
            ",
        )
        .bind(review_id.as_i64())
        .bind(image_url)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into_photo())
    }

    async fn photos_for_reviews(
        &self,
        review_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<ReviewPhoto>>, RepositoryError> {
        let mut grouped: HashMap<i64, Vec<ReviewPhoto>> = HashMap::new();
        if review_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, review_id, image_url, uploaded_at FROM review_photos WHERE review_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in review_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<ReviewPhotoRow> = qb.build_query_as().fetch_all(self.pool).await?;
        for row in rows {
            grouped
                .entry(row.review_id)
                .or_default()
                .push(row.into_photo());
        }

        Ok(grouped)
    }
}
