//! Review domain types.

use chrono::{DateTime, Utc};

use garden_core::{ReviewId, ReviewPhotoId, ShopId, UserId};

/// A user-submitted review of a shop (domain type).
#[derive(Debug, Clone)]
pub struct Review {
    /// Internal numeric ID.
    pub id: ReviewId,
    /// The reviewed shop.
    pub shop_id: ShopId,
    /// The author.
    pub user_id: UserId,
    /// Author's display name, rendered into responses instead of an ID.
    pub author_name: String,
    pub title: String,
    pub content: String,
    /// Server-controlled; starts at 0.
    pub likes: i64,
    /// Owned photos, cascade-deleted with the review.
    pub photos: Vec<ReviewPhoto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A photo attached to a review (domain type). Metadata only.
#[derive(Debug, Clone)]
pub struct ReviewPhoto {
    pub id: ReviewPhotoId,
    pub review_id: ReviewId,
    /// Where the image lives; an opaque URL or path string.
    pub image_url: String,
    pub uploaded_at: DateTime<Utc>,
}
