//! Shop domain types: shops, their owned address, tags, and photos.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use garden_core::{AddressId, Coordinates, ShopId, ShopPhotoId, TagId, UserId};

/// A shop's structured street address (domain type).
///
/// Owned one-to-one by a shop. `district` and `building` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Internal numeric ID.
    pub id: AddressId,
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub district: String,
    pub town: String,
    pub street_address: String,
    pub building: String,
}

impl Address {
    /// Single-line form handed to the geocoder.
    ///
    /// Concatenates the locality fields broadest-first with no separators,
    /// Japanese style. The postal code is not part of the geocoded string.
    #[must_use]
    pub fn rendered(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.prefecture, self.city, self.district, self.town, self.street_address,
            self.building
        )
    }
}

/// A named label from one of the three tag vocabularies (type/concept/layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A shop listing with its owned address and attached tag sets (domain type).
#[derive(Debug, Clone)]
pub struct Shop {
    /// Internal numeric ID.
    pub id: ShopId,
    pub name: String,
    /// The owned address row, deleted together with the shop.
    pub address: Address,
    pub phone_number: Option<String>,
    /// Both latitude and longitude, or neither.
    pub coordinates: Option<Coordinates>,
    pub seat_count: i64,
    pub capacity: i64,
    /// Arbitrary structured map, e.g. weekday opening times.
    pub opening_hours: Option<serde_json::Value>,
    /// The user who created the listing.
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attached type tags, sorted by ID, no duplicates.
    pub types: Vec<Tag>,
    /// Attached concept tags, sorted by ID, no duplicates.
    pub concepts: Vec<Tag>,
    /// Attached layout tags, sorted by ID, no duplicates.
    pub layouts: Vec<Tag>,
}

/// A photo attached to a shop (domain type). Metadata only, no blob handling.
#[derive(Debug, Clone)]
pub struct ShopPhoto {
    pub id: ShopPhotoId,
    pub shop_id: ShopId,
    /// Where the image lives; an opaque URL or path string.
    pub image_url: String,
    /// May be empty.
    pub caption: String,
    /// Public ID of the uploader. `None` once the uploader is deleted.
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(district: &str, building: &str) -> Address {
        Address {
            id: AddressId::new(1),
            postal_code: "150-0041".to_string(),
            prefecture: "東京都".to_string(),
            city: "渋谷区".to_string(),
            district: district.to_string(),
            town: "神南".to_string(),
            street_address: "1-2-3".to_string(),
            building: building.to_string(),
        }
    }

    #[test]
    fn test_rendered_concatenates_without_separators() {
        let addr = address("宇田川町", "ガーデンビル2F");
        assert_eq!(addr.rendered(), "東京都渋谷区宇田川町神南1-2-3ガーデンビル2F");
    }

    #[test]
    fn test_rendered_skips_empty_optional_fields() {
        let addr = address("", "");
        assert_eq!(addr.rendered(), "東京都渋谷区神南1-2-3");
    }

    #[test]
    fn test_rendered_excludes_postal_code() {
        let addr = address("", "");
        assert!(!addr.rendered().contains("150-0041"));
    }
}
