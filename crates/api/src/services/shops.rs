//! Shop lifecycle orchestration.
//!
//! The save path for a shop has two concerns beyond the repository write:
//! every referenced tag ID must exist in its vocabulary, and a shop without
//! coordinates gets its address geocoded before persistence. [`ShopService`]
//! runs both on create and on update, so the side effect is an explicit step
//! rather than something buried in the data layer.

use chrono::Utc;
use sqlx::SqlitePool;

use garden_core::{Coordinates, CoordinatesError, ShopId, TagId};

use crate::db::shops::{NewShop, ShopRepository};
use crate::db::tags::TagKind;
use crate::db::TagRepository;
use crate::error::{AppError, Result, ValidationErrors};
use crate::models::{Shop, Tag};
use crate::services::GeocodingClient;

/// Field updates for a shop.
///
/// `None` leaves a field unchanged. For nullable fields the inner `Option`
/// distinguishes "set to a value" from "clear": `Some(None)` clears.
#[derive(Debug, Default)]
pub struct ShopPatch {
    pub name: Option<String>,
    pub address: AddressPatch,
    pub phone_number: Option<Option<String>>,
    pub latitude: Option<Option<f64>>,
    pub longitude: Option<Option<f64>>,
    pub seat_count: Option<i64>,
    pub capacity: Option<i64>,
    pub opening_hours: Option<Option<serde_json::Value>>,
    pub types: Option<Vec<TagId>>,
    pub concepts: Option<Vec<TagId>>,
    pub layouts: Option<Vec<TagId>>,
}

/// Field updates for a shop's owned address. `None` leaves a field unchanged.
#[derive(Debug, Default)]
pub struct AddressPatch {
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub town: Option<String>,
    pub street_address: Option<String>,
    pub building: Option<String>,
}

/// Field name under which a coordinate pair violation is reported.
pub(crate) const fn coordinate_error_field(error: &CoordinatesError) -> &'static str {
    match error {
        CoordinatesError::LatitudeOutOfRange => "latitude",
        CoordinatesError::LongitudeOutOfRange => "longitude",
        CoordinatesError::IncompletePair => "non_field_errors",
    }
}

/// Orchestrates shop creation and updates.
pub struct ShopService<'a> {
    pool: &'a SqlitePool,
    geocoder: &'a GeocodingClient,
}

impl<'a> ShopService<'a> {
    /// Create a new shop service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, geocoder: &'a GeocodingClient) -> Self {
        Self { pool, geocoder }
    }

    /// Create a shop.
    ///
    /// Validates every referenced tag ID, geocodes the address when no
    /// coordinates were supplied, then persists address, shop, and tag links
    /// in one transaction. A failed geocoding lookup leaves the coordinates
    /// unset; the create still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a tag ID does not exist.
    /// Returns `AppError::Database` if persistence fails.
    pub async fn create(&self, mut new_shop: NewShop) -> Result<Shop> {
        let mut errors = ValidationErrors::new();
        self.checked_tags(TagKind::Type, &new_shop.types, &mut errors)
            .await?;
        self.checked_tags(TagKind::Concept, &new_shop.concepts, &mut errors)
            .await?;
        self.checked_tags(TagKind::Layout, &new_shop.layouts, &mut errors)
            .await?;
        errors.into_result()?;

        if new_shop.coordinates.is_none() {
            new_shop.coordinates = self.geocoder.resolve(&new_shop.address.rendered()).await;
        }

        Ok(ShopRepository::new(self.pool).create(&new_shop).await?)
    }

    /// Apply a partial update and return the updated shop.
    ///
    /// Present tag lists replace that relation's membership entirely; absent
    /// fields keep their stored values; explicit nulls clear nullable fields.
    /// The geocode-on-empty check runs after the merge, so clearing the
    /// coordinate pair re-resolves it for the (possibly updated) address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the shop does not exist.
    /// Returns `AppError::Validation` for unknown tag IDs or a half-set
    /// coordinate pair.
    pub async fn update(&self, id: ShopId, patch: ShopPatch) -> Result<Shop> {
        let repo = ShopRepository::new(self.pool);
        let mut shop = repo.get(id).await?.ok_or(AppError::NotFound)?;

        let mut errors = ValidationErrors::new();
        let types = match &patch.types {
            Some(ids) => Some(self.checked_tags(TagKind::Type, ids, &mut errors).await?),
            None => None,
        };
        let concepts = match &patch.concepts {
            Some(ids) => Some(self.checked_tags(TagKind::Concept, ids, &mut errors).await?),
            None => None,
        };
        let layouts = match &patch.layouts {
            Some(ids) => Some(self.checked_tags(TagKind::Layout, ids, &mut errors).await?),
            None => None,
        };

        let latitude = patch
            .latitude
            .unwrap_or_else(|| shop.coordinates.map(|c| c.latitude()));
        let longitude = patch
            .longitude
            .unwrap_or_else(|| shop.coordinates.map(|c| c.longitude()));
        let coordinates = Coordinates::from_parts(latitude, longitude).unwrap_or_else(|e| {
            errors.add(coordinate_error_field(&e), e.to_string());
            None
        });
        errors.into_result()?;

        if let Some(name) = patch.name {
            shop.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            shop.phone_number = phone_number;
        }
        if let Some(seat_count) = patch.seat_count {
            shop.seat_count = seat_count;
        }
        if let Some(capacity) = patch.capacity {
            shop.capacity = capacity;
        }
        if let Some(opening_hours) = patch.opening_hours {
            shop.opening_hours = opening_hours;
        }
        shop.coordinates = coordinates;

        let address = &mut shop.address;
        if let Some(postal_code) = patch.address.postal_code {
            address.postal_code = postal_code;
        }
        if let Some(prefecture) = patch.address.prefecture {
            address.prefecture = prefecture;
        }
        if let Some(city) = patch.address.city {
            address.city = city;
        }
        if let Some(district) = patch.address.district {
            address.district = district;
        }
        if let Some(town) = patch.address.town {
            address.town = town;
        }
        if let Some(street_address) = patch.address.street_address {
            address.street_address = street_address;
        }
        if let Some(building) = patch.address.building {
            address.building = building;
        }

        if let Some(types) = types {
            shop.types = types;
        }
        if let Some(concepts) = concepts {
            shop.concepts = concepts;
        }
        if let Some(layouts) = layouts {
            shop.layouts = layouts;
        }

        if shop.coordinates.is_none() {
            shop.coordinates = self.geocoder.resolve(&shop.address.rendered()).await;
        }

        shop.updated_at = Utc::now();
        repo.update(&shop).await?;
        Ok(shop)
    }

    /// Resolve tag IDs against their vocabulary, recording a field error for
    /// every unknown reference.
    async fn checked_tags(
        &self,
        kind: TagKind,
        ids: &[TagId],
        errors: &mut ValidationErrors,
    ) -> Result<Vec<Tag>> {
        let found = TagRepository::new(self.pool).get_many(kind, ids).await?;
        for id in ids {
            if !found.iter().any(|tag| tag.id == *id) {
                errors.add(kind.field(), format!("Tag {} does not exist.", id.as_i64()));
            }
        }
        Ok(found)
    }
}
