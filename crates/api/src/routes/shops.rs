//! Shop directory handlers: search, detail, create, update, delete.
//!
//! Request payloads are validated into field-level error maps before anything
//! touches the service layer. Integer fields accept the encodings clients
//! actually send (JSON numbers, whole-valued floats, numeric strings); the
//! update payload distinguishes an absent field from an explicit `null`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use garden_core::{Coordinates, ShopId, TagId, UserId};

use crate::db::shops::{NewAddress, NewShop, ShopRepository, ShopSearch};
use crate::error::{AppError, Result, ValidationErrors};
use crate::middleware::CurrentUser;
use crate::models::{Address, Shop, Tag};
use crate::routes::{non_empty, required_string};
use crate::services::shops::coordinate_error_field;
use crate::services::{AddressPatch, ShopPatch, ShopService};
use crate::state::AppState;

/// Response shape for a shop's address. The internal row ID stays internal.
#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub district: String,
    pub town: String,
    pub street_address: String,
    pub building: String,
}

impl From<Address> for AddressResponse {
    fn from(address: Address) -> Self {
        Self {
            postal_code: address.postal_code,
            prefecture: address.prefecture,
            city: address.city,
            district: address.district,
            town: address.town,
            street_address: address.street_address,
            building: address.building,
        }
    }
}

/// Response shape for a shop. Tag relations are rendered as ID lists.
#[derive(Debug, Serialize)]
pub struct ShopResponse {
    pub id: ShopId,
    pub name: String,
    pub address: AddressResponse,
    pub phone_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub seat_count: i64,
    pub capacity: i64,
    pub opening_hours: Option<serde_json::Value>,
    pub types: Vec<TagId>,
    pub concepts: Vec<TagId>,
    pub layouts: Vec<TagId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Shop> for ShopResponse {
    fn from(shop: Shop) -> Self {
        Self {
            id: shop.id,
            name: shop.name,
            address: shop.address.into(),
            phone_number: shop.phone_number,
            latitude: shop.coordinates.map(|c| c.latitude()),
            longitude: shop.coordinates.map(|c| c.longitude()),
            seat_count: shop.seat_count,
            capacity: shop.capacity,
            opening_hours: shop.opening_hours,
            types: tag_ids(shop.types),
            concepts: tag_ids(shop.concepts),
            layouts: tag_ids(shop.layouts),
            created_at: shop.created_at,
            updated_at: shop.updated_at,
        }
    }
}

fn tag_ids(tags: Vec<Tag>) -> Vec<TagId> {
    tags.into_iter().map(|tag| tag.id).collect()
}

/// An integer field as clients send it: a JSON number, a whole-valued float,
/// or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LenientInt {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LenientInt {
    /// Coerce to a non-negative integer, recording a field error otherwise.
    fn resolve(self, field: &str, errors: &mut ValidationErrors) -> Option<i64> {
        let value = match self {
            Self::Int(value) => Some(value),
            Self::Float(value) => {
                let truncated = value as i64;
                (truncated as f64 == value).then_some(truncated)
            }
            Self::Text(text) => text.trim().parse::<i64>().ok(),
        };

        match value {
            Some(value) if value >= 0 => Some(value),
            Some(_) => {
                errors.add(field, "Ensure this value is greater than or equal to 0.");
                None
            }
            None => {
                errors.add(field, "A valid integer is required.");
                None
            }
        }
    }
}

/// Deserializer for nullable update fields: the outer `Option` is absent vs
/// present, the inner one is value vs explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Collapse duplicates and order a tag-ID list.
fn normalized_tag_ids(mut ids: Vec<TagId>) -> Vec<TagId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Address fields as sent by clients. Presence requirements differ between
/// create and update, so every field is optional here.
#[derive(Debug, Default, Deserialize)]
pub struct AddressPayload {
    pub postal_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub town: Option<String>,
    pub street_address: Option<String>,
    pub building: Option<String>,
}

impl AddressPayload {
    /// Validate the required locality fields and build the storage form.
    fn into_new_address(self, errors: &mut ValidationErrors) -> NewAddress {
        NewAddress {
            postal_code: required_string(errors, "address.postal_code", self.postal_code),
            prefecture: required_string(errors, "address.prefecture", self.prefecture),
            city: required_string(errors, "address.city", self.city),
            district: self.district.unwrap_or_default(),
            town: required_string(errors, "address.town", self.town),
            street_address: required_string(errors, "address.street_address", self.street_address),
            building: self.building.unwrap_or_default(),
        }
    }

    fn into_address_patch(self) -> AddressPatch {
        AddressPatch {
            postal_code: self.postal_code,
            prefecture: self.prefecture,
            city: self.city,
            district: self.district,
            town: self.town,
            street_address: self.street_address,
            building: self.building,
        }
    }
}

/// Request for creating a shop.
#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    name: Option<String>,
    address: Option<AddressPayload>,
    phone_number: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    seat_count: Option<LenientInt>,
    capacity: Option<LenientInt>,
    opening_hours: Option<serde_json::Value>,
    #[serde(default)]
    types: Option<Vec<TagId>>,
    #[serde(default)]
    concepts: Option<Vec<TagId>>,
    #[serde(default)]
    layouts: Option<Vec<TagId>>,
}

impl CreateShopRequest {
    fn into_new_shop(self, created_by: UserId) -> Result<NewShop> {
        let mut errors = ValidationErrors::new();

        let name = required_string(&mut errors, "name", self.name);

        let address = match self.address {
            Some(payload) => payload.into_new_address(&mut errors),
            None => {
                errors.add("address", "This field is required.");
                NewAddress::default()
            }
        };

        let coordinates =
            Coordinates::from_parts(self.latitude, self.longitude).unwrap_or_else(|e| {
                errors.add(coordinate_error_field(&e), e.to_string());
                None
            });

        let seat_count = match self.seat_count {
            Some(value) => value.resolve("seat_count", &mut errors).unwrap_or(0),
            None => 0,
        };
        let capacity = match self.capacity {
            Some(value) => value.resolve("capacity", &mut errors).unwrap_or(0),
            None => 0,
        };

        errors.into_result()?;

        Ok(NewShop {
            name,
            address,
            phone_number: self.phone_number,
            coordinates,
            seat_count,
            capacity,
            opening_hours: self.opening_hours,
            created_by,
            types: normalized_tag_ids(self.types.unwrap_or_default()),
            concepts: normalized_tag_ids(self.concepts.unwrap_or_default()),
            layouts: normalized_tag_ids(self.layouts.unwrap_or_default()),
        })
    }
}

/// Request for updating a shop. Absent fields keep their stored values;
/// explicit `null` clears nullable fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateShopRequest {
    name: Option<String>,
    address: Option<AddressPayload>,
    #[serde(default, deserialize_with = "double_option")]
    phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    longitude: Option<Option<f64>>,
    seat_count: Option<LenientInt>,
    capacity: Option<LenientInt>,
    #[serde(default, deserialize_with = "double_option")]
    opening_hours: Option<Option<serde_json::Value>>,
    types: Option<Vec<TagId>>,
    concepts: Option<Vec<TagId>>,
    layouts: Option<Vec<TagId>>,
}

impl UpdateShopRequest {
    fn into_shop_patch(self) -> Result<ShopPatch> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            errors.add("name", "This field may not be blank.");
        }

        let seat_count = match self.seat_count {
            Some(value) => value.resolve("seat_count", &mut errors),
            None => None,
        };
        let capacity = match self.capacity {
            Some(value) => value.resolve("capacity", &mut errors),
            None => None,
        };

        errors.into_result()?;

        Ok(ShopPatch {
            name: self.name,
            address: self
                .address
                .map(AddressPayload::into_address_patch)
                .unwrap_or_default(),
            phone_number: self.phone_number,
            latitude: self.latitude,
            longitude: self.longitude,
            seat_count,
            capacity,
            opening_hours: self.opening_hours,
            types: self.types.map(normalized_tag_ids),
            concepts: self.concepts.map(normalized_tag_ids),
            layouts: self.layouts.map(normalized_tag_ids),
        })
    }
}

/// Search parameters for the shop listing. All optional; empty values are
/// treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ShopListQuery {
    keyword: Option<String>,
    types: Option<String>,
    concepts: Option<String>,
    layouts: Option<String>,
    region: Option<String>,
    prefecture: Option<String>,
    city: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
}

/// Parse a comma-separated tag-ID list parameter. Blank segments are skipped;
/// non-integer segments are recorded as field errors.
fn parse_id_list(
    field: &str,
    raw: Option<String>,
    errors: &mut ValidationErrors,
) -> Vec<TagId> {
    let Some(raw) = non_empty(raw) else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    for segment in raw.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.parse::<i64>() {
            Ok(id) => ids.push(TagId::new(id)),
            Err(_) => errors.add(field, format!("\"{segment}\" is not a valid integer.")),
        }
    }
    ids
}

/// Search the shop directory.
///
/// The `lat`/`lon` parameters are accepted but have no filtering effect.
///
/// # Errors
///
/// Returns a field-level error map if a tag-ID list parameter contains a
/// non-integer segment.
pub async fn list_shops(
    State(state): State<AppState>,
    Query(query): Query<ShopListQuery>,
) -> Result<Json<Vec<ShopResponse>>> {
    debug!(?query, "Searching shops");

    let mut errors = ValidationErrors::new();
    let types = parse_id_list("types", query.types, &mut errors);
    let concepts = parse_id_list("concepts", query.concepts, &mut errors);
    let layouts = parse_id_list("layouts", query.layouts, &mut errors);
    errors.into_result()?;

    if query.lat.is_some() || query.lon.is_some() {
        // Reserved extension point; no distance filtering yet
        debug!(lat = ?query.lat, lon = ?query.lon, "Ignoring point parameters");
    }

    let search = ShopSearch {
        keyword: non_empty(query.keyword),
        types,
        concepts,
        layouts,
        city: non_empty(query.city),
        prefecture: non_empty(query.prefecture),
        region: non_empty(query.region),
    };

    let shops = ShopRepository::new(state.pool()).search(&search).await?;
    Ok(Json(shops.into_iter().map(ShopResponse::from).collect()))
}

/// Get a single shop.
///
/// # Errors
///
/// Returns 404 if the shop does not exist.
pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<Json<ShopResponse>> {
    let shop = ShopRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(shop.into()))
}

/// Create a shop listing.
///
/// The listing is attributed to the authenticated caller. When no coordinate
/// pair is supplied the address is geocoded before the shop is persisted.
///
/// # Errors
///
/// Returns a field-level error map for missing required fields, out-of-range
/// values, or unknown tag IDs.
pub async fn create_shop(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<ShopResponse>)> {
    let new_shop = body.into_new_shop(user.id)?;

    let shop = ShopService::new(state.pool(), state.geocoder())
        .create(new_shop)
        .await?;
    debug!(shop_id = %shop.id, "Created shop");

    Ok((StatusCode::CREATED, Json(shop.into())))
}

/// Apply a partial update to a shop. Serves both PATCH and PUT.
///
/// # Errors
///
/// Returns 404 if the shop does not exist, or a field-level error map for
/// invalid values, unknown tag IDs, or a half-set coordinate pair.
pub async fn update_shop(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
    Json(body): Json<UpdateShopRequest>,
) -> Result<Json<ShopResponse>> {
    let patch = body.into_shop_patch()?;

    let shop = ShopService::new(state.pool(), state.geocoder())
        .update(id, patch)
        .await?;
    debug!(shop_id = %shop.id, "Updated shop");

    Ok(Json(shop.into()))
}

/// Delete a shop together with its address, photos, and reviews.
///
/// # Errors
///
/// Returns 404 if the shop does not exist.
pub async fn delete_shop(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<StatusCode> {
    let deleted = ShopRepository::new(state.pool()).delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    debug!(shop_id = %id, "Deleted shop");
    Ok(StatusCode::NO_CONTENT)
}
