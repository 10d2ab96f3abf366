//! Shop repository: shops, their owned address rows, and tag links.
//!
//! Create, update, and delete each run in a single transaction so a failure
//! can never leave an orphaned address or a half-written tag set. The listing
//! query is composed dynamically with `QueryBuilder` from the optional search
//! filters.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use garden_core::{AddressId, Coordinates, ShopId, TagId, UserId};

use super::RepositoryError;
use super::tags::TagKind;
use crate::models::{Address, Shop, Tag};

/// Address fields for creating a shop's owned address row.
#[derive(Debug, Clone, Default)]
pub struct NewAddress {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub district: String,
    pub town: String,
    pub street_address: String,
    pub building: String,
}

impl NewAddress {
    /// Single-line form handed to the geocoder. Same rendering as
    /// [`Address::rendered`].
    #[must_use]
    pub fn rendered(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.prefecture, self.city, self.district, self.town, self.street_address,
            self.building
        )
    }
}

/// Parameters for creating a shop with its owned address and tag links.
///
/// Duplicate IDs in the tag lists are collapsed by the junction primary key.
#[derive(Debug)]
pub struct NewShop {
    pub name: String,
    pub address: NewAddress,
    pub phone_number: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub seat_count: i64,
    pub capacity: i64,
    pub opening_hours: Option<serde_json::Value>,
    pub created_by: UserId,
    pub types: Vec<TagId>,
    pub concepts: Vec<TagId>,
    pub layouts: Vec<TagId>,
}

/// Filters for the shop listing query. All optional; present filters are
/// combined with AND.
#[derive(Debug, Default)]
pub struct ShopSearch {
    /// Substring match against name, prefecture, city, or town.
    pub keyword: Option<String>,
    /// Membership test: shop has at least one of these type tags.
    pub types: Vec<TagId>,
    /// Membership test for concept tags.
    pub concepts: Vec<TagId>,
    /// Membership test for layout tags.
    pub layouts: Vec<TagId>,
    /// Exact city match. Wins over `prefecture` and `region`.
    pub city: Option<String>,
    /// Exact prefecture match. Wins over `region`.
    pub prefecture: Option<String>,
    /// Substring match against prefecture.
    pub region: Option<String>,
}

/// Column list shared by every shop query that joins the address row.
const SHOP_COLUMNS: &str = "s.id, s.name, s.phone_number, s.latitude, s.longitude, \
     s.seat_count, s.capacity, s.opening_hours, s.created_by, s.created_at, s.updated_at, \
     a.id AS address_id, a.postal_code, a.prefecture, a.city, a.district, a.town, \
     a.street_address, a.building";

/// Internal row type for shop queries.
#[derive(sqlx::FromRow)]
struct ShopRow {
    id: i64,
    name: String,
    phone_number: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    seat_count: i64,
    capacity: i64,
    opening_hours: Option<String>,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    address_id: i64,
    postal_code: String,
    prefecture: String,
    city: String,
    district: String,
    town: String,
    street_address: String,
    building: String,
}

/// Internal row type for shop/tag join queries.
#[derive(sqlx::FromRow)]
struct ShopTagRow {
    shop_id: i64,
    tag_id: i64,
    name: String,
}

fn build_shop(
    row: ShopRow,
    types: Vec<Tag>,
    concepts: Vec<Tag>,
    layouts: Vec<Tag>,
) -> Result<Shop, RepositoryError> {
    let coordinates = Coordinates::from_parts(row.latitude, row.longitude).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}"))
    })?;

    let opening_hours: Option<serde_json::Value> = row
        .opening_hours
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid opening hours in database: {e}"))
        })?;

    Ok(Shop {
        id: ShopId::new(row.id),
        name: row.name,
        address: Address {
            id: AddressId::new(row.address_id),
            postal_code: row.postal_code,
            prefecture: row.prefecture,
            city: row.city,
            district: row.district,
            town: row.town,
            street_address: row.street_address,
            building: row.building,
        },
        phone_number: row.phone_number,
        coordinates,
        seat_count: row.seat_count,
        capacity: row.capacity,
        opening_hours,
        created_by: UserId::new(row.created_by),
        created_at: row.created_at,
        updated_at: row.updated_at,
        types,
        concepts,
        layouts,
    })
}

/// Escape `%`, `_`, and `\` in user input destined for a LIKE pattern.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for shop database operations.
pub struct ShopRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a shop: address row, shop row, and tag links in one transaction.
    ///
    /// Tag IDs must already be validated against their vocabularies; an
    /// unknown ID here fails the whole transaction with a foreign key error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails.
    pub async fn create(&self, new_shop: &NewShop) -> Result<Shop, RepositoryError> {
        let now = Utc::now();
        let (latitude, longitude) = match new_shop.coordinates {
            Some(c) => (Some(c.latitude()), Some(c.longitude())),
            None => (None, None),
        };
        let opening_hours = new_shop.opening_hours.as_ref().map(ToString::to_string);

        let mut tx = self.pool.begin().await?;

        let address_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO addresses
                (postal_code, prefecture, city, district, town, street_address, building)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(&new_shop.address.postal_code)
        .bind(&new_shop.address.prefecture)
        .bind(&new_shop.address.city)
        .bind(&new_shop.address.district)
        .bind(&new_shop.address.town)
        .bind(&new_shop.address.street_address)
        .bind(&new_shop.address.building)
        .fetch_one(&mut *tx)
        .await?;

        let shop_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO shops
                (name, address_id, phone_number, latitude, longitude, seat_count,
                 capacity, opening_hours, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(&new_shop.name)
        .bind(address_id)
        .bind(&new_shop.phone_number)
        .bind(latitude)
        .bind(longitude)
        .bind(new_shop.seat_count)
        .bind(new_shop.capacity)
        .bind(&opening_hours)
        .bind(new_shop.created_by.as_i64())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (kind, ids) in [
            (TagKind::Type, &new_shop.types),
            (TagKind::Concept, &new_shop.concepts),
            (TagKind::Layout, &new_shop.layouts),
        ] {
            let sql = format!(
                "INSERT OR IGNORE INTO {} (shop_id, tag_id) VALUES (?, ?)",
                kind.link_table()
            );
            for tag_id in ids {
                sqlx::query(&sql)
                    .bind(shop_id)
                    .bind(tag_id.as_i64())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        self.get(ShopId::new(shop_id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get a shop with its address and tag sets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let sql = format!(
            "SELECT {SHOP_COLUMNS} FROM shops s JOIN addresses a ON a.id = s.address_id \
             WHERE s.id = ?"
        );
        let row = sqlx::query_as::<_, ShopRow>(&sql)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut shops = self.attach_tags(vec![row]).await?;
        Ok(shops.pop())
    }

    /// Search shops with the composed filters of [`ShopSearch`].
    ///
    /// Results are deduplicated (`SELECT DISTINCT`; tag membership uses `IN`
    /// subqueries rather than joins, so a shop matching several tags cannot
    /// appear twice). Ordered by ID for stable iteration; the order is not
    /// part of the contract. `LIKE` matching is case-insensitive for ASCII.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn search(&self, params: &ShopSearch) -> Result<Vec<Shop>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT DISTINCT {SHOP_COLUMNS} FROM shops s \
             JOIN addresses a ON a.id = s.address_id WHERE 1=1"
        ));

        if let Some(keyword) = &params.keyword {
            let pattern = format!("%{}%", escape_like(keyword));
            qb.push(" AND (s.name LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR a.prefecture LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR a.city LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR a.town LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }

        for (kind, ids) in [
            (TagKind::Type, &params.types),
            (TagKind::Concept, &params.concepts),
            (TagKind::Layout, &params.layouts),
        ] {
            if ids.is_empty() {
                continue;
            }
            qb.push(format!(
                " AND s.id IN (SELECT shop_id FROM {} WHERE tag_id IN (",
                kind.link_table()
            ));
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.as_i64());
            }
            separated.push_unseparated("))");
        }

        // Mutually exclusive precedence: city, then prefecture, then region.
        if let Some(city) = &params.city {
            qb.push(" AND a.city = ");
            qb.push_bind(city.clone());
        } else if let Some(prefecture) = &params.prefecture {
            qb.push(" AND a.prefecture = ");
            qb.push_bind(prefecture.clone());
        } else if let Some(region) = &params.region {
            qb.push(" AND a.prefecture LIKE ");
            qb.push_bind(format!("%{}%", escape_like(region)));
            qb.push(" ESCAPE '\\'");
        }

        qb.push(" ORDER BY s.id");

        let rows: Vec<ShopRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let shops = self.attach_tags(rows).await?;

        debug!(count = shops.len(), "Searched shops");
        Ok(shops)
    }

    /// Rewrite a shop: its scalar fields, its owned address, and all three
    /// tag sets, in one transaction.
    ///
    /// The caller passes the full desired state; merging "absent means keep"
    /// update semantics happens above this layer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop no longer exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, shop: &Shop) -> Result<(), RepositoryError> {
        let (latitude, longitude) = match shop.coordinates {
            Some(c) => (Some(c.latitude()), Some(c.longitude())),
            None => (None, None),
        };
        let opening_hours = shop.opening_hours.as_ref().map(ToString::to_string);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE addresses
            SET postal_code = ?, prefecture = ?, city = ?, district = ?,
                town = ?, street_address = ?, building = ?
            WHERE id = ?
            ",
        )
        .bind(&shop.address.postal_code)
        .bind(&shop.address.prefecture)
        .bind(&shop.address.city)
        .bind(&shop.address.district)
        .bind(&shop.address.town)
        .bind(&shop.address.street_address)
        .bind(&shop.address.building)
        .bind(shop.address.id.as_i64())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let result = sqlx::query(
            r"
            UPDATE shops
            SET name = ?, phone_number = ?, latitude = ?, longitude = ?,
                seat_count = ?, capacity = ?, opening_hours = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&shop.name)
        .bind(&shop.phone_number)
        .bind(latitude)
        .bind(longitude)
        .bind(shop.seat_count)
        .bind(shop.capacity)
        .bind(&opening_hours)
        .bind(shop.updated_at)
        .bind(shop.id.as_i64())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for (kind, tags) in [
            (TagKind::Type, &shop.types),
            (TagKind::Concept, &shop.concepts),
            (TagKind::Layout, &shop.layouts),
        ] {
            let delete_sql = format!("DELETE FROM {} WHERE shop_id = ?", kind.link_table());
            sqlx::query(&delete_sql)
                .bind(shop.id.as_i64())
                .execute(&mut *tx)
                .await?;

            let insert_sql = format!(
                "INSERT OR IGNORE INTO {} (shop_id, tag_id) VALUES (?, ?)",
                kind.link_table()
            );
            for tag in tags {
                sqlx::query(&insert_sql)
                    .bind(shop.id.as_i64())
                    .bind(tag.id.as_i64())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a shop together with its owned address row. Photos, reviews,
    /// and tag links cascade away.
    ///
    /// # Returns
    ///
    /// Returns `true` if the shop was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete(&self, id: ShopId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let address_id: Option<i64> =
            sqlx::query_scalar("SELECT address_id FROM shops WHERE id = ?")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;

        let Some(address_id) = address_id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM shops WHERE id = ?")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM addresses WHERE id = ?")
            .bind(address_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Whether a shop with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ShopId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM shops WHERE id = ?)")
            .bind(id.as_i64())
            .fetch_one(self.pool)
            .await?;

        Ok(exists)
    }

    /// Attach the three tag sets to the given rows, batched per kind.
    async fn attach_tags(&self, rows: Vec<ShopRow>) -> Result<Vec<Shop>, RepositoryError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut types = self.tags_for_shops(TagKind::Type, &ids).await?;
        let mut concepts = self.tags_for_shops(TagKind::Concept, &ids).await?;
        let mut layouts = self.tags_for_shops(TagKind::Layout, &ids).await?;

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                build_shop(
                    row,
                    types.remove(&id).unwrap_or_default(),
                    concepts.remove(&id).unwrap_or_default(),
                    layouts.remove(&id).unwrap_or_default(),
                )
            })
            .collect()
    }

    async fn tags_for_shops(
        &self,
        kind: TagKind,
        shop_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Tag>>, RepositoryError> {
        let mut grouped: HashMap<i64, Vec<Tag>> = HashMap::new();
        if shop_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT l.shop_id, t.id AS tag_id, t.name FROM {} l \
             JOIN {} t ON t.id = l.tag_id WHERE l.shop_id IN (",
            kind.link_table(),
            kind.table()
        ));
        let mut separated = qb.separated(", ");
        for id in shop_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY t.id");

        let rows: Vec<ShopTagRow> = qb.build_query_as().fetch_all(self.pool).await?;
        for row in rows {
            grouped.entry(row.shop_id).or_default().push(Tag {
                id: TagId::new(row.tag_id),
                name: row.name,
            });
        }

        Ok(grouped)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use garden_core::Email;

    use super::*;
    use crate::db::users::NewUser;
    use crate::db::{TagRepository, UserRepository, create_in_memory_pool};

    async fn seed_user(pool: &SqlitePool) -> UserId {
        let user = UserRepository::new(pool)
            .create(&NewUser {
                public_id: Uuid::new_v4(),
                email: Email::parse(&format!("owner-{}@example.com", Uuid::new_v4().simple()))
                    .unwrap(),
                display_name: "Owner".to_string(),
                introduction: String::new(),
                avatar_url: None,
                api_token: Uuid::new_v4().to_string(),
            })
            .await
            .unwrap();
        user.id
    }

    fn test_address(prefecture: &str, city: &str, town: &str) -> NewAddress {
        NewAddress {
            postal_code: "150-0001".to_string(),
            prefecture: prefecture.to_string(),
            city: city.to_string(),
            district: String::new(),
            town: town.to_string(),
            street_address: "1-2-3".to_string(),
            building: String::new(),
        }
    }

    fn test_shop(name: &str, created_by: UserId) -> NewShop {
        NewShop {
            name: name.to_string(),
            address: test_address("東京都", "渋谷区", "神南"),
            phone_number: None,
            coordinates: None,
            seat_count: 0,
            capacity: 0,
            opening_hours: None,
            created_by,
            types: Vec::new(),
            concepts: Vec::new(),
            layouts: Vec::new(),
        }
    }

    fn ids(shops: &[Shop]) -> Vec<ShopId> {
        shops.iter().map(|s| s.id).collect()
    }

    #[tokio::test]
    async fn test_create_and_get_roundtrip() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let tags = TagRepository::new(&pool);
        let izakaya = tags.create(TagKind::Type, "居酒屋").await.unwrap();
        let hideaway = tags.create(TagKind::Concept, "隠れ家").await.unwrap();

        let repo = ShopRepository::new(&pool);
        let mut params = test_shop("Garden Shibuya", owner);
        params.phone_number = Some("03-1234-5678".to_string());
        params.coordinates = Some(Coordinates::new(35.658, 139.701).unwrap());
        params.opening_hours = Some(serde_json::json!({"mon": "10:00-18:00"}));
        params.seat_count = 12;
        params.capacity = 20;
        // Duplicate tag ID collapses to one link
        params.types = vec![izakaya.id, izakaya.id];
        params.concepts = vec![hideaway.id];

        let created = repo.create(&params).await.unwrap();
        assert_eq!(created.name, "Garden Shibuya");
        assert_eq!(created.types.len(), 1);
        assert_eq!(created.types[0].name, "居酒屋");
        assert_eq!(created.concepts.len(), 1);
        assert!(created.layouts.is_empty());
        assert_eq!(created.coordinates, params.coordinates);
        assert_eq!(created.opening_hours, params.opening_hours);
        assert_eq!(created.created_by, owner);
        assert_eq!(created.address.prefecture, "東京都");

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.seat_count, 12);
        assert_eq!(fetched.capacity, 20);
        assert_eq!(fetched.phone_number.as_deref(), Some("03-1234-5678"));
        assert_eq!(fetched.coordinates, params.coordinates);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let pool = create_in_memory_pool().await.unwrap();
        let repo = ShopRepository::new(&pool);
        assert!(repo.get(ShopId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_keyword_across_fields() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let repo = ShopRepository::new(&pool);

        let by_name = repo.create(&test_shop("Tokyo Diner", owner)).await.unwrap();

        let mut params = test_shop("Sakura", owner);
        params.address = test_address("Tokyo-to", "Chiyoda", "Marunouchi");
        let by_prefecture = repo.create(&params).await.unwrap();

        let mut params = test_shop("Beans", owner);
        params.address = test_address("Aichi", "Tokyo City", "Sakae");
        let by_city = repo.create(&params).await.unwrap();

        let mut params = test_shop("Leaf", owner);
        params.address = test_address("Osaka", "Namba", "Old Tokyo");
        let by_town = repo.create(&params).await.unwrap();

        let mut params = test_shop("Miso", owner);
        params.address = test_address("Osaka", "Namba", "Dotonbori");
        repo.create(&params).await.unwrap();

        let results = repo
            .search(&ShopSearch {
                keyword: Some("tokyo".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let found = ids(&results);
        assert_eq!(found.len(), 4);
        for id in [by_name.id, by_prefecture.id, by_city.id, by_town.id] {
            assert!(found.contains(&id));
        }

        // Case-insensitive for ASCII
        let results = repo
            .search(&ShopSearch {
                keyword: Some("TOKYO".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&results), found);
    }

    #[tokio::test]
    async fn test_search_tag_membership_without_duplicates() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let tags = TagRepository::new(&pool);
        let a = tags.create(TagKind::Type, "バー").await.unwrap();
        let b = tags.create(TagKind::Type, "食堂").await.unwrap();
        let quiet = tags.create(TagKind::Concept, "静か").await.unwrap();

        let repo = ShopRepository::new(&pool);
        let mut params = test_shop("One", owner);
        params.types = vec![a.id];
        params.concepts = vec![quiet.id];
        let one = repo.create(&params).await.unwrap();

        let mut params = test_shop("Both", owner);
        params.types = vec![a.id, b.id];
        let both = repo.create(&params).await.unwrap();

        let mut params = test_shop("Other", owner);
        params.types = vec![b.id];
        let other = repo.create(&params).await.unwrap();

        repo.create(&test_shop("None", owner)).await.unwrap();

        // Membership over both IDs; the shop holding both appears once
        let results = repo
            .search(&ShopSearch {
                types: vec![a.id, b.id],
                ..Default::default()
            })
            .await
            .unwrap();
        let found = ids(&results);
        assert_eq!(found.len(), 3);
        for id in [one.id, both.id, other.id] {
            assert!(found.contains(&id));
        }

        // Tag filters of different kinds AND together
        let results = repo
            .search(&ShopSearch {
                types: vec![a.id],
                concepts: vec![quiet.id],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&results), vec![one.id]);
    }

    #[tokio::test]
    async fn test_search_location_precedence() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let repo = ShopRepository::new(&pool);

        let mut params = test_shop("Shibuya", owner);
        params.address = test_address("東京都", "渋谷区", "神南");
        let shibuya = repo.create(&params).await.unwrap();

        let mut params = test_shop("Osaka Kita", owner);
        params.address = test_address("大阪府", "北区", "梅田");
        let osaka_kita = repo.create(&params).await.unwrap();

        let mut params = test_shop("Tokyo Kita", owner);
        params.address = test_address("東京都", "北区", "王子");
        let tokyo_kita = repo.create(&params).await.unwrap();

        // City is an exact match and ignores prefecture entirely
        let results = repo
            .search(&ShopSearch {
                city: Some("北区".to_string()),
                prefecture: Some("東京都".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let found = ids(&results);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&osaka_kita.id));
        assert!(found.contains(&tokyo_kita.id));

        let results = repo
            .search(&ShopSearch {
                prefecture: Some("東京都".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let found = ids(&results);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&shibuya.id));
        assert!(found.contains(&tokyo_kita.id));

        // Region is a substring match against prefecture
        let results = repo
            .search(&ShopSearch {
                region: Some("大阪".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&results), vec![osaka_kita.id]);
    }

    #[tokio::test]
    async fn test_search_keyword_escapes_like_wildcards() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let repo = ShopRepository::new(&pool);

        let literal = repo.create(&test_shop("Rock 100% Cafe", owner)).await.unwrap();
        repo.create(&test_shop("Rock 100x Cafe", owner)).await.unwrap();

        let results = repo
            .search(&ShopSearch {
                keyword: Some("100%".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&results), vec![literal.id]);
    }

    #[tokio::test]
    async fn test_update_rewrites_scalars_address_and_tags() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let tags = TagRepository::new(&pool);
        let a = tags.create(TagKind::Type, "バー").await.unwrap();
        let b = tags.create(TagKind::Type, "食堂").await.unwrap();

        let repo = ShopRepository::new(&pool);
        let mut params = test_shop("Before", owner);
        params.types = vec![a.id];
        let created = repo.create(&params).await.unwrap();

        let mut shop = created.clone();
        shop.name = "After".to_string();
        shop.phone_number = Some("03-0000-0000".to_string());
        shop.coordinates = Some(Coordinates::new(34.7, 135.5).unwrap());
        shop.address.city = "目黒区".to_string();
        shop.types = vec![b.clone()];
        shop.updated_at = Utc::now();
        repo.update(&shop).await.unwrap();

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "After");
        assert_eq!(fetched.phone_number.as_deref(), Some("03-0000-0000"));
        assert_eq!(fetched.coordinates, shop.coordinates);
        assert_eq!(fetched.address.city, "目黒区");
        assert_eq!(fetched.address.id, created.address.id);
        assert_eq!(fetched.types, vec![b]);

        // An empty list clears the relation
        let mut shop = fetched;
        shop.types = Vec::new();
        repo.update(&shop).await.unwrap();
        assert!(repo.get(created.id).await.unwrap().unwrap().types.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_shop_is_not_found() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let repo = ShopRepository::new(&pool);

        let created = repo.create(&test_shop("Ghost", owner)).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());

        let err = repo.update(&created).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_removes_owned_address() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let repo = ShopRepository::new(&pool);

        let keep = repo.create(&test_shop("Keep", owner)).await.unwrap();
        let gone = repo.create(&test_shop("Gone", owner)).await.unwrap();

        let addresses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(addresses, 2);

        assert!(repo.delete(gone.id).await.unwrap());
        assert!(!repo.delete(gone.id).await.unwrap());

        let addresses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(addresses, 1);
        assert!(repo.get(keep.id).await.unwrap().is_some());
        assert!(repo.get(gone.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool).await;
        let repo = ShopRepository::new(&pool);

        let created = repo.create(&test_shop("Here", owner)).await.unwrap();
        assert!(repo.exists(created.id).await.unwrap());
        assert!(!repo.exists(ShopId::new(999)).await.unwrap());
    }
}
