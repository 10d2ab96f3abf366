//! Tag vocabulary repository (shop types, concepts, layouts).
//!
//! The three vocabularies are structurally identical lookup tables, so every
//! query here is composed per [`TagKind`] rather than written three times.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use garden_core::TagId;

use super::RepositoryError;
use crate::models::Tag;

/// The three tag vocabularies attachable to shops.
///
/// Each kind has its own lookup table and an identically shaped junction
/// table against `shops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Type,
    Concept,
    Layout,
}

impl TagKind {
    pub const ALL: [Self; 3] = [Self::Type, Self::Concept, Self::Layout];

    /// Lookup table holding the vocabulary.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Type => "shop_types",
            Self::Concept => "shop_concepts",
            Self::Layout => "shop_layouts",
        }
    }

    /// Junction table linking shops to this vocabulary.
    #[must_use]
    pub const fn link_table(self) -> &'static str {
        match self {
            Self::Type => "shop_type_links",
            Self::Concept => "shop_concept_links",
            Self::Layout => "shop_layout_links",
        }
    }

    /// Field name used in payloads, query parameters, and error maps.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Type => "types",
            Self::Concept => "concepts",
            Self::Layout => "layouts",
        }
    }
}

/// Internal row type for tag queries.
#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
}

impl TagRow {
    fn into_tag(self) -> Tag {
        Tag {
            id: TagId::new(self.id),
            name: self.name,
        }
    }
}

/// Repository for tag vocabulary operations.
pub struct TagRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TagRepository<'a> {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List the whole vocabulary of one kind, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, kind: TagKind) -> Result<Vec<Tag>, RepositoryError> {
        let sql = format!("SELECT id, name FROM {} ORDER BY id", kind.table());
        let rows = sqlx::query_as::<_, TagRow>(&sql).fetch_all(self.pool).await?;

        Ok(rows.into_iter().map(TagRow::into_tag).collect())
    }

    /// Add a name to the vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, kind: TagKind, name: &str) -> Result<Tag, RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (name) VALUES (?) RETURNING id, name",
            kind.table()
        );
        let row = sqlx::query_as::<_, TagRow>(&sql)
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("tag name already exists".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        Ok(row.into_tag())
    }

    /// Delete a tag. Junction rows referencing it cascade away.
    ///
    /// # Returns
    ///
    /// Returns `true` if the tag was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, kind: TagKind, id: TagId) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        let result = sqlx::query(&sql)
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch the tags with the given IDs, in ID order.
    ///
    /// IDs absent from the vocabulary are silently skipped, so comparing the
    /// result against the input reveals invalid references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        kind: TagKind,
        ids: &[TagId],
    ) -> Result<Vec<Tag>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT id, name FROM {} WHERE id IN (", kind.table()));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.as_i64());
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<TagRow> = qb.build_query_as().fetch_all(self.pool).await?;

        Ok(rows.into_iter().map(TagRow::into_tag).collect())
    }
}
