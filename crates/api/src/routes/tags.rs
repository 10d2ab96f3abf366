//! Tag vocabulary handlers.
//!
//! One set of handlers serves all three vocabularies; the kind comes from the
//! URL segment (`types`, `concepts`, `layouts`).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use garden_core::TagId;

use crate::db::tags::TagKind;
use crate::db::{RepositoryError, TagRepository};
use crate::error::{AppError, Result, ValidationErrors};
use crate::middleware::CurrentUser;
use crate::models::Tag;
use crate::routes::required_string;
use crate::state::AppState;

/// Response shape for a tag.
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: TagId,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

/// Request for adding a tag to a vocabulary.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    name: Option<String>,
}

/// Resolve a URL segment to a vocabulary. Unknown segments are a 404, the
/// same as any other unknown path.
fn vocabulary(segment: &str) -> Result<TagKind> {
    TagKind::ALL
        .into_iter()
        .find(|kind| kind.field() == segment)
        .ok_or(AppError::NotFound)
}

/// List one tag vocabulary.
///
/// # Errors
///
/// Returns 404 for an unknown vocabulary segment.
pub async fn list_tags(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<TagResponse>>> {
    let kind = vocabulary(&kind)?;
    let tags = TagRepository::new(state.pool()).list(kind).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// Add a tag to a vocabulary.
///
/// # Errors
///
/// Returns a field-level error map if the name is missing, blank, or already
/// taken within the vocabulary.
pub async fn create_tag(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>)> {
    let kind = vocabulary(&kind)?;

    let mut errors = ValidationErrors::new();
    let name = required_string(&mut errors, "name", body.name);
    errors.into_result()?;

    let tag = match TagRepository::new(state.pool()).create(kind, &name).await {
        Ok(tag) => tag,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AppError::field("name", "This field must be unique."));
        }
        Err(e) => return Err(e.into()),
    };
    debug!(vocabulary = kind.field(), tag_id = %tag.id, "Created tag");

    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// Remove a tag from a vocabulary. Shop links to it are detached.
///
/// # Errors
///
/// Returns 404 if the vocabulary segment or the tag does not exist.
pub async fn delete_tag(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<StatusCode> {
    let kind = vocabulary(&kind)?;

    let deleted = TagRepository::new(state.pool())
        .delete(kind, TagId::new(id))
        .await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    debug!(vocabulary = kind.field(), tag_id = id, "Deleted tag");
    Ok(StatusCode::NO_CONTENT)
}
