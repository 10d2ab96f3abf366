//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Request payload or query parameters failed validation.
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Resource not found.
    #[error("Not found")]
    NotFound,

    /// Request lacked valid authentication.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    /// Validation error for a single field.
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

/// Validation messages keyed by field name, serialized as the 400 response body.
///
/// Nested address fields use dotted keys (`address.city`). Violations that span
/// multiple fields are recorded under `non_field_errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field, appending if the field already has one.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finish accumulating.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` carrying `self` if any message was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server faults to Sentry
        if matches!(
            self,
            Self::Database(RepositoryError::Database(_) | RepositoryError::DataCorruption(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            Self::NotFound | Self::Database(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, json!({"error": "Not found"}))
            }
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, json!({"error": message})),
            Self::Database(RepositoryError::Conflict(message)) => {
                (StatusCode::CONFLICT, json!({"error": message}))
            }
            // Don't expose internal error details to clients
            Self::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Internal server error"}),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
