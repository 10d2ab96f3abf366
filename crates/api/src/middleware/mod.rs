//! Middleware and extractors for the Garden API.

pub mod auth;

pub use auth::CurrentUser;
