//! Core types for the Garden backend.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coords;
pub mod email;
pub mod id;

pub use coords::{Coordinates, CoordinatesError};
pub use email::{Email, EmailError};
pub use id::*;
