//! Geographic coordinate pair with validation.
//!
//! A shop either has both a latitude and a longitude or neither. Holding the
//! pair in a single type makes the half-set state unrepresentable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing [`Coordinates`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatesError {
    #[error("latitude must be between -90 and 90")]
    LatitudeOutOfRange,

    #[error("longitude must be between -180 and 180")]
    LongitudeOutOfRange,

    #[error("latitude and longitude must be provided together")]
    IncompletePair,
}

/// A validated latitude/longitude pair.
///
/// Values are rounded to 8 decimal places on construction, which is
/// centimetre-level precision and matches what geocoding providers return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair, validating ranges and rounding to 8 decimal
    /// places.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinatesError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinatesError::LatitudeOutOfRange);
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinatesError::LongitudeOutOfRange);
        }
        Ok(Self {
            latitude: round8(latitude),
            longitude: round8(longitude),
        })
    }

    /// Build from a pair of optional values, enforcing that both are present
    /// or both are absent.
    ///
    /// Returns `Ok(None)` when both are `None`, `Ok(Some(_))` when both are
    /// `Some`, and [`CoordinatesError::IncompletePair`] otherwise.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, CoordinatesError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Ok(Some(Self::new(lat, lon)?)),
            (None, None) => Ok(None),
            _ => Err(CoordinatesError::IncompletePair),
        }
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}
