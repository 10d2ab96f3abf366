//! Business logic services for the Garden API.
//!
//! # Services
//!
//! - `geocoding` - Client for the external address-to-coordinate service
//! - `shops` - Shop lifecycle orchestration (tag validation, geocode-on-save)

pub mod geocoding;
pub mod shops;

pub use geocoding::{GeocodeError, GeocodingClient};
pub use shops::{AddressPatch, ShopPatch, ShopService};
