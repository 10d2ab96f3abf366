//! Domain models for the garden API.
//!
//! These types represent validated domain objects, separate from database row
//! types (`db`) and from the JSON request/response shapes (`routes`).

pub mod review;
pub mod shop;
pub mod user;

pub use review::{Review, ReviewPhoto};
pub use shop::{Address, Shop, ShopPhoto, Tag};
pub use user::User;
