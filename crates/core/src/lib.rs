//! Garden Core - Shared types library.
//!
//! This crate provides common types used across the Garden backend components:
//! - `api` - HTTP API serving shop search, shop lifecycle, reviews, and accounts
//! - `integration-tests` - Black-box tests against a running API
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, coordinates, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
