//! Thimble Core - Shared domain types.
//!
//! This crate provides the domain vocabulary used across Thimble components:
//! - `api` - The JSON HTTP service (auth, catalog, cart, checkout)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money in minor units, emails, and permissions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
