//! Aries Mall Core - Shared types library.
//!
//! This crate provides common types used across all Aries Mall components:
//! - `supabase` - Client for the hosted backend (tables + auth)
//! - `storefront` - Customer-facing shop (store, router, pages)
//! - `admin` - Administration panel (catalog management, media hub)
//! - `cli` - Command-line driver for both apps
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere, including in tests that never touch the network.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, products, cart, wishlist, sessions
//! - [`image`] - Cloudinary transform helpers and placeholders
//! - [`slug`] - Category/brand slug normalization

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod image;
pub mod slug;
pub mod types;

pub use types::*;
