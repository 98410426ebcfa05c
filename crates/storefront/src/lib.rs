//! Aries Mall storefront.
//!
//! The shop runs as a single-page app over an in-process document model:
//!
//! - [`store`] - cart, wishlist and session state with change notification
//! - [`router`] - fragment routing, access guards and page lifecycle
//! - [`outlet`] - the rendered document and navigation tokens
//! - [`pages`] - one controller per route
//! - [`api`] - catalog reads that degrade to empty results
//! - [`app`] - wiring for a running shop
//!
//! Everything that talks to the hosted backend goes through
//! [`backend::ShopBackend`], implemented for the Supabase client.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod outlet;
pub mod pages;
pub mod router;
pub mod storage;
pub mod store;
pub mod ui;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use app::Storefront;
pub use config::StorefrontConfig;
pub use error::{AppError, Result};
