//! Aries Mall admin panel.
//!
//! A single administrator account manages the catalog, the homepage slides
//! and the media library:
//!
//! - [`router`] - admin gate, page lifecycle and sidebar
//! - [`pages`] - dashboard, product and slide managers, media hub, profile
//! - [`media`] - staging, `TinyPNG`, Cloudinary, Replicate and history
//! - [`settings`] - integration credentials from `system_config`, cached
//! - [`app`] - wiring for a running panel
//!
//! Backend access goes through [`backend::AdminBackend`], implemented for
//! the Supabase client.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod backend;
pub mod components;
pub mod config;
pub mod error;
pub mod media;
pub mod pages;
pub mod router;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use app::AdminPanel;
pub use config::AdminConfig;
pub use error::{AdminError, MediaError, Result};
