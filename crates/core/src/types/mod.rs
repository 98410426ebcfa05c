//! Core types for Aries Mall.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod media;
pub mod price;
pub mod product;
pub mod session;
pub mod slide;
pub mod toast;
pub mod wishlist;

pub use cart::{Cart, LineItem, Quantity, QuantityChange};
pub use email::{Email, EmailError};
pub use id::*;
pub use media::{MediaHistoryEntry, MediaKind, NewMediaHistoryEntry};
pub use price::{Price, format_inr};
pub use product::{Product, ProductDraft};
pub use session::{AccessToken, Session, User, UserMetadata};
pub use slide::{HeroSlide, ImageFit, SlideDraft, SlideRow};
pub use toast::{Toast, ToastKind};
pub use wishlist::Wishlist;
