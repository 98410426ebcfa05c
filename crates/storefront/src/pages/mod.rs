//! Page controllers.
//!
//! Each navigation creates a fresh page object. The router injects its
//! template, calls [`Page::init`] once with a [`View`] bound to that
//! navigation, forwards [`UiEvent`]s to [`Page::handle`] while it is active
//! and calls [`Page::cleanup`] before dropping it. Timers and handler state
//! live on the page object, so they go away with it.

pub mod auth;
pub mod cards;
pub mod cart;
pub mod category;
pub mod home;
pub mod product;
pub mod profile;
pub mod search;

use std::time::Duration;

use async_trait::async_trait;
use aries_mall_core::ProductId;
use rust_decimal::Decimal;

pub use cards::{ProductCard, ProductCardActions};

use crate::api::Catalog;
use crate::error::Result;
use crate::outlet::View;
use crate::store::Store;
use crate::ui::{Theme, Toasts};

/// Everything a page controller may use.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub store: Store,
    pub catalog: Catalog,
    pub toasts: Toasts,
    pub theme: Theme,
    /// Hero carousel auto-advance
    pub slide_interval: Duration,
    /// Category price filter debounce
    pub filter_debounce: Duration,
}

/// User interactions delivered to the active page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// "Add" on a product card or the detail page.
    AddToCart { product_id: ProductId },
    /// Heart button on a product card or the detail page.
    ToggleWishlist { product_id: ProductId },
    /// Home category chip; `None` is "All".
    SelectCategory(Option<String>),
    /// Sort dropdown value.
    SortBy(String),
    /// Category page price inputs.
    PriceRange {
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    /// Category page brand filter; `None` clears it.
    SelectBrand(Option<String>),
    /// Hero thumbnail.
    SelectSlide(usize),
    /// Detail page quantity stepper.
    ChangeQuantity(i32),
    /// Detail page gallery thumbnail.
    SelectImage(usize),
    IncreaseQuantity { product_id: ProductId },
    DecreaseQuantity { product_id: ProductId },
    RemoveItem { product_id: ProductId },
    SubmitLogin {
        email: String,
        password: String,
    },
    SubmitSignup {
        full_name: String,
        email: String,
        password: String,
    },
    /// Header search box.
    Search(String),
    SignOut,
    ToggleTheme,
}

/// What the router should do after a handler ran.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    /// Go to another fragment, e.g. `/login`.
    Navigate(String),
}

/// A page controller.
#[async_trait]
pub trait Page: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// The page skeleton, injected before [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns `askama::Error` if the template fails to render.
    fn template(&self) -> std::result::Result<String, askama::Error>;

    /// Fetches data and renders regions. Called exactly once per navigation.
    ///
    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    async fn init(&self, view: &View) -> Result<()>;

    /// Handles an interaction.
    ///
    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    async fn handle(&self, _view: &View, _event: UiEvent) -> Result<Effect> {
        Ok(Effect::None)
    }

    /// Stops timers and background work.
    fn cleanup(&self) {}
}
