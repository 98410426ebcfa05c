//! Admin page controllers.
//!
//! Same lifecycle as the storefront: a page object per navigation, its
//! template injected first, `init` called once with a [`View`] bound to the
//! navigation, events delivered to `handle`, `cleanup` on teardown.

pub mod dashboard;
pub mod login;
pub mod media_hub;
pub mod products;
pub mod profile;
pub mod slides;

use std::sync::Arc;

use aries_mall_core::{ProductId, SlideId};
use aries_mall_storefront::outlet::View;
use aries_mall_storefront::ui::{Theme, Toasts};
use async_trait::async_trait;

use crate::backend::AdminBackend;
use crate::config::AdminConfig;
use crate::error::{AdminError, Result};
use crate::media::{MediaHub, Scale, StagedFile};

pub use products::ProductForm;
pub use slides::SlideForm;

/// Message shown when no backend client exists.
pub const NO_BACKEND: &str = "System error: Database client not configured.";

/// Yes/no prompt before destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Everything an admin page may use.
#[derive(Clone)]
pub struct AdminContext {
    pub backend: Option<Arc<dyn AdminBackend>>,
    pub config: Arc<AdminConfig>,
    pub toasts: Toasts,
    pub theme: Theme,
    /// Absent without a backend
    pub media: Option<MediaHub>,
    pub confirm: Arc<dyn Confirm>,
}

impl std::fmt::Debug for AdminContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminContext")
            .field("backend", &self.backend.is_some())
            .field("admin_email", &self.config.admin_email)
            .finish_non_exhaustive()
    }
}

impl AdminContext {
    /// # Errors
    ///
    /// Returns `Validation` with [`NO_BACKEND`] when there is no client.
    pub fn backend(&self) -> Result<&Arc<dyn AdminBackend>> {
        self.backend
            .as_ref()
            .ok_or_else(|| AdminError::Validation(NO_BACKEND.to_owned()))
    }

    /// # Errors
    ///
    /// Returns `Validation` with [`NO_BACKEND`] when there is no client.
    pub fn media(&self) -> Result<&MediaHub> {
        self.media
            .as_ref()
            .ok_or_else(|| AdminError::Validation(NO_BACKEND.to_owned()))
    }

    /// Email of the signed-in account, if any.
    #[must_use]
    pub fn session_email(&self) -> Option<String> {
        self.backend.as_ref()?.session()?.user.email
    }

    /// Whether the signed-in account is the administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.session_email()
            .is_some_and(|email| self.config.is_admin_email(&email))
    }
}

/// Media hub tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaTab {
    #[default]
    Uploader,
    Upscaler,
    History,
}

/// Admin interactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminEvent {
    SubmitLogin {
        email: String,
        password: String,
    },
    SearchProducts(String),
    /// `None` opens an empty form.
    EditProduct(Option<ProductId>),
    SaveProduct(ProductForm),
    DeleteProduct(ProductId),
    EditSlide(Option<SlideId>),
    SaveSlide(SlideForm),
    DeleteSlide(SlideId),
    CloseModal,
    SelectTab(MediaTab),
    StageFile(StagedFile),
    StageUrl(String),
    RenameStaged {
        id: String,
        name: String,
    },
    DiscardStaged(String),
    /// Uploads one staged item.
    Upload(String),
    UploadAll,
    StageUpscaleFile(StagedFile),
    StageUpscaleUrl(String),
    DiscardUpscale(String),
    StartUpscale(Scale),
    RefreshHistory,
    ClearHistory,
    SignOut,
    ToggleTheme,
}

/// Admin pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminPage {
    #[default]
    Dashboard,
    ProductManager,
    MediaHub,
    Profile,
    Login,
}

impl AdminPage {
    pub const ALL: [Self; 5] = [
        Self::Dashboard,
        Self::ProductManager,
        Self::MediaHub,
        Self::Profile,
        Self::Login,
    ];

    /// `None` for unknown slugs; empty is the dashboard.
    #[must_use]
    pub fn parse(slug: &str) -> Option<Self> {
        match slug {
            "" | "dashboard" => Some(Self::Dashboard),
            "product-manager" => Some(Self::ProductManager),
            "media-hub" => Some(Self::MediaHub),
            "profile" => Some(Self::Profile),
            "admin-login" => Some(Self::Login),
            _ => None,
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::ProductManager => "product-manager",
            Self::MediaHub => "media-hub",
            Self::Profile => "profile",
            Self::Login => "admin-login",
        }
    }

    /// Header title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::ProductManager => "Product Manager",
            Self::MediaHub => "Media Hub",
            Self::Profile => "User Profile",
            Self::Login => "Sign In",
        }
    }
}

/// What the router should do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    None,
    Navigate(AdminPage),
}

/// An admin page controller.
#[async_trait]
pub trait Page: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns `askama::Error` if the template fails to render.
    fn template(&self) -> std::result::Result<String, askama::Error>;

    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    async fn init(&self, view: &View) -> Result<()>;

    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    async fn handle(&self, _view: &View, _event: AdminEvent) -> Result<Effect> {
        Ok(Effect::None)
    }

    fn cleanup(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slugs_round_trip() {
        for page in AdminPage::ALL {
            assert_eq!(AdminPage::parse(page.slug()), Some(page));
        }
        assert_eq!(AdminPage::parse(""), Some(AdminPage::Dashboard));
        assert_eq!(AdminPage::parse("orders"), None);
        assert_eq!(AdminPage::Profile.title(), "User Profile");
    }
}
