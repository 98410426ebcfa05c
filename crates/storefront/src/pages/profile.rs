//! Account area: profile details, orders, wishlist and settings.

use std::sync::{Mutex, PoisonError};

use askama::Template;
use async_trait::async_trait;
use futures::future::join_all;
use aries_mall_core::{Product, ProductId};

use super::cards::{CallToAction, EmptyState, ProductCardActions, render_removable_grid};
use super::{Effect, Page, PageContext, UiEvent};
use crate::error::Result;
use crate::outlet::View;
use crate::store::SyncStatus;

/// Sections of the account area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileView {
    #[default]
    Profile,
    Orders,
    Wishlist,
    Settings,
}

impl ProfileView {
    pub const ALL: [Self; 4] = [Self::Profile, Self::Orders, Self::Wishlist, Self::Settings];

    /// Unknown names fall back to [`ProfileView::Profile`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "orders" => Self::Orders,
            "wishlist" => Self::Wishlist,
            "settings" => Self::Settings,
            _ => Self::Profile,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Orders => "orders",
            Self::Wishlist => "wishlist",
            Self::Settings => "settings",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Profile => "My Profile",
            Self::Orders => "Order History",
            Self::Wishlist => "Wishlist",
            Self::Settings => "Settings",
        }
    }
}

struct NavLink {
    slug: &'static str,
    label: &'static str,
    active: bool,
    badge: Option<usize>,
}

#[derive(Template)]
#[template(path = "partials/profile_nav.html")]
struct NavTemplate {
    links: Vec<NavLink>,
}

#[derive(Template)]
#[template(path = "partials/profile_info.html")]
struct InfoTemplate {
    full_name: String,
    email: String,
    member_since: String,
}

#[derive(Template)]
#[template(path = "partials/profile_settings.html")]
struct SettingsTemplate {
    theme: &'static str,
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
struct ProfileTemplate;

const ORDERS: &str = r#"<div class="profile-card"><h2>Order History</h2><p>You haven't placed any orders yet.</p></div>"#;

/// `/profile[/:subview]`
pub struct ProfilePage {
    view: ProfileView,
    ctx: PageContext,
    actions: ProductCardActions,
    wishlist: Mutex<Vec<Product>>,
}

impl ProfilePage {
    #[must_use]
    pub fn new(ctx: PageContext, subview: Option<&str>) -> Self {
        Self {
            view: subview.map(ProfileView::parse).unwrap_or_default(),
            actions: ProductCardActions::new(ctx.clone()),
            ctx,
            wishlist: Mutex::new(Vec::new()),
        }
    }

    fn render_nav(&self, view: &View) -> Result<()> {
        let count = self.ctx.store.wishlist_count();
        let links = ProfileView::ALL
            .iter()
            .map(|v| NavLink {
                slug: v.as_str(),
                label: v.label(),
                active: *v == self.view,
                badge: (*v == ProfileView::Wishlist && count > 0).then_some(count),
            })
            .collect();
        view.set("nav", NavTemplate { links }.render()?)
    }

    fn render_wishlist(&self, view: &View) -> Result<()> {
        let cards = self
            .actions
            .cards(&self.wishlist.lock().unwrap_or_else(PoisonError::into_inner));
        let html = if cards.is_empty() {
            EmptyState {
                title: "Your Wishlist is Empty",
                text: "Explore our products and save your favorites!",
                action: Some(CallToAction {
                    href: "#/",
                    label: "Explore Products",
                }),
            }
            .render()?
        } else {
            format!(
                r#"<div class="profile-card"><h2>My Wishlist</h2><div class="product-grid">{}</div></div>"#,
                render_removable_grid(&cards, "")?
            )
        };
        view.set("content", html)
    }

    fn render_settings(&self, view: &View) -> Result<()> {
        let html = SettingsTemplate {
            theme: self.ctx.theme.mode().as_str(),
        }
        .render()?;
        view.set("content", html)
    }

    async fn remove_from_wishlist(&self, view: &View, product: &ProductId) -> Result<()> {
        if self.ctx.store.is_in_wishlist(product) {
            let toggle = self.ctx.store.toggle_wishlist(product).await;
            self.ctx.toasts.success("Removed from Wishlist", "");
            if toggle.sync == SyncStatus::Failed {
                self.ctx.toasts.error(
                    "Wishlist Not Saved",
                    "Your wishlist could not be saved. Please try again.",
                );
            }
        }
        self.wishlist
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| &p.id != product);
        self.render_nav(view)?;
        self.render_wishlist(view)
    }
}

#[async_trait]
impl Page for ProfilePage {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        ProfileTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        let Some(user) = self.ctx.store.user() else {
            return Ok(());
        };
        view.set_title(format!("{} | Aries Mall", self.view.label()))?;
        let greeting = user
            .user_metadata
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("there")
            .to_owned();
        view.set("greeting", greeting)?;
        self.render_nav(view)?;
        view.set(
            "content",
            r#"<div class="profile-card"><div class="skeleton-loader"></div></div>"#,
        )?;

        match self.view {
            ProfileView::Profile => {
                let info = InfoTemplate {
                    full_name: user
                        .user_metadata
                        .full_name
                        .clone()
                        .filter(|n| !n.trim().is_empty())
                        .or_else(|| user.email.clone())
                        .unwrap_or_default(),
                    email: user.email.clone().unwrap_or_default(),
                    member_since: user.member_since(),
                };
                view.set("content", info.render()?)
            }
            ProfileView::Orders => view.set("content", ORDERS),
            ProfileView::Wishlist => {
                let ids = self.ctx.store.wishlist_ids();
                let catalog = &self.ctx.catalog;
                let products: Vec<Product> =
                    join_all(ids.iter().map(|id| catalog.product(id)))
                        .await
                        .into_iter()
                        .flatten()
                        .collect();
                *self.wishlist.lock().unwrap_or_else(PoisonError::into_inner) = products;
                self.render_wishlist(view)
            }
            ProfileView::Settings => self.render_settings(view),
        }
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match (self.view, event) {
            (
                ProfileView::Wishlist,
                UiEvent::ToggleWishlist { product_id } | UiEvent::RemoveItem { product_id },
            ) => self.remove_from_wishlist(view, &product_id).await?,
            (ProfileView::Wishlist, UiEvent::AddToCart { product_id }) => {
                let shown = self
                    .wishlist
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                self.actions.add_to_cart(&product_id, &shown).await;
            }
            (ProfileView::Settings, UiEvent::ToggleTheme) => self.render_settings(view)?,
            _ => {}
        }
        Ok(Effect::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subview_parse_defaults_to_profile() {
        assert_eq!(ProfileView::parse("orders"), ProfileView::Orders);
        assert_eq!(ProfileView::parse("wishlist"), ProfileView::Wishlist);
        assert_eq!(ProfileView::parse("settings"), ProfileView::Settings);
        assert_eq!(ProfileView::parse("billing"), ProfileView::Profile);
        assert_eq!(ProfileView::parse(""), ProfileView::Profile);
    }
}
