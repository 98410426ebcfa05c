//! Fragment router.
//!
//! Maps `#/path?query` fragments to page controllers. Each navigation runs
//! the previous page's cleanup, applies the access guards, begins a new
//! navigation on the [`Outlet`] (so every older [`View`] goes stale),
//! injects the page template and calls the page's `init` exactly once.

use std::sync::{Arc, Mutex, PoisonError};

use aries_mall_core::ProductId;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::outlet::{Outlet, View};
use crate::pages::auth::{AuthMode, AuthPage};
use crate::pages::cart::CartPage;
use crate::pages::category::CategoryPage;
use crate::pages::home::HomePage;
use crate::pages::product::ProductPage;
use crate::pages::profile::ProfilePage;
use crate::pages::search::SearchPage;
use crate::pages::{Effect, Page, PageContext, UiEvent};
use crate::ui::{CategoryLink, refresh_chrome};

/// Redirects followed within one navigation before giving up.
const MAX_REDIRECTS: usize = 4;

const NOT_FOUND_HTML: &str = "<h1>404 - Page Not Found</h1>";
const LOAD_ERROR_HTML: &str = "<h1>Error - Could not load page</h1>";

/// A parsed fragment: path plus decoded query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    /// Parses `#/path?query`. The leading `#` is optional and an empty path
    /// is `/`.
    #[must_use]
    pub fn parse(fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let (path, query) = fragment.split_once('?').unwrap_or((fragment, ""));
        let path = if path.is_empty() { "/" } else { path };
        Self {
            path: path.to_owned(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// First value for `key`.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A resolved page with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Cart,
    Login,
    Signup,
    Search { query: Option<String> },
    Product { id: ProductId },
    Category { slug: String, brand: Option<String> },
    Profile { subview: Option<String> },
}

impl Route {
    /// Static table first, then the dynamic prefixes.
    #[must_use]
    pub fn resolve(location: &Location) -> Option<Self> {
        let route = match location.path.as_str() {
            "/" => Self::Home,
            "/cart" => Self::Cart,
            "/login" => Self::Login,
            "/signup" => Self::Signup,
            "/search" => Self::Search {
                query: location.param("q").map(str::to_owned),
            },
            "/profile" => Self::Profile { subview: None },
            path => {
                let mut segments = path.trim_start_matches('/').split('/');
                let (prefix, param) = (segments.next()?, segments.next());
                let param = param.filter(|p| !p.is_empty()).map(str::to_owned);
                match prefix {
                    "product" => Self::Product {
                        id: ProductId::new(param?),
                    },
                    "category" => Self::Category {
                        slug: param?,
                        brand: location.param("brand").map(str::to_owned),
                    },
                    "profile" => Self::Profile { subview: param },
                    _ => return None,
                }
            }
        };
        Some(route)
    }
}

/// Router lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RouterState {
    #[default]
    Idle,
    Loading(Route),
    Active(Route),
}

enum Guard {
    Allow,
    Redirect(&'static str),
}

struct ActivePage {
    page: Arc<dyn Page>,
    view: View,
}

/// Routes fragments to pages and events to the active page.
pub struct Router {
    outlet: Outlet,
    ctx: PageContext,
    categories: Vec<CategoryLink>,
    state: Mutex<RouterState>,
    active: Mutex<Option<ActivePage>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Router {
    #[must_use]
    pub fn new(outlet: Outlet, ctx: PageContext, categories: Vec<CategoryLink>) -> Self {
        Self {
            outlet,
            ctx,
            categories,
            state: Mutex::new(RouterState::Idle),
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> RouterState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub const fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    #[must_use]
    pub const fn context(&self) -> &PageContext {
        &self.ctx
    }

    fn set_state(&self, state: RouterState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn teardown(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            debug!(page = previous.page.name(), "Cleaning up page");
            previous.page.cleanup();
        }
        self.set_state(RouterState::Idle);
    }

    fn guard(&self, path: &str) -> Guard {
        let signed_in = self.ctx.store.is_authenticated();
        if path.starts_with("/profile") && !signed_in {
            self.ctx
                .toasts
                .info("Access Denied", "Please sign in to view this page.");
            return Guard::Redirect("/login");
        }
        if signed_in && (path == "/login" || path == "/signup") {
            return Guard::Redirect("/profile");
        }
        if path == "/wishlist" {
            return Guard::Redirect("/profile/wishlist");
        }
        Guard::Allow
    }

    fn build(&self, route: &Route) -> Arc<dyn Page> {
        let ctx = self.ctx.clone();
        match route {
            Route::Home => Arc::new(HomePage::new(ctx)),
            Route::Cart => Arc::new(CartPage::new(ctx)),
            Route::Login => Arc::new(AuthPage::new(ctx, AuthMode::Login)),
            Route::Signup => Arc::new(AuthPage::new(ctx, AuthMode::Signup)),
            Route::Search { query } => Arc::new(SearchPage::new(ctx, query.as_deref())),
            Route::Product { id } => Arc::new(ProductPage::new(ctx, id.clone())),
            Route::Category { slug, brand } => {
                Arc::new(CategoryPage::new(ctx, slug, brand.as_deref()))
            }
            Route::Profile { subview } => Arc::new(ProfilePage::new(ctx, subview.as_deref())),
        }
    }

    /// Navigates to `fragment`, following guard redirects.
    ///
    /// Returns the route that was rendered, or `None` for an unknown path,
    /// a template failure or a navigation superseded while loading.
    pub async fn navigate(&self, fragment: &str) -> Option<Route> {
        let mut location = Location::parse(fragment);
        for _ in 0..=MAX_REDIRECTS {
            self.teardown();
            match self.guard(&location.path) {
                Guard::Allow => return self.load(&location).await,
                Guard::Redirect(to) => {
                    debug!(from = %location.path, to, "Redirecting");
                    location = Location::parse(to);
                }
            }
        }
        warn!(path = %location.path, "Too many redirects");
        self.render_static(NOT_FOUND_HTML, "Page Not Found | Aries Mall");
        None
    }

    fn render_static(&self, html: &str, title: &str) {
        let view = self.outlet.begin_navigation();
        if let Err(e) = view
            .inject(html.to_owned())
            .and_then(|()| view.set_title(title))
        {
            debug!(error = %e, "Static render superseded");
        }
    }

    async fn load(&self, location: &Location) -> Option<Route> {
        let Some(route) = Route::resolve(location) else {
            info!(path = %location.path, "No route");
            self.render_static(NOT_FOUND_HTML, "Page Not Found | Aries Mall");
            return None;
        };
        let page = self.build(&route);
        let template = match page.template() {
            Ok(html) => html,
            Err(e) => {
                error!(page = page.name(), error = %e, "Failed to render page template");
                self.render_static(LOAD_ERROR_HTML, "Error | Aries Mall");
                return None;
            }
        };

        let view = self.outlet.begin_navigation();
        if view.inject(template).is_err() {
            return None;
        }
        self.set_state(RouterState::Loading(route.clone()));
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActivePage {
            page: Arc::clone(&page),
            view: view.clone(),
        });

        match page.init(&view).await {
            Ok(()) => {}
            Err(AppError::Stale) => {
                debug!(page = page.name(), "Initializer superseded");
                return None;
            }
            Err(e) => {
                error!(page = page.name(), error = %e, "Page failed to initialize");
                self.ctx.toasts.error("Something Went Wrong", e.user_message());
            }
        }
        if !view.is_current() {
            return None;
        }
        self.set_state(RouterState::Active(route.clone()));
        Some(route)
    }

    /// Delivers an event. Chrome events (sign out, theme, search) are
    /// handled here; the rest go to the active page. A resulting
    /// [`Effect::Navigate`] is followed.
    ///
    /// # Errors
    ///
    /// Returns the page's error other than `Stale`, which is dropped.
    pub async fn dispatch(&self, event: UiEvent) -> Result<Option<Route>> {
        match &event {
            UiEvent::SignOut => {
                if let Err(e) = self.ctx.store.sign_out().await {
                    warn!(error = %e, "Sign out failed");
                }
                self.ctx
                    .toasts
                    .success("Signed Out", "You have been successfully signed out.");
                return Ok(self.navigate("/login").await);
            }
            UiEvent::Search(query) => {
                let query = query.trim();
                if query.is_empty() {
                    return Ok(None);
                }
                let target = format!("/search?q={}", urlencoding::encode(query));
                return Ok(self.navigate(&target).await);
            }
            UiEvent::ToggleTheme => {
                if let Err(e) = self.ctx.theme.toggle() {
                    warn!(error = %e, "Failed to save theme");
                }
                refresh_chrome(&self.outlet, &self.ctx.store, &self.categories, &self.ctx.theme);
            }
            _ => {}
        }

        let active = {
            let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            active
                .as_ref()
                .map(|a| (Arc::clone(&a.page), a.view.clone()))
        };
        let Some((page, view)) = active else {
            return Ok(None);
        };
        match page.handle(&view, event).await {
            Ok(Effect::None) => Ok(None),
            Ok(Effect::Navigate(target)) => Ok(self.navigate(&target).await),
            Err(AppError::Stale) => {
                debug!(page = page.name(), "Handler superseded");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the active page's cleanup.
    pub fn shutdown(&self) {
        self.teardown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        let loc = Location::parse("#/search?q=electric%20bike&x=1");
        assert_eq!(loc.path, "/search");
        assert_eq!(loc.param("q"), Some("electric bike"));
        assert_eq!(Location::parse("").path, "/");
        assert_eq!(Location::parse("#").path, "/");
    }

    #[test]
    fn test_resolve_static_and_dynamic() {
        let r = |f: &str| Route::resolve(&Location::parse(f));
        assert_eq!(r("#/"), Some(Route::Home));
        assert_eq!(r("#/cart"), Some(Route::Cart));
        assert_eq!(
            r("#/product/42"),
            Some(Route::Product {
                id: ProductId::new("42")
            })
        );
        assert_eq!(
            r("#/category/electric-scooters?brand=tvs"),
            Some(Route::Category {
                slug: "electric-scooters".into(),
                brand: Some("tvs".into())
            })
        );
        assert_eq!(
            r("#/profile/orders"),
            Some(Route::Profile {
                subview: Some("orders".into())
            })
        );
        assert_eq!(r("#/profile"), Some(Route::Profile { subview: None }));
        assert_eq!(r("#/product/"), None);
        assert_eq!(r("#/nowhere"), None);
    }
}
