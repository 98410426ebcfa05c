//! Admin page router and gate.
//!
//! Fragments are `#/slug`. Every navigation tears down the previous page,
//! applies the admin gate, starts a new navigation on the [`Outlet`] and
//! calls the page's `init` once.

use std::sync::{Arc, Mutex, PoisonError};

use askama::Template;
use aries_mall_storefront::outlet::{Outlet, View};
use aries_mall_storefront::ui::ThemeMode;
use tracing::{debug, error, info, warn};

use crate::error::{AdminError, Result};
use crate::pages::dashboard::DashboardPage;
use crate::pages::login::LoginPage;
use crate::pages::media_hub::MediaHubPage;
use crate::pages::products::ProductManagerPage;
use crate::pages::profile::{ProfilePage, sign_out};
use crate::pages::{AdminContext, AdminEvent, AdminPage, Effect, Page};

/// Redirects followed within one navigation before giving up.
const MAX_REDIRECTS: usize = 2;

const NOT_FOUND_HTML: &str = "<h1>Page not found</h1>";
const LOAD_ERROR_HTML: &str = "<h1>Error - Could not load page</h1>";
const FALLBACK_TITLE: &str = "Admin";

/// Slug of `#/slug`, without a query string.
#[must_use]
pub fn fragment_slug(fragment: &str) -> &str {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let fragment = fragment.strip_prefix('/').unwrap_or(fragment);
    fragment.split(['?', '/']).next().unwrap_or_default()
}

/// Router lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterState {
    #[default]
    Idle,
    Loading(AdminPage),
    Active(AdminPage),
}

struct NavLink {
    slug: &'static str,
    title: &'static str,
    active: bool,
}

#[derive(Template)]
#[template(path = "partials/sidebar.html")]
struct SidebarTemplate {
    links: Vec<NavLink>,
    email: Option<String>,
    dark: bool,
}

struct ActivePage {
    page: Arc<dyn Page>,
    view: View,
}

/// Routes fragments to admin pages and events to the active page.
pub struct AdminRouter {
    outlet: Outlet,
    ctx: AdminContext,
    state: Mutex<RouterState>,
    active: Mutex<Option<ActivePage>>,
}

impl std::fmt::Debug for AdminRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRouter")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AdminRouter {
    #[must_use]
    pub fn new(outlet: Outlet, ctx: AdminContext) -> Self {
        Self {
            outlet,
            ctx,
            state: Mutex::new(RouterState::Idle),
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> RouterState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    #[must_use]
    pub const fn context(&self) -> &AdminContext {
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

    /// Where `page` should go instead, if anywhere.
    fn redirect(&self, page: AdminPage) -> Option<AdminPage> {
        match (self.ctx.is_admin(), page) {
            (true, AdminPage::Login) => Some(AdminPage::Dashboard),
            (false, AdminPage::Login) | (true, _) => None,
            (false, _) => Some(AdminPage::Login),
        }
    }

    fn build(&self, page: AdminPage) -> Arc<dyn Page> {
        let ctx = self.ctx.clone();
        match page {
            AdminPage::Dashboard => Arc::new(DashboardPage::new(ctx)),
            AdminPage::ProductManager => Arc::new(ProductManagerPage::new(ctx)),
            AdminPage::MediaHub => Arc::new(MediaHubPage::new(ctx)),
            AdminPage::Profile => Arc::new(ProfilePage::new(ctx)),
            AdminPage::Login => Arc::new(LoginPage::new(ctx)),
        }
    }

    /// Re-renders the sidebar for `current`.
    pub fn refresh_chrome(&self, current: Option<AdminPage>) {
        let email = self.ctx.is_admin().then(|| self.ctx.session_email()).flatten();
        let links = AdminPage::ALL
            .into_iter()
            .filter(|p| *p != AdminPage::Login)
            .map(|p| NavLink {
                slug: p.slug(),
                title: p.title(),
                active: Some(p) == current,
            })
            .collect();
        let sidebar = SidebarTemplate {
            links,
            email,
            dark: self.ctx.theme.mode() == ThemeMode::Dark,
        };
        match sidebar.render() {
            Ok(html) => self.outlet.set_chrome(html),
            Err(e) => error!(error = %e, "Failed to render sidebar"),
        }
    }

    /// Navigates to `fragment`, applying the admin gate.
    ///
    /// Returns the page that was rendered, or `None` for an unknown slug, a
    /// template failure or a navigation superseded while loading.
    pub async fn navigate(&self, fragment: &str) -> Option<AdminPage> {
        let slug = fragment_slug(fragment);
        let Some(mut page) = AdminPage::parse(slug) else {
            self.teardown();
            info!(slug, "No admin page");
            self.render_static(NOT_FOUND_HTML, FALLBACK_TITLE);
            return None;
        };
        for _ in 0..=MAX_REDIRECTS {
            self.teardown();
            match self.redirect(page) {
                None => return self.load(page).await,
                Some(to) => {
                    debug!(from = page.slug(), to = to.slug(), "Redirecting");
                    page = to;
                }
            }
        }
        warn!(page = page.slug(), "Too many redirects");
        self.render_static(NOT_FOUND_HTML, FALLBACK_TITLE);
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

    async fn load(&self, target: AdminPage) -> Option<AdminPage> {
        let page = self.build(target);
        let template = match page.template() {
            Ok(html) => html,
            Err(e) => {
                error!(page = page.name(), error = %e, "Failed to render page template");
                self.render_static(LOAD_ERROR_HTML, FALLBACK_TITLE);
                return None;
            }
        };

        let view = self.outlet.begin_navigation();
        if view
            .inject(template)
            .and_then(|()| view.set_title(target.title()))
            .is_err()
        {
            return None;
        }
        self.refresh_chrome(Some(target));
        self.set_state(RouterState::Loading(target));
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActivePage {
            page: Arc::clone(&page),
            view: view.clone(),
        });

        match page.init(&view).await {
            Ok(()) => {}
            Err(AdminError::Stale) => {
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
        self.set_state(RouterState::Active(target));
        Some(target)
    }

    /// Delivers an event. Sign-out and theme toggling are handled here; the
    /// rest go to the active page. A resulting [`Effect::Navigate`] is
    /// followed.
    ///
    /// # Errors
    ///
    /// Returns the page's error other than `Stale`, which is dropped.
    pub async fn dispatch(&self, event: AdminEvent) -> Result<Option<AdminPage>> {
        match &event {
            AdminEvent::SignOut => {
                return match sign_out(&self.ctx).await {
                    Effect::Navigate(target) => Ok(self.navigate(target.slug()).await),
                    Effect::None => Ok(None),
                };
            }
            AdminEvent::ToggleTheme => {
                if let Err(e) = self.ctx.theme.toggle() {
                    warn!(error = %e, "Failed to save theme");
                }
                let current = match self.state() {
                    RouterState::Active(page) | RouterState::Loading(page) => Some(page),
                    RouterState::Idle => None,
                };
                self.refresh_chrome(current);
                return Ok(None);
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
            Ok(Effect::Navigate(target)) => Ok(self.navigate(target.slug()).await),
            Err(AdminError::Stale) => {
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
