//! Shared chrome and notifications.
//!
//! - [`Toasts`]: transient notifications, kept briefly for display
//! - [`Theme`]: light/dark preference persisted under the `theme` key
//! - Header rendering, refreshed whenever the [`Store`] changes

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use askama::Template;
use aries_mall_core::slug::normalize_slug;
use aries_mall_core::{Toast, ToastKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::outlet::Outlet;
use crate::storage::{LocalStore, StorageError, keys};
use crate::store::Store;

// =============================================================================
// Toasts
// =============================================================================

/// How many toasts are retained for [`Toasts::recent`].
const TOAST_HISTORY: usize = 20;

struct ToastsInner {
    recent: Mutex<VecDeque<Toast>>,
    pending: Mutex<Vec<Toast>>,
    tx: broadcast::Sender<Toast>,
}

/// Notification center.
#[derive(Clone)]
pub struct Toasts {
    inner: Arc<ToastsInner>,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Toasts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toasts")
            .field("recent", &self.recent().len())
            .finish()
    }
}

impl Toasts {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(ToastsInner {
                recent: Mutex::new(VecDeque::with_capacity(TOAST_HISTORY)),
                pending: Mutex::new(Vec::new()),
                tx,
            }),
        }
    }

    /// Shows a toast.
    pub fn push(&self, toast: Toast) {
        debug!(kind = toast.kind.as_str(), title = %toast.title, "Toast");
        {
            let mut recent = self
                .inner
                .recent
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if recent.len() == TOAST_HISTORY {
                recent.pop_front();
            }
            recent.push_back(toast.clone());
        }
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(toast.clone());
        let _ = self.inner.tx.send(toast);
    }

    pub fn success(&self, title: &str, description: impl Into<String>) {
        self.push(Toast::success(title).with_description(description));
    }

    pub fn error(&self, title: &str, description: impl Into<String>) {
        self.push(Toast::error(title).with_description(description));
    }

    pub fn info(&self, title: &str, description: impl Into<String>) {
        self.push(Toast::info(title).with_description(description));
    }

    /// Toasts pushed since the last drain.
    #[must_use]
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(
            &mut *self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// The most recent toasts, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<Toast> {
        self.inner
            .recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether a toast with this title and kind was shown recently.
    #[must_use]
    pub fn contains(&self, kind: ToastKind, title: &str) -> bool {
        self.recent()
            .iter()
            .any(|t| t.kind == kind && t.title == title)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.inner.tx.subscribe()
    }
}

// =============================================================================
// Theme
// =============================================================================

/// Color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// Anything other than `light` is dark.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("light") {
            Self::Light
        } else {
            Self::Dark
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// Persisted theme preference.
#[derive(Clone)]
pub struct Theme {
    local: Arc<dyn LocalStore>,
    mode: Arc<RwLock<ThemeMode>>,
}

impl std::fmt::Debug for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Theme").field(&self.mode()).finish()
    }
}

impl Theme {
    /// Reads the saved preference, defaulting to dark.
    #[must_use]
    pub fn load(local: Arc<dyn LocalStore>) -> Self {
        let mode = local
            .get(keys::THEME)
            .map(|v| ThemeMode::parse(&v))
            .unwrap_or_default();
        Self {
            local,
            mode: Arc::new(RwLock::new(mode)),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ThemeMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets and persists the preference.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if it cannot be saved; the in-memory mode still
    /// changes.
    pub fn set(&self, mode: ThemeMode) -> Result<(), StorageError> {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
        self.local.set(keys::THEME, mode.as_str())
    }

    /// Flips between light and dark, returning the new mode.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the preference cannot be saved.
    pub fn toggle(&self) -> Result<ThemeMode, StorageError> {
        let next = self.mode().toggled();
        self.set(next)?;
        Ok(next)
    }
}

// =============================================================================
// Header
// =============================================================================

/// A category entry in the header navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    pub name: String,
    pub href: String,
}

impl CategoryLink {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            href: format!("#/category/{}", normalize_slug(name)),
        }
    }
}

#[derive(Template)]
#[template(path = "partials/header.html")]
struct HeaderTemplate<'a> {
    cart_count: u64,
    wishlist_count: usize,
    user_name: Option<String>,
    categories: &'a [CategoryLink],
    theme: &'static str,
}

/// Renders the header for the store's current state.
///
/// # Errors
///
/// Returns `askama::Error` if the template fails to render.
pub fn render_header(
    store: &Store,
    categories: &[CategoryLink],
    theme: ThemeMode,
) -> Result<String, askama::Error> {
    HeaderTemplate {
        cart_count: store.cart_count(),
        wishlist_count: store.wishlist_count(),
        user_name: store.user().map(|u| u.display_name().to_owned()),
        categories,
        theme: theme.as_str(),
    }
    .render()
}

/// Re-renders the header into the outlet's chrome.
pub fn refresh_chrome(outlet: &Outlet, store: &Store, categories: &[CategoryLink], theme: &Theme) {
    match render_header(store, categories, theme.mode()) {
        Ok(html) => outlet.set_chrome(html),
        Err(e) => warn!(error = %e, "Failed to render header"),
    }
}

/// Renders the header now and again after every store change.
///
/// The returned task ends when the store is dropped.
pub fn spawn_chrome_refresh(
    outlet: Outlet,
    store: &Store,
    categories: Vec<CategoryLink>,
    theme: Theme,
) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    refresh_chrome(&outlet, store, &categories, &theme);
    let store = store.clone();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            refresh_chrome(&outlet, &store, &categories, &theme);
        }
        info!("Header refresh stopped");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use aries_mall_core::Quantity;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::product;

    #[test]
    fn test_toast_history_is_bounded() {
        let toasts = Toasts::new();
        for i in 0..25 {
            toasts.info(&format!("t{i}"), "");
        }
        let recent = toasts.recent();
        assert_eq!(recent.len(), TOAST_HISTORY);
        assert_eq!(recent[0].title, "t5");
        assert_eq!(toasts.drain().len(), 25);
        assert!(toasts.drain().is_empty());
    }

    #[test]
    fn test_theme_defaults_dark_and_persists_toggle() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let theme = Theme::load(Arc::clone(&local));
        assert_eq!(theme.mode(), ThemeMode::Dark);

        assert_eq!(theme.toggle().unwrap(), ThemeMode::Light);
        assert_eq!(local.get(keys::THEME).as_deref(), Some("light"));
        assert_eq!(Theme::load(local).mode(), ThemeMode::Light);

        assert_eq!(ThemeMode::parse("solarized"), ThemeMode::Dark);
    }

    #[test]
    fn test_category_link_slug() {
        let link = CategoryLink::new("Electric Scooters");
        assert_eq!(link.href, "#/category/electric-scooters");
    }

    #[tokio::test]
    async fn test_header_tracks_cart_badge() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let store = Store::new(None, Arc::clone(&local));
        store.initialize().await;
        let outlet = Outlet::new();
        let task = spawn_chrome_refresh(
            outlet.clone(),
            &store,
            vec![CategoryLink::new("Accessories")],
            Theme::load(local),
        );
        assert!(outlet.chrome().contains("Sign In"));

        store
            .add_to_cart(
                product("1", "Helmet", "Accessories", "Steelbird", 2_000),
                Quantity::new(3).unwrap(),
            )
            .await;

        tokio::time::timeout(Duration::from_secs(2), async {
            while !outlet.chrome().contains(r#"data-badge="cart">3<"#) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(outlet.chrome().contains("#/category/accessories"));
        task.abort();
    }
}
