//! Application wiring.
//!
//! [`Storefront`] owns the long-lived pieces: the local store, the backend
//! client, the [`Store`], the header refresh task and the [`Router`].

use std::sync::Arc;

use aries_mall_core::Session;
use aries_mall_supabase::SupabaseClient;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::Catalog;
use crate::backend::ShopBackend;
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::outlet::Outlet;
use crate::pages::{PageContext, UiEvent};
use crate::router::{Route, Router};
use crate::storage::{FileStore, LocalStore, keys, read_json, write_json};
use crate::store::{Store, StoreEvent};
use crate::ui::{CategoryLink, Theme, Toasts, spawn_chrome_refresh};

/// A running storefront.
pub struct Storefront {
    router: Router,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

/// Builds the backend client, restoring a session saved by a previous run.
fn connect(config: &StorefrontConfig, local: &dyn LocalStore) -> Option<Arc<dyn ShopBackend>> {
    let backend = config.backend.as_ref()?;
    match SupabaseClient::new(backend.url.as_str(), backend.anon_key()) {
        Ok(client) => {
            client
                .auth()
                .restore_session(read_json::<Session>(local, keys::SESSION));
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(error = %e, "Failed to create backend client; running in guest-only mode");
            None
        }
    }
}

/// Mirrors the store's session into local storage.
fn spawn_session_persistence(store: &Store) -> JoinHandle<()> {
    let mut events = store.events();
    let store = store.clone();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StoreEvent::SessionChanged { .. }) => {
                    let local = store.local();
                    let saved = match store.session() {
                        Some(session) => write_json(local.as_ref(), keys::SESSION, &session),
                        None => local.remove(keys::SESSION),
                    };
                    if let Err(e) = saved {
                        warn!(error = %e, "Failed to persist session");
                    }
                }
                Ok(StoreEvent::SyncFailed { .. }) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Session events lagged"),
                Err(RecvError::Closed) => return,
            }
        }
    })
}

impl Storefront {
    /// Opens the local store under `config.data_dir` and starts the shop.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the data directory cannot be opened.
    pub async fn start(config: StorefrontConfig) -> Result<Self> {
        let local: Arc<dyn LocalStore> = Arc::new(FileStore::open(&config.data_dir)?);
        let backend = connect(&config, local.as_ref());
        Ok(Self::with_parts(&config, backend, local).await)
    }

    /// Starts the shop over explicit parts.
    pub async fn with_parts(
        config: &StorefrontConfig,
        backend: Option<Arc<dyn ShopBackend>>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        let toasts = Toasts::new();
        let theme = Theme::load(Arc::clone(&local));
        let store = Store::new(backend.clone(), Arc::clone(&local));
        let catalog = Catalog::new(backend.clone());

        let persistence = spawn_session_persistence(&store);
        store.initialize().await;

        if backend.is_none() {
            toasts.info(
                "Connection Issue",
                "Authentication services are unavailable. Using guest mode.",
            );
        }

        let categories: Vec<CategoryLink> = catalog
            .categories()
            .await
            .iter()
            .map(|c| CategoryLink::new(c))
            .collect();

        let outlet = Outlet::new();
        let chrome = spawn_chrome_refresh(
            outlet.clone(),
            &store,
            categories.clone(),
            theme.clone(),
        );
        let ctx = PageContext {
            store,
            catalog,
            toasts,
            theme,
            slide_interval: config.slide_interval,
            filter_debounce: config.filter_debounce,
        };
        info!(
            guest_only = backend.is_none(),
            signed_in = ctx.store.is_authenticated(),
            "Storefront started"
        );
        Self {
            router: Router::new(outlet, ctx, categories),
            tasks: vec![persistence, chrome],
        }
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub const fn outlet(&self) -> &Outlet {
        self.router.outlet()
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.router.context().store
    }

    #[must_use]
    pub const fn toasts(&self) -> &Toasts {
        &self.router.context().toasts
    }

    /// Navigates to a fragment such as `#/cart`.
    pub async fn open(&self, fragment: &str) -> Option<Route> {
        self.router.navigate(fragment).await
    }

    /// Delivers a UI event to the router.
    ///
    /// # Errors
    ///
    /// Returns the page's error; `Stale` is never returned.
    pub async fn send(&self, event: UiEvent) -> Result<Option<Route>> {
        self.router.dispatch(event).await
    }

    /// Stops background tasks and cleans up the active page.
    pub fn shutdown(self) {
        self.router.shutdown();
        for task in self.tasks {
            task.abort();
        }
    }
}
