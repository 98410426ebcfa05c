//! Admin panel wiring.

use std::sync::Arc;

use aries_mall_core::Session;
use aries_mall_storefront::outlet::Outlet;
use aries_mall_storefront::storage::{FileStore, LocalStore, read_json, write_json};
use aries_mall_storefront::ui::{Theme, Toasts};
use aries_mall_supabase::SupabaseClient;
use tracing::{info, warn};

use crate::backend::AdminBackend;
use crate::config::AdminConfig;
use crate::error::Result;
use crate::media::MediaHub;
use crate::pages::{AdminContext, AdminEvent, AdminPage, Confirm};
use crate::router::AdminRouter;
use crate::settings::SettingsCache;

/// Local store key of the admin session; kept apart from the shopper's.
pub const SESSION_KEY: &str = "aries-mall-admin-session";

/// Builds the backend client, restoring a session saved by a previous run.
fn connect(config: &AdminConfig, local: &dyn LocalStore) -> Option<Arc<dyn AdminBackend>> {
    let backend = config.backend.as_ref()?;
    match SupabaseClient::new(backend.url.as_str(), backend.anon_key()) {
        Ok(client) => {
            client
                .auth()
                .restore_session(read_json::<Session>(local, SESSION_KEY));
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(error = %e, "Failed to create backend client");
            None
        }
    }
}

/// A running admin panel.
pub struct AdminPanel {
    router: AdminRouter,
    local: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for AdminPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPanel")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl AdminPanel {
    /// Opens the local store under `config.data_dir` and starts the panel.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the data directory cannot be opened.
    pub fn start(config: AdminConfig, confirm: Arc<dyn Confirm>) -> Result<Self> {
        let local: Arc<dyn LocalStore> = Arc::new(FileStore::open(&config.data_dir)?);
        let backend = connect(&config, local.as_ref());
        Ok(Self::with_parts(config, backend, local, confirm))
    }

    /// Starts the panel over explicit parts.
    #[must_use]
    pub fn with_parts(
        config: AdminConfig,
        backend: Option<Arc<dyn AdminBackend>>,
        local: Arc<dyn LocalStore>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let toasts = Toasts::new();
        let media = backend.as_ref().map(|backend| {
            let settings = SettingsCache::new(Arc::clone(backend), config.settings_ttl);
            MediaHub::new(
                Arc::clone(backend),
                settings,
                toasts.clone(),
                config.endpoints.clone(),
            )
        });
        if let Some(reason) = &config.backend_error {
            warn!(reason = %reason, "Admin panel running without a backend");
        }

        let ctx = AdminContext {
            theme: Theme::load(Arc::clone(&local)),
            backend,
            config: Arc::new(config),
            toasts,
            media,
            confirm,
        };
        info!(
            has_backend = ctx.backend.is_some(),
            signed_in = ctx.is_admin(),
            "Admin panel started"
        );
        Self {
            router: AdminRouter::new(Outlet::new(), ctx),
            local,
        }
    }

    #[must_use]
    pub const fn router(&self) -> &AdminRouter {
        &self.router
    }

    #[must_use]
    pub const fn outlet(&self) -> &Outlet {
        self.router.outlet()
    }

    #[must_use]
    pub const fn context(&self) -> &AdminContext {
        self.router.context()
    }

    #[must_use]
    pub const fn toasts(&self) -> &Toasts {
        &self.router.context().toasts
    }

    /// Writes the current session to the local store, or removes it.
    fn persist_session(&self) {
        let session = self
            .router
            .context()
            .backend
            .as_ref()
            .and_then(|backend| backend.session());
        let saved = match session {
            Some(session) => write_json(self.local.as_ref(), SESSION_KEY, &session),
            None => self.local.remove(SESSION_KEY),
        };
        if let Err(e) = saved {
            warn!(error = %e, "Failed to persist admin session");
        }
    }

    /// Navigates to a fragment such as `#/media-hub`.
    pub async fn open(&self, fragment: &str) -> Option<AdminPage> {
        let page = self.router.navigate(fragment).await;
        self.persist_session();
        page
    }

    /// Delivers an event to the router.
    ///
    /// # Errors
    ///
    /// Returns the page's error; `Stale` is never returned.
    pub async fn send(&self, event: AdminEvent) -> Result<Option<AdminPage>> {
        let outcome = self.router.dispatch(event).await;
        self.persist_session();
        outcome
    }

    /// Cleans up the active page.
    pub fn shutdown(self) {
        self.router.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aries_mall_core::ToastKind;
    use aries_mall_storefront::storage::MemoryStore;

    use super::*;
    use crate::pages::AutoConfirm;
    use crate::testing::FakeAdmin;

    #[tokio::test]
    async fn test_without_backend_login_reports_system_error() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let panel = AdminPanel::with_parts(
            AdminConfig::default(),
            None,
            local,
            Arc::new(AutoConfirm(true)),
        );
        assert_eq!(panel.open("#/dashboard").await, Some(AdminPage::Login));
        panel
            .send(AdminEvent::SubmitLogin {
                email: "admin@ariesmall.com".into(),
                password: "x".into(),
            })
            .await
            .unwrap();
        assert!(panel.toasts().contains(ToastKind::Error, "Login Failed"));
        assert!(
            panel
                .outlet()
                .region("error")
                .unwrap()
                .contains("System error: Database client not configured.")
        );
    }

    #[tokio::test]
    async fn test_session_persisted_and_cleared() {
        let fake = Arc::new(FakeAdmin::new().with_account("admin@ariesmall.com", "pw"));
        let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let backend: Arc<dyn AdminBackend> = fake.clone();
        let panel = AdminPanel::with_parts(
            AdminConfig::default(),
            Some(backend),
            Arc::clone(&local),
            Arc::new(AutoConfirm(true)),
        );
        panel.open("#/admin-login").await;
        panel
            .send(AdminEvent::SubmitLogin {
                email: "admin@ariesmall.com".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
        let saved: Option<Session> = read_json(local.as_ref(), SESSION_KEY);
        assert_eq!(
            saved.unwrap().user.email.as_deref(),
            Some("admin@ariesmall.com")
        );

        panel.send(AdminEvent::SignOut).await.unwrap();
        assert!(local.get(SESSION_KEY).is_none());
        panel.shutdown();
    }
}
