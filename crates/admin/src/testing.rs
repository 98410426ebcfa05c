//! In-memory [`AdminBackend`] for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use aries_mall_core::{
    AccessToken, MediaEntryId, MediaHistoryEntry, NewMediaHistoryEntry, Price, Product,
    ProductDraft, ProductId, Session, SlideDraft, SlideId, SlideRow, User, UserId, UserMetadata,
};
use aries_mall_storefront::storage::MemoryStore;
use aries_mall_storefront::ui::{Theme, Toasts};
use aries_mall_supabase::SupabaseError;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::backend::{AdminBackend, ConfigRow};
use crate::config::{AdminConfig, Endpoints};
use crate::media::MediaHub;
use crate::pages::{AdminContext, AutoConfirm};
use crate::settings::SettingsCache;

/// Page context over `fake` with default config, confirming every prompt.
/// Media endpoints are the defaults; upload tests build their own hub.
#[must_use]
pub fn test_context(fake: &Arc<FakeAdmin>) -> AdminContext {
    let backend: Arc<dyn AdminBackend> = fake.clone();
    let toasts = Toasts::new();
    let config = AdminConfig::default();
    let settings = SettingsCache::new(backend.clone(), config.settings_ttl);
    let media = MediaHub::new(
        backend.clone(),
        settings,
        toasts.clone(),
        Endpoints::default(),
    );
    AdminContext {
        backend: Some(backend),
        config: Arc::new(config),
        toasts,
        theme: Theme::load(Arc::new(MemoryStore::new())),
        media: Some(media),
        confirm: Arc::new(AutoConfirm(true)),
    }
}

/// Builds a catalog row; `age` orders rows (higher is newer).
#[must_use]
pub fn product(id: &str, name: &str, category: &str, price: u32, age: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        brand: String::new(),
        category: category.to_owned(),
        price: Price::new(Decimal::from(price)),
        rating: 0.0,
        description: String::new(),
        images: Vec::new(),
        features: Vec::new(),
        warranty: None,
        created_at: Utc.timestamp_opt(1_600_000_000 + age, 0).single(),
    }
}

/// Builds a slide row.
#[must_use]
pub fn slide(id: &str, title: Option<&str>, is_active: bool, age: i64) -> SlideRow {
    SlideRow {
        id: SlideId::new(id),
        title: title.map(str::to_owned),
        description: None,
        button_text: None,
        button_link: None,
        image_url_desktop: None,
        image_url_mobile: None,
        thumbnail_url: None,
        show_overlay: false,
        fit_desktop: aries_mall_core::ImageFit::Cover,
        fit_mobile: aries_mall_core::ImageFit::Cover,
        is_active,
        created_at: Utc.timestamp_opt(1_600_000_000 + age, 0).single(),
    }
}

struct Account {
    email: String,
    password: String,
    confirmed: bool,
    user: User,
}

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    slides: Vec<SlideRow>,
    config: Vec<ConfigRow>,
    history: Vec<MediaHistoryEntry>,
    accounts: Vec<Account>,
    calls: Vec<String>,
}

/// Fake backend holding every admin table in memory.
pub struct FakeAdmin {
    tables: Mutex<Tables>,
    session: Mutex<Option<Session>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl Default for FakeAdmin {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAdmin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            session: Mutex::new(None),
            next_id: AtomicU64::new(1000),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: impl Into<String>) {
        self.tables().calls.push(call.into());
    }

    fn timestamp(&self) -> chrono::DateTime<Utc> {
        let tick = i64::try_from(self.next_id.fetch_add(1, Ordering::SeqCst)).unwrap_or(0);
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default() + Duration::seconds(tick)
    }

    #[must_use]
    pub fn with_products(self, products: impl IntoIterator<Item = Product>) -> Self {
        self.tables().products.extend(products);
        self
    }

    #[must_use]
    pub fn with_slides(self, slides: impl IntoIterator<Item = SlideRow>) -> Self {
        self.tables().slides.extend(slides);
        self
    }

    /// Adds a `system_config` row.
    #[must_use]
    pub fn with_config(self, key: &str, value: &str) -> Self {
        self.tables().config.push(ConfigRow {
            key: key.to_owned(),
            value: Some(value.to_owned()),
        });
        self
    }

    /// Registers an account that `sign_in` accepts.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.push_account(email, password, true);
        self
    }

    /// Registers an account whose email was never confirmed.
    #[must_use]
    pub fn with_unconfirmed_account(self, email: &str, password: &str) -> Self {
        self.push_account(email, password, false);
        self
    }

    fn push_account(&self, email: &str, password: &str, confirmed: bool) {
        let id = format!("user-{}", self.tables().accounts.len() + 1);
        self.tables().accounts.push(Account {
            email: email.to_owned(),
            password: password.to_owned(),
            confirmed,
            user: User {
                id: UserId::new(id),
                email: Some(email.to_owned()),
                user_metadata: UserMetadata::default(),
                created_at: None,
            },
        });
    }

    /// Puts a session in place without going through `sign_in`.
    pub fn login_as(&self, email: &str) -> Session {
        let session = Session {
            access_token: AccessToken::new(format!("token-{email}")),
            refresh_token: None,
            expires_at: None,
            user: User {
                id: UserId::new(format!("user-{email}")),
                email: Some(email.to_owned()),
                user_metadata: UserMetadata::default(),
                created_at: None,
            },
        };
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        session
    }

    /// Adds a history row directly.
    pub fn seed_history(&self, name: &str, url: &str, kind: aries_mall_core::MediaKind) {
        let created_at = self.timestamp();
        self.tables().history.push(MediaHistoryEntry {
            id: MediaEntryId::new(uuid::Uuid::new_v4().to_string()),
            file_name: name.to_owned(),
            file_url: url.to_owned(),
            media_type: kind,
            admin_email: None,
            created_at: Some(created_at),
        });
    }

    /// Makes every table write fail with a 500.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every table read fail with a 500.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn stored_products(&self) -> Vec<Product> {
        self.tables().products.clone()
    }

    #[must_use]
    pub fn stored_slides(&self) -> Vec<SlideRow> {
        self.tables().slides.clone()
    }

    #[must_use]
    pub fn stored_history(&self) -> Vec<MediaHistoryEntry> {
        self.tables().history.clone()
    }

    /// How many times `name` was called.
    #[must_use]
    pub fn call_count(&self, name: &str) -> usize {
        self.tables().calls.iter().filter(|c| *c == name).count()
    }

    fn check_write(&self) -> Result<(), SupabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SupabaseError::Api {
                status: 500,
                message: "write rejected".to_owned(),
            });
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), SupabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SupabaseError::Api {
                status: 500,
                message: "read rejected".to_owned(),
            });
        }
        Ok(())
    }

    fn new_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

fn newest_first<T>(rows: &mut [T], created: impl Fn(&T) -> Option<chrono::DateTime<Utc>>) {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
}

#[async_trait]
impl AdminBackend for FakeAdmin {
    fn session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SupabaseError> {
        self.record("sign_in");
        let found = self
            .tables()
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| (a.confirmed, a.user.clone()));
        match found {
            None => Err(SupabaseError::Auth("Invalid login credentials".to_owned())),
            Some((false, _)) => Err(SupabaseError::Auth("Email not confirmed".to_owned())),
            Some((true, user)) => {
                let session = Session {
                    access_token: AccessToken::new(format!("token-{}", user.id)),
                    refresh_token: None,
                    expires_at: None,
                    user,
                };
                *self.session.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(session.clone());
                Ok(session)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), SupabaseError> {
        self.record("sign_out");
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    async fn products(&self) -> Result<Vec<Product>, SupabaseError> {
        self.record("products");
        self.check_read()?;
        let mut products = self.tables().products.clone();
        newest_first(&mut products, |p| p.created_at);
        Ok(products)
    }

    async fn insert_product(&self, draft: &ProductDraft) -> Result<(), SupabaseError> {
        self.record("insert_product");
        self.check_write()?;
        let product = Product {
            id: ProductId::new(self.new_id()),
            name: draft.name.clone(),
            brand: draft.brand.clone(),
            category: draft.category.clone(),
            price: draft.price,
            rating: 0.0,
            description: draft.description.clone(),
            images: draft.images.clone(),
            features: draft.features.clone(),
            warranty: draft.warranty.clone(),
            created_at: Some(self.timestamp()),
        };
        self.tables().products.push(product);
        Ok(())
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), SupabaseError> {
        self.record("update_product");
        self.check_write()?;
        if let Some(product) = self.tables().products.iter_mut().find(|p| &p.id == id) {
            product.name.clone_from(&draft.name);
            product.brand.clone_from(&draft.brand);
            product.category.clone_from(&draft.category);
            product.price = draft.price;
            product.description.clone_from(&draft.description);
            product.images.clone_from(&draft.images);
            product.features.clone_from(&draft.features);
            product.warranty.clone_from(&draft.warranty);
        }
        Ok(())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), SupabaseError> {
        self.record("delete_product");
        self.check_write()?;
        self.tables().products.retain(|p| &p.id != id);
        Ok(())
    }

    async fn slides(&self) -> Result<Vec<SlideRow>, SupabaseError> {
        self.record("slides");
        self.check_read()?;
        let mut slides = self.tables().slides.clone();
        newest_first(&mut slides, |s| s.created_at);
        Ok(slides)
    }

    async fn insert_slide(&self, draft: &SlideDraft) -> Result<(), SupabaseError> {
        self.record("insert_slide");
        self.check_write()?;
        let row = SlideRow {
            id: SlideId::new(self.new_id()),
            title: draft.title.clone(),
            description: draft.description.clone(),
            button_text: draft.button_text.clone(),
            button_link: draft.button_link.clone(),
            image_url_desktop: draft.image_url_desktop.clone(),
            image_url_mobile: draft.image_url_mobile.clone(),
            thumbnail_url: draft.thumbnail_url.clone(),
            show_overlay: draft.show_overlay,
            fit_desktop: draft.fit_desktop,
            fit_mobile: draft.fit_mobile,
            is_active: draft.is_active,
            created_at: Some(self.timestamp()),
        };
        self.tables().slides.push(row);
        Ok(())
    }

    async fn update_slide(&self, id: &SlideId, draft: &SlideDraft) -> Result<(), SupabaseError> {
        self.record("update_slide");
        self.check_write()?;
        if let Some(row) = self.tables().slides.iter_mut().find(|s| &s.id == id) {
            row.title.clone_from(&draft.title);
            row.description.clone_from(&draft.description);
            row.button_text.clone_from(&draft.button_text);
            row.button_link.clone_from(&draft.button_link);
            row.image_url_desktop.clone_from(&draft.image_url_desktop);
            row.image_url_mobile.clone_from(&draft.image_url_mobile);
            row.thumbnail_url.clone_from(&draft.thumbnail_url);
            row.show_overlay = draft.show_overlay;
            row.fit_desktop = draft.fit_desktop;
            row.fit_mobile = draft.fit_mobile;
            row.is_active = draft.is_active;
        }
        Ok(())
    }

    async fn delete_slide(&self, id: &SlideId) -> Result<(), SupabaseError> {
        self.record("delete_slide");
        self.check_write()?;
        self.tables().slides.retain(|s| &s.id != id);
        Ok(())
    }

    async fn system_config(&self) -> Result<Vec<ConfigRow>, SupabaseError> {
        self.record("system_config");
        self.check_read()?;
        Ok(self.tables().config.clone())
    }

    async fn insert_media_history(
        &self,
        entry: &NewMediaHistoryEntry,
    ) -> Result<(), SupabaseError> {
        self.record("insert_media_history");
        self.check_write()?;
        let created_at = self.timestamp();
        self.tables().history.push(MediaHistoryEntry {
            id: MediaEntryId::new(uuid::Uuid::new_v4().to_string()),
            file_name: entry.file_name.clone(),
            file_url: entry.file_url.clone(),
            media_type: entry.media_type,
            admin_email: Some(entry.admin_email.clone()),
            created_at: Some(created_at),
        });
        Ok(())
    }

    async fn media_history(&self, limit: usize) -> Result<Vec<MediaHistoryEntry>, SupabaseError> {
        self.record("media_history");
        self.check_read()?;
        let mut history = self.tables().history.clone();
        newest_first(&mut history, |h| h.created_at);
        history.truncate(limit);
        Ok(history)
    }

    async fn clear_media_history(&self) -> Result<(), SupabaseError> {
        self.record("clear_media_history");
        self.check_write()?;
        self.tables().history.clear();
        Ok(())
    }
}
