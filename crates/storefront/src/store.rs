//! Session, cart and wishlist state.
//!
//! [`Store`] is the single owner of shopper state. Guests persist to the
//! [`LocalStore`]; signed-in users persist to the backend's `cart_items` and
//! `wishlist_items` tables. A login discards the guest snapshots and loads the
//! remote rows; a logout reloads whatever the local snapshots hold, with no
//! merge of the vacated remote cart.
//!
//! Mutations update memory first. The write that follows may fail; the
//! failure is logged, published as [`StoreEvent::SyncFailed`] and reported
//! through the returned [`SyncStatus`], but memory is never rolled back.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use aries_mall_core::{
    Cart, LineItem, Product, ProductId, Quantity, QuantityChange, Session, User, UserId, Wishlist,
};
use aries_mall_supabase::SupabaseError;
use futures::future::join_all;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::{CartRow, ShopBackend, WishlistRow};
use crate::storage::{self, LocalStore, keys};

/// Where a mutation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing changed.
    Unchanged,
    /// Saved to local storage (guest).
    Local,
    /// Saved to the backend.
    Remote,
    /// Applied in memory but not persisted.
    Failed,
}

/// Result of [`Store::toggle_wishlist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WishlistToggle {
    /// Whether the product is in the wishlist now.
    pub in_wishlist: bool,
    pub sync: SyncStatus,
}

/// Out-of-band notifications for listeners that care about failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A session transition finished.
    SessionChanged { user: Option<UserId> },
    /// A read or write against persistence failed.
    SyncFailed {
        operation: &'static str,
        message: String,
    },
}

#[derive(Debug, Default)]
struct StoreState {
    loaded: bool,
    session: Option<Session>,
    cart: Cart,
    wishlist: Wishlist,
}

impl StoreState {
    fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(|s| s.user.id.clone())
    }
}

struct StoreInner {
    backend: Option<Arc<dyn ShopBackend>>,
    local: Arc<dyn LocalStore>,
    state: RwLock<StoreState>,
    revision: watch::Sender<u64>,
    events: broadcast::Sender<StoreEvent>,
    transitions: tokio::sync::Mutex<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// A persistence step queued by a mutation.
enum Write {
    Local(&'static str),
    Remote(RemoteWrite),
}

enum RemoteWrite {
    UpsertCart(CartRow),
    UpdateQuantity {
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    },
    DeleteCart {
        user: UserId,
        product: ProductId,
    },
    InsertWishlist(WishlistRow),
    DeleteWishlist {
        user: UserId,
        product: ProductId,
    },
}

impl RemoteWrite {
    const fn operation(&self) -> &'static str {
        match self {
            Self::UpsertCart(_) => "add to cart",
            Self::UpdateQuantity { .. } => "update cart quantity",
            Self::DeleteCart { .. } => "remove from cart",
            Self::InsertWishlist(_) => "add to wishlist",
            Self::DeleteWishlist { .. } => "remove from wishlist",
        }
    }

    async fn apply(&self, backend: &dyn ShopBackend) -> Result<(), SupabaseError> {
        match self {
            Self::UpsertCart(row) => backend.upsert_cart_row(row).await,
            Self::UpdateQuantity {
                user,
                product,
                quantity,
            } => backend.update_cart_quantity(user, product, *quantity).await,
            Self::DeleteCart { user, product } => backend.delete_cart_row(user, product).await,
            Self::InsertWishlist(row) => backend.insert_wishlist_row(row).await,
            Self::DeleteWishlist { user, product } => {
                backend.delete_wishlist_row(user, product).await
            }
        }
    }
}

/// Shopper state handle. Clones share the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Store")
            .field("has_backend", &self.inner.backend.is_some())
            .field("user", &state.user_id())
            .field("cart_lines", &state.cart.len())
            .field("wishlist", &state.wishlist.len())
            .finish()
    }
}

impl Store {
    /// Creates an empty, uninitialized store.
    #[must_use]
    pub fn new(backend: Option<Arc<dyn ShopBackend>>, local: Arc<dyn LocalStore>) -> Self {
        let (revision, _) = watch::channel(0);
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(StoreInner {
                backend,
                local,
                state: RwLock::new(StoreState::default()),
                revision,
                events,
                transitions: tokio::sync::Mutex::new(()),
                listener: Mutex::new(None),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn report(&self, operation: &'static str, message: String) {
        warn!(operation, error = %message, "Store sync failed");
        // No receivers is fine.
        let _ = self.inner.events.send(StoreEvent::SyncFailed { operation, message });
    }

    /// The backend, when one is configured.
    #[must_use]
    pub fn backend(&self) -> Option<Arc<dyn ShopBackend>> {
        self.inner.backend.clone()
    }

    /// The local store.
    #[must_use]
    pub fn local(&self) -> Arc<dyn LocalStore> {
        Arc::clone(&self.inner.local)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Loads the initial state and starts following backend session changes.
    ///
    /// Returns once the signed-in or guest state is in place.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        let session = match &self.inner.backend {
            Some(backend) => {
                // Subscribe before asking so a login in between is not missed.
                self.spawn_listener(backend.session_changes());
                backend.current_session().await.unwrap_or_else(|e| {
                    warn!(error = %e, "Could not read backend session; continuing as guest");
                    None
                })
            }
            None => None,
        };
        self.transition(session).await;
    }

    fn spawn_listener(&self, mut changes: watch::Receiver<Option<Session>>) {
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let session = changes.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Store { inner }.on_session_change(session).await;
            }
            debug!("Session listener stopped");
        });
        let previous = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Applies a login/logout. Ignored when the user id is unchanged.
    pub async fn on_session_change(&self, session: Option<Session>) {
        self.transition(session).await;
    }

    async fn transition(&self, session: Option<Session>) {
        let _serial = self.inner.transitions.lock().await;
        let next_user = session.as_ref().map(|s| s.user.id.clone());
        {
            let mut state = self.write();
            if state.loaded && state.user_id() == next_user {
                // Same user, possibly a refreshed token.
                if session.is_some() {
                    state.session = session;
                }
                return;
            }
        }

        let (cart, wishlist) = match &session {
            Some(session) => {
                self.discard_guest_data();
                self.fetch_remote(&session.user.id).await
            }
            None => self.load_local(),
        };

        {
            let mut state = self.write();
            state.loaded = true;
            state.session = session;
            state.cart = cart;
            state.wishlist = wishlist;
        }
        info!(user = ?next_user, "Store state switched");
        self.notify();
        let _ = self
            .inner
            .events
            .send(StoreEvent::SessionChanged { user: next_user });
    }

    fn discard_guest_data(&self) {
        for key in [keys::CART, keys::WISHLIST] {
            if let Err(e) = self.inner.local.remove(key) {
                self.report("discard guest data", e.to_string());
            }
        }
    }

    fn load_local(&self) -> (Cart, Wishlist) {
        let local = self.inner.local.as_ref();
        let cart = storage::read_snapshot::<Vec<LineItem>>(local, keys::CART)
            .map(Cart::from_items)
            .unwrap_or_default();
        let wishlist = storage::read_snapshot::<Vec<ProductId>>(local, keys::WISHLIST)
            .map(Wishlist::from_ids)
            .unwrap_or_default();
        (cart, wishlist)
    }

    async fn fetch_remote(&self, user: &UserId) -> (Cart, Wishlist) {
        let Some(backend) = self.inner.backend.as_deref() else {
            return (Cart::new(), Wishlist::new());
        };

        let (cart_rows, wishlist_rows) =
            tokio::join!(backend.cart_rows(user), backend.wishlist_rows(user));

        let cart_rows = cart_rows.unwrap_or_else(|e| {
            self.report("load cart", e.to_string());
            Vec::new()
        });
        let wishlist = wishlist_rows.map_or_else(
            |e| {
                self.report("load wishlist", e.to_string());
                Wishlist::new()
            },
            Wishlist::from_ids,
        );

        let lookups = join_all(cart_rows.iter().map(|row| backend.product(&row.product_id))).await;
        let items = cart_rows
            .into_iter()
            .zip(lookups)
            .filter_map(|(row, found)| match found {
                Ok(Some(product)) => Some(LineItem {
                    product,
                    quantity: row.quantity,
                }),
                Ok(None) => {
                    debug!(product_id = %row.product_id, "Dropping cart row for missing product");
                    None
                }
                Err(e) => {
                    debug!(product_id = %row.product_id, error = %e, "Dropping unresolvable cart row");
                    None
                }
            });

        (Cart::from_items(items), wishlist)
    }

    /// Signs out through the backend and switches to the guest state.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local transition happens regardless.
    pub async fn sign_out(&self) -> Result<(), SupabaseError> {
        let result = match &self.inner.backend {
            Some(backend) => backend.sign_out().await,
            None => Ok(()),
        };
        self.transition(None).await;
        result
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds units of a product, merging with an existing line.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: Product, quantity: Quantity) -> SyncStatus {
        let write = {
            let mut state = self.write();
            let product_id = product.id.clone();
            let total = state.cart.add(product, quantity);
            match state.user_id() {
                Some(user_id) => Write::Remote(RemoteWrite::UpsertCart(CartRow {
                    user_id,
                    product_id,
                    quantity: total,
                })),
                None => Write::Local(keys::CART),
            }
        };
        self.notify();
        self.persist(write).await
    }

    /// Sets a line's quantity; zero or less removes it. Unknown ids are ignored.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: i64) -> SyncStatus {
        let write = {
            let mut state = self.write();
            let change = state.cart.set_quantity(product_id, quantity);
            match (change, state.user_id()) {
                (QuantityChange::Unknown, _) => return SyncStatus::Unchanged,
                (_, None) => Write::Local(keys::CART),
                (QuantityChange::Updated(quantity), Some(user)) => {
                    Write::Remote(RemoteWrite::UpdateQuantity {
                        user,
                        product: product_id.clone(),
                        quantity,
                    })
                }
                (QuantityChange::Removed, Some(user)) => Write::Remote(RemoteWrite::DeleteCart {
                    user,
                    product: product_id.clone(),
                }),
            }
        };
        self.notify();
        self.persist(write).await
    }

    /// Removes a line entirely.
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> SyncStatus {
        self.set_quantity(product_id, 0).await
    }

    /// Adds the product to the wishlist if absent, removes it if present.
    #[instrument(skip(self))]
    pub async fn toggle_wishlist(&self, product_id: &ProductId) -> WishlistToggle {
        let (in_wishlist, write) = {
            let mut state = self.write();
            let added = state.wishlist.toggle(product_id);
            let write = match state.user_id() {
                None => Write::Local(keys::WISHLIST),
                Some(user_id) if added => Write::Remote(RemoteWrite::InsertWishlist(WishlistRow {
                    user_id,
                    product_id: product_id.clone(),
                })),
                Some(user) => Write::Remote(RemoteWrite::DeleteWishlist {
                    user,
                    product: product_id.clone(),
                }),
            };
            (added, write)
        };
        self.notify();
        let sync = self.persist(write).await;
        WishlistToggle { in_wishlist, sync }
    }

    async fn persist(&self, write: Write) -> SyncStatus {
        match write {
            Write::Local(key) => {
                let result = {
                    let state = self.read();
                    let local = self.inner.local.as_ref();
                    if key == keys::CART {
                        storage::write_snapshot(local, key, &state.cart.items())
                    } else {
                        storage::write_snapshot(local, key, &state.wishlist.ids())
                    }
                };
                match result {
                    Ok(()) => SyncStatus::Local,
                    Err(e) => {
                        self.report("save local snapshot", e.to_string());
                        SyncStatus::Failed
                    }
                }
            }
            Write::Remote(remote) => {
                let Some(backend) = self.inner.backend.as_deref() else {
                    self.report(remote.operation(), "backend unavailable".to_owned());
                    return SyncStatus::Failed;
                };
                match remote.apply(backend).await {
                    Ok(()) => SyncStatus::Remote,
                    Err(e) => {
                        self.report(remote.operation(), e.to_string());
                        SyncStatus::Failed
                    }
                }
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Sum of all cart quantities.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.read().cart.total_quantity()
    }

    #[must_use]
    pub fn wishlist_count(&self) -> usize {
        self.read().wishlist.len()
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.read().wishlist.contains(product_id)
    }

    #[must_use]
    pub fn cart(&self) -> Cart {
        self.read().cart.clone()
    }

    #[must_use]
    pub fn cart_items(&self) -> Vec<LineItem> {
        self.read().cart.items().to_vec()
    }

    #[must_use]
    pub fn wishlist_ids(&self) -> Vec<ProductId> {
        self.read().wishlist.ids().to_vec()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.read().session.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.read().session.as_ref().map(|s| s.user.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().session.is_some()
    }

    /// Receiver whose value is bumped after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Receiver of session transitions and sync failures.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::{FakeShop, product};

    fn catalog() -> Vec<Product> {
        vec![
            product("1", "Chetak", "Electric Scooters", "Bajaj", 100_000),
            product("2", "Helmet", "Accessories", "Steelbird", 2_000),
            product("3", "Gloves", "Accessories", "Rynox", 1_500),
        ]
    }

    fn guest_store() -> Store {
        Store::new(None, Arc::new(MemoryStore::new()))
    }

    async fn wait_for_user(store: &Store, expected: Option<&str>) {
        let mut rx = store.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let current = store.user().map(|u| u.id.to_string());
                if current.as_deref() == expected {
                    return;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cart_count_tracks_quantities() {
        let store = guest_store();
        store.initialize().await;
        let [a, b, _] = <[Product; 3]>::try_from(catalog()).unwrap();

        store.add_to_cart(a.clone(), Quantity::new(2).unwrap()).await;
        store.add_to_cart(b.clone(), Quantity::ONE).await;
        store.add_to_cart(a.clone(), Quantity::new(3).unwrap()).await;
        assert_eq!(store.cart_count(), 6);

        store.set_quantity(&a.id, 1).await;
        assert_eq!(store.cart_count(), 2);
        store.set_quantity(&b.id, -4).await;
        assert_eq!(store.cart_count(), 1);
        assert_eq!(
            store.set_quantity(&ProductId::new("missing"), 3).await,
            SyncStatus::Unchanged
        );

        let sum: u64 = store
            .cart_items()
            .iter()
            .map(|i| u64::from(i.quantity.get()))
            .sum();
        assert_eq!(store.cart_count(), sum);
        assert!(store.cart_items().iter().all(|i| i.quantity.get() > 0));
    }

    #[tokio::test]
    async fn test_guest_state_persists_locally() {
        let local = Arc::new(MemoryStore::new());
        let store = Store::new(None, local.clone());
        store.initialize().await;
        let helmet = catalog().remove(1);

        assert_eq!(
            store.add_to_cart(helmet.clone(), Quantity::ONE).await,
            SyncStatus::Local
        );
        let toggle = store.toggle_wishlist(&helmet.id).await;
        assert!(toggle.in_wishlist);

        let reloaded = Store::new(None, local);
        reloaded.initialize().await;
        assert_eq!(reloaded.cart_count(), 1);
        assert!(reloaded.is_in_wishlist(&helmet.id));
    }

    #[tokio::test]
    async fn test_wishlist_double_toggle_restores_state() {
        let store = guest_store();
        store.initialize().await;
        let id = ProductId::new("2");
        let before = store.wishlist_ids();
        assert!(store.toggle_wishlist(&id).await.in_wishlist);
        assert!(!store.toggle_wishlist(&id).await.in_wishlist);
        assert_eq!(store.wishlist_ids(), before);
    }

    #[tokio::test]
    async fn test_login_discards_guest_data_and_logout_does_not_merge() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        shop.seed_cart("u1", "1", 2);
        shop.seed_wishlist("u1", "3");
        let local = Arc::new(MemoryStore::new());
        let store = Store::new(Some(shop.clone()), local.clone());
        store.initialize().await;

        let gloves = catalog().remove(2);
        store.add_to_cart(gloves, Quantity::new(4).unwrap()).await;
        assert!(local.get(keys::CART).is_some());

        let session = shop.login_as("u1", "asha@example.com", "Asha Rao");
        store.on_session_change(Some(session)).await;

        assert!(local.get(keys::CART).is_none());
        assert!(local.get(keys::WISHLIST).is_none());
        assert_eq!(store.cart_count(), 2);
        assert_eq!(store.wishlist_ids(), vec![ProductId::new("3")]);

        shop.logout();
        store.on_session_change(None).await;
        assert!(!store.is_authenticated());
        assert_eq!(store.cart_count(), 0);
        assert!(store.wishlist_ids().is_empty());
        assert_eq!(shop.cart_of("u1"), vec![("1".to_owned(), 2)]);
    }

    #[tokio::test]
    async fn test_hydration_drops_missing_products() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        shop.seed_cart("u1", "1", 1);
        shop.seed_cart("u1", "gone", 5);
        shop.login_as("u1", "asha@example.com", "Asha Rao");

        let store = Store::new(Some(shop.clone()), Arc::new(MemoryStore::new()));
        store.initialize().await;

        assert_eq!(store.cart_count(), 1);
        assert_eq!(store.cart_items()[0].product.name, "Chetak");
    }

    #[tokio::test]
    async fn test_same_user_change_is_ignored() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        let session = shop.login_as("u1", "asha@example.com", "Asha Rao");
        let store = Store::new(Some(shop.clone()), Arc::new(MemoryStore::new()));
        store.initialize().await;
        let fetches = shop.call_count("cart_rows");

        store.on_session_change(Some(session)).await;
        assert_eq!(shop.call_count("cart_rows"), fetches);
    }

    #[tokio::test]
    async fn test_authenticated_mutations_write_rows() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        shop.login_as("u1", "asha@example.com", "Asha Rao");
        let store = Store::new(Some(shop.clone()), Arc::new(MemoryStore::new()));
        store.initialize().await;
        let chetak = catalog().remove(0);

        assert_eq!(
            store.add_to_cart(chetak.clone(), Quantity::ONE).await,
            SyncStatus::Remote
        );
        store.add_to_cart(chetak.clone(), Quantity::ONE).await;
        assert_eq!(shop.cart_of("u1"), vec![("1".to_owned(), 2)]);

        store.set_quantity(&chetak.id, 5).await;
        assert_eq!(shop.cart_of("u1"), vec![("1".to_owned(), 5)]);

        store.remove_from_cart(&chetak.id).await;
        assert!(shop.cart_of("u1").is_empty());

        store.toggle_wishlist(&chetak.id).await;
        assert_eq!(shop.wishlist_of("u1"), vec!["1"]);
        store.toggle_wishlist(&chetak.id).await;
        assert!(shop.wishlist_of("u1").is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_and_reports() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        shop.login_as("u1", "asha@example.com", "Asha Rao");
        let store = Store::new(Some(shop.clone()), Arc::new(MemoryStore::new()));
        store.initialize().await;
        let mut events = store.events();
        shop.set_fail_writes(true);

        let status = store.add_to_cart(catalog().remove(0), Quantity::ONE).await;

        assert_eq!(status, SyncStatus::Failed);
        assert_eq!(store.cart_count(), 1);
        match events.recv().await.unwrap() {
            StoreEvent::SyncFailed { operation, message } => {
                assert_eq!(operation, "add to cart");
                assert!(message.contains("write rejected"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listener_follows_backend_sessions() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        shop.seed_cart("u1", "2", 3);
        let store = Store::new(Some(shop.clone()), Arc::new(MemoryStore::new()));
        store.initialize().await;
        assert!(!store.is_authenticated());

        shop.login_as("u1", "asha@example.com", "Asha Rao");
        wait_for_user(&store, Some("u1")).await;
        assert_eq!(store.cart_count(), 3);

        shop.logout();
        wait_for_user(&store, None).await;
        assert_eq!(store.cart_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_out_transitions_immediately() {
        let shop = Arc::new(FakeShop::new().with_products(catalog()));
        shop.login_as("u1", "asha@example.com", "Asha Rao");
        let store = Store::new(Some(shop.clone()), Arc::new(MemoryStore::new()));
        store.initialize().await;

        store.sign_out().await.unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(shop.call_count("sign_out"), 1);
    }
}
