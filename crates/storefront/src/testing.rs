//! In-memory [`ShopBackend`] for tests.
//!
//! `FakeShop` keeps every table in memory, publishes sessions on a watch
//! channel like the real auth client, and can be told to fail writes or to
//! hold product lookups until released (for navigation race tests).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use aries_mall_core::{
    AccessToken, ImageFit, Price, Product, ProductId, Quantity, Session, SlideId, SlideRow, User,
    UserId, UserMetadata,
};
use aries_mall_supabase::{SignUpOutcome, SupabaseError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Notify, watch};

use crate::backend::{CartRow, ShopBackend, WishlistRow};

/// Builds a product with the fields the storefront cares about.
#[must_use]
pub fn product(id: &str, name: &str, category: &str, brand: &str, price: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        brand: brand.to_owned(),
        category: category.to_owned(),
        price: Price::new(Decimal::from(price)),
        rating: 4.0,
        description: format!("{name} description"),
        images: Vec::new(),
        features: Vec::new(),
        warranty: None,
        created_at: None,
    }
}

/// Builds an active slide with only a title.
#[must_use]
pub fn slide(id: &str, title: &str) -> SlideRow {
    SlideRow {
        id: SlideId::new(id),
        title: Some(title.to_owned()),
        description: None,
        button_text: None,
        button_link: None,
        image_url_desktop: None,
        image_url_mobile: None,
        thumbnail_url: None,
        show_overlay: true,
        fit_desktop: ImageFit::Cover,
        fit_mobile: ImageFit::Cover,
        is_active: true,
        created_at: None,
    }
}

struct Account {
    email: String,
    password: String,
    user: User,
}

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    slides: Vec<SlideRow>,
    cart: Vec<CartRow>,
    wishlist: Vec<WishlistRow>,
    accounts: Vec<Account>,
    calls: Vec<String>,
}

/// Fake backend holding everything in memory.
pub struct FakeShop {
    tables: Mutex<Tables>,
    session: watch::Sender<Option<Session>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    product_gate: Mutex<Option<Arc<Notify>>>,
}

impl Default for FakeShop {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeShop {
    #[must_use]
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            tables: Mutex::new(Tables::default()),
            session,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            product_gate: Mutex::new(None),
        }
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: impl Into<String>) {
        self.tables().calls.push(call.into());
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

    /// Registers an account that `sign_in` accepts.
    #[must_use]
    pub fn with_account(self, user_id: &str, email: &str, password: &str, full_name: &str) -> Self {
        let user = user(user_id, email, full_name);
        self.tables().accounts.push(Account {
            email: email.to_owned(),
            password: password.to_owned(),
            user,
        });
        self
    }

    /// Adds a remote cart row.
    pub fn seed_cart(&self, user: &str, product: &str, quantity: u32) {
        let Some(quantity) = Quantity::new(quantity) else {
            return;
        };
        self.tables().cart.push(CartRow {
            user_id: UserId::new(user),
            product_id: ProductId::new(product),
            quantity,
        });
    }

    /// Adds a remote wishlist row.
    pub fn seed_wishlist(&self, user: &str, product: &str) {
        self.tables().wishlist.push(WishlistRow {
            user_id: UserId::new(user),
            product_id: ProductId::new(product),
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

    /// Holds `product` lookups until the returned handle is notified.
    #[must_use]
    pub fn gate_product_lookups(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self
            .product_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&gate));
        gate
    }

    /// Publishes a session as if the user logged in elsewhere.
    pub fn login_as(&self, user_id: &str, email: &str, full_name: &str) -> Session {
        let session = session_for(user(user_id, email, full_name));
        self.session.send_replace(Some(session.clone()));
        session
    }

    /// Publishes a logout.
    pub fn logout(&self) {
        self.session.send_replace(None);
    }

    /// Remote cart rows for a user as `(product_id, quantity)`.
    #[must_use]
    pub fn cart_of(&self, user: &str) -> Vec<(String, u32)> {
        self.tables()
            .cart
            .iter()
            .filter(|r| r.user_id.as_str() == user)
            .map(|r| (r.product_id.to_string(), r.quantity.get()))
            .collect()
    }

    /// Remote wishlist product ids for a user.
    #[must_use]
    pub fn wishlist_of(&self, user: &str) -> Vec<String> {
        self.tables()
            .wishlist
            .iter()
            .filter(|r| r.user_id.as_str() == user)
            .map(|r| r.product_id.to_string())
            .collect()
    }

    /// Every backend call made so far, by name.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.tables().calls.clone()
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
}

fn user(id: &str, email: &str, full_name: &str) -> User {
    User {
        id: UserId::new(id),
        email: Some(email.to_owned()),
        user_metadata: UserMetadata {
            full_name: Some(full_name.to_owned()),
        },
        created_at: None,
    }
}

fn session_for(user: User) -> Session {
    Session {
        access_token: AccessToken::new(format!("token-{}", user.id)),
        refresh_token: None,
        expires_at: None,
        user,
    }
}

#[async_trait]
impl ShopBackend for FakeShop {
    async fn current_session(&self) -> Result<Option<Session>, SupabaseError> {
        self.record("current_session");
        Ok(self.session.borrow().clone())
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SupabaseError> {
        self.record("sign_in");
        let user = self
            .tables()
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| SupabaseError::Auth("Invalid login credentials".to_owned()))?;
        let session = session_for(user);
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, SupabaseError> {
        self.record("sign_up");
        let mut tables = self.tables();
        if tables.accounts.iter().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(SupabaseError::Auth("User already registered".to_owned()));
        }
        let new_user = user(&format!("user-{}", tables.accounts.len() + 1), email, full_name);
        tables.accounts.push(Account {
            email: email.to_owned(),
            password: password.to_owned(),
            user: new_user.clone(),
        });
        drop(tables);
        let session = session_for(new_user);
        self.session.send_replace(Some(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self) -> Result<(), SupabaseError> {
        self.record("sign_out");
        self.session.send_replace(None);
        Ok(())
    }

    async fn products(&self) -> Result<Vec<Product>, SupabaseError> {
        self.record("products");
        self.check_read()?;
        Ok(self.tables().products.clone())
    }

    async fn products_matching(
        &self,
        category_pattern: &str,
        brand_pattern: Option<&str>,
    ) -> Result<Vec<Product>, SupabaseError> {
        self.record("products_matching");
        self.check_read()?;
        Ok(self
            .tables()
            .products
            .iter()
            .filter(|p| ilike(&p.category, category_pattern))
            .filter(|p| brand_pattern.is_none_or(|b| ilike(&p.brand, b)))
            .cloned()
            .collect())
    }

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, SupabaseError> {
        self.record("product");
        let gate = self
            .product_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_read()?;
        Ok(self.tables().products.iter().find(|p| &p.id == id).cloned())
    }

    async fn active_slides(&self) -> Result<Vec<SlideRow>, SupabaseError> {
        self.record("active_slides");
        self.check_read()?;
        Ok(self
            .tables()
            .slides
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn cart_rows(&self, user: &UserId) -> Result<Vec<CartRow>, SupabaseError> {
        self.record("cart_rows");
        self.check_read()?;
        Ok(self
            .tables()
            .cart
            .iter()
            .filter(|r| &r.user_id == user)
            .cloned()
            .collect())
    }

    async fn upsert_cart_row(&self, row: &CartRow) -> Result<(), SupabaseError> {
        self.record("upsert_cart_row");
        self.check_write()?;
        let mut tables = self.tables();
        if let Some(existing) = tables
            .cart
            .iter_mut()
            .find(|r| r.user_id == row.user_id && r.product_id == row.product_id)
        {
            existing.quantity = row.quantity;
        } else {
            tables.cart.push(row.clone());
        }
        Ok(())
    }

    async fn update_cart_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<(), SupabaseError> {
        self.record("update_cart_quantity");
        self.check_write()?;
        for row in self
            .tables()
            .cart
            .iter_mut()
            .filter(|r| &r.user_id == user && &r.product_id == product)
        {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_row(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<(), SupabaseError> {
        self.record("delete_cart_row");
        self.check_write()?;
        self.tables()
            .cart
            .retain(|r| !(&r.user_id == user && &r.product_id == product));
        Ok(())
    }

    async fn wishlist_rows(&self, user: &UserId) -> Result<Vec<ProductId>, SupabaseError> {
        self.record("wishlist_rows");
        self.check_read()?;
        Ok(self
            .tables()
            .wishlist
            .iter()
            .filter(|r| &r.user_id == user)
            .map(|r| r.product_id.clone())
            .collect())
    }

    async fn insert_wishlist_row(&self, row: &WishlistRow) -> Result<(), SupabaseError> {
        self.record("insert_wishlist_row");
        self.check_write()?;
        self.tables().wishlist.push(row.clone());
        Ok(())
    }

    async fn delete_wishlist_row(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<(), SupabaseError> {
        self.record("delete_wishlist_row");
        self.check_write()?;
        self.tables()
            .wishlist
            .retain(|r| !(&r.user_id == user && &r.product_id == product));
        Ok(())
    }
}

/// `ILIKE` with `_` as the only wildcard, which is all the storefront emits.
fn ilike(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.to_lowercase().chars().collect();
    let mut pattern_chars = Vec::new();
    let mut chars = pattern.to_lowercase().chars().collect::<Vec<_>>().into_iter();
    while let Some(c) = chars.next() {
        match c {
            '\\' => pattern_chars.push(Some(chars.next().unwrap_or('\\'))),
            '_' => pattern_chars.push(None),
            other => pattern_chars.push(Some(other)),
        }
    }
    value.len() == pattern_chars.len()
        && value
            .iter()
            .zip(&pattern_chars)
            .all(|(v, p)| p.is_none_or(|p| p == *v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ilike_wildcards() {
        assert!(ilike("Electric Scooters", "electric_scooters"));
        assert!(!ilike("Electric Scooters", "electric_scooter"));
        assert!(!ilike("a_b", "a\\_c"));
        assert!(ilike("a_b", "a\\_b"));
    }
}
