//! Shared fixtures for the cross-crate tests in `tests/`.
//!
//! The storefront and the admin panel run against their in-memory fakes
//! (`test-support` feature); third-party media APIs run against wiremock.
//!
//! ```bash
//! cargo test -p aries-mall-integration-tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use aries_mall_core::Product;
use aries_mall_storefront::backend::ShopBackend;
use aries_mall_storefront::storage::{LocalStore, MemoryStore};
use aries_mall_storefront::testing::{FakeShop, product};
use aries_mall_storefront::{Storefront, StorefrontConfig};

pub const SHOPPER_EMAIL: &str = "asha@example.com";
pub const SHOPPER_PASSWORD: &str = "scooter123";

/// Three scooters at 10, 20 and 30 rupees plus two accessories.
#[must_use]
pub fn catalog() -> Vec<Product> {
    vec![
        product("1", "Bajaj Chetak", "Electric Scooters", "Bajaj", 10),
        product("2", "Ather 450X", "Electric Scooters", "Ather", 20),
        product("3", "TVS iQube", "Electric Scooters", "TVS", 30),
        product("4", "Steelbird Helmet", "Accessories", "Steelbird", 1_500),
        product("5", "Riding Gloves", "Accessories", "Rynox", 800),
    ]
}

/// Fake backend over [`catalog`] with one shopper account.
#[must_use]
pub fn fake_shop() -> Arc<FakeShop> {
    Arc::new(
        FakeShop::new()
            .with_products(catalog())
            .with_account("u1", SHOPPER_EMAIL, SHOPPER_PASSWORD, "Asha Rao"),
    )
}

/// Config with a short filter debounce so tests need not wait long.
#[must_use]
pub fn quick_config() -> StorefrontConfig {
    StorefrontConfig {
        filter_debounce: Duration::from_millis(20),
        ..StorefrontConfig::default()
    }
}

/// Starts a storefront over `shop` and a fresh in-memory local store.
pub async fn start_shop(shop: &Arc<FakeShop>) -> (Storefront, Arc<dyn LocalStore>) {
    let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let backend: Arc<dyn ShopBackend> = shop.clone();
    let app = Storefront::with_parts(&quick_config(), Some(backend), Arc::clone(&local)).await;
    (app, local)
}
