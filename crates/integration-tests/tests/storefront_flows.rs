//! Storefront flows driven through `Storefront::open`/`send`, the way a
//! shell or UI would, against the in-memory shop backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use aries_mall_core::{LineItem, ProductId, Quantity, ToastKind};
use aries_mall_integration_tests::{
    SHOPPER_EMAIL, SHOPPER_PASSWORD, catalog, fake_shop, start_shop,
};
use aries_mall_storefront::pages::UiEvent;
use aries_mall_storefront::router::Route;
use aries_mall_storefront::storage::{keys, write_snapshot};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_page_init_runs_once_per_navigation() {
    let shop = fake_shop();
    let (app, _local) = start_shop(&shop).await;

    let route = app.open("#/product/2").await;
    assert_eq!(
        route,
        Some(Route::Product {
            id: ProductId::new("2")
        })
    );
    assert_eq!(shop.call_count("product"), 1);
    assert_eq!(app.outlet().title().as_deref(), Some("Ather 450X | Aries Mall"));

    app.open("#/cart").await;
    assert_eq!(shop.call_count("product"), 1);
    app.shutdown();
}

#[tokio::test]
async fn test_superseded_initializer_does_not_render() {
    let shop = fake_shop();
    let (app, _local) = start_shop(&shop).await;
    let gate = shop.gate_product_lookups();

    let (slow, fast) = tokio::join!(app.open("#/product/1"), async {
        tokio::task::yield_now().await;
        let route = app.open("#/cart").await;
        gate.notify_one();
        route
    });

    assert_eq!(slow, None);
    assert_eq!(fast, Some(Route::Cart));
    let page = app.outlet().render();
    assert!(page.contains("Your Cart is Empty"));
    assert_ne!(
        app.outlet().title().as_deref(),
        Some("Bajaj Chetak | Aries Mall")
    );
    app.shutdown();
}

#[tokio::test]
async fn test_guards_redirect_guests_and_signed_in_users() {
    let shop = fake_shop();
    let (app, _local) = start_shop(&shop).await;

    assert_eq!(app.open("#/profile").await, Some(Route::Login));
    assert!(app.toasts().contains(ToastKind::Info, "Access Denied"));
    assert_eq!(app.open("#/wishlist").await, Some(Route::Login));

    app.send(UiEvent::SubmitLogin {
        email: SHOPPER_EMAIL.into(),
        password: SHOPPER_PASSWORD.into(),
    })
    .await
    .unwrap();
    assert!(app.store().is_authenticated());

    assert_eq!(
        app.open("#/login").await,
        Some(Route::Profile { subview: None })
    );
    assert_eq!(
        app.open("#/wishlist").await,
        Some(Route::Profile {
            subview: Some("wishlist".into())
        })
    );
    app.shutdown();
}

#[tokio::test]
async fn test_login_discards_guest_cart_and_logout_does_not_merge() {
    let shop = fake_shop();
    shop.seed_cart("u1", "1", 2);
    let (app, local) = start_shop(&shop).await;

    assert_eq!(app.open("#/").await, Some(Route::Home));
    app.send(UiEvent::AddToCart {
        product_id: ProductId::new("4"),
    })
    .await
    .unwrap();
    assert!(app.toasts().contains(ToastKind::Success, "Added to Cart"));
    assert_eq!(app.store().cart_count(), 1);
    assert!(local.get(keys::CART).is_some());

    app.open("#/login").await;
    let route = app
        .send(UiEvent::SubmitLogin {
            email: SHOPPER_EMAIL.into(),
            password: SHOPPER_PASSWORD.into(),
        })
        .await
        .unwrap();
    assert_eq!(route, Some(Route::Home));
    assert!(app.toasts().contains(ToastKind::Success, "Login Successful"));
    assert_eq!(app.store().cart_count(), 2);
    assert!(local.get(keys::CART).is_none());
    assert_eq!(shop.cart_of("u1"), vec![("1".to_owned(), 2)]);

    // A cart saved on this device while signed in is what logout falls back to.
    let gloves = catalog().into_iter().find(|p| p.id == ProductId::new("5")).unwrap();
    let device_cart = vec![LineItem {
        product: gloves,
        quantity: Quantity::new(3).unwrap(),
    }];
    write_snapshot(local.as_ref(), keys::CART, &device_cart).unwrap();

    let route = app.send(UiEvent::SignOut).await.unwrap();
    assert_eq!(route, Some(Route::Login));
    assert!(!app.store().is_authenticated());
    let ids: Vec<String> = app
        .store()
        .cart_items()
        .iter()
        .map(|item| item.product.id.to_string())
        .collect();
    assert_eq!(ids, vec!["5"]);
    assert_eq!(app.store().cart_count(), 3);
    assert_eq!(shop.cart_of("u1"), vec![("1".to_owned(), 2)]);
    app.shutdown();
}

#[tokio::test]
async fn test_category_price_filter_is_debounced() {
    let shop = fake_shop();
    let (app, _local) = start_shop(&shop).await;

    let route = app.open("#/category/electric-scooters").await;
    assert!(matches!(route, Some(Route::Category { .. })));
    assert_eq!(
        app.outlet().region("count").as_deref(),
        Some("Showing 3 products.")
    );

    app.send(UiEvent::PriceRange {
        min: Some(Decimal::from(15)),
        max: None,
    })
    .await
    .unwrap();
    // Still unfiltered until the debounce elapses.
    assert_eq!(
        app.outlet().region("count").as_deref(),
        Some("Showing 3 products.")
    );

    tokio::time::timeout(Duration::from_secs(2), async {
        while app.outlet().region("count").as_deref() != Some("Showing 2 products.") {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    let grid = app.outlet().region("grid").unwrap();
    assert!(grid.contains("Ather 450X"));
    assert!(grid.contains("TVS iQube"));
    assert!(!grid.contains("Bajaj Chetak"));
    app.shutdown();
}

#[tokio::test]
async fn test_header_search_navigates_to_results() {
    let shop = fake_shop();
    let (app, _local) = start_shop(&shop).await;
    app.open("#/").await;

    let route = app.send(UiEvent::Search("  Chetak ".into())).await.unwrap();
    assert_eq!(
        route,
        Some(Route::Search {
            query: Some("Chetak".into())
        })
    );
    assert_eq!(
        app.outlet().region("count").as_deref(),
        Some("1 result(s) found.")
    );
    assert!(app.outlet().region("grid").unwrap().contains("Bajaj Chetak"));

    assert_eq!(app.send(UiEvent::Search("   ".into())).await.unwrap(), None);
    app.shutdown();
}

#[tokio::test]
async fn test_search_without_matches_quotes_the_query() {
    let shop = fake_shop();
    let (app, _local) = start_shop(&shop).await;

    assert_eq!(
        app.open("#/search?q=zzz").await,
        Some(Route::Search {
            query: Some("zzz".into())
        })
    );
    assert_eq!(
        app.outlet().region("count").as_deref(),
        Some("0 result(s) found.")
    );
    let empty = app.outlet().region("no-results").unwrap();
    assert!(empty.contains("No Results Found"));
    assert!(empty.contains("zzz"));
    assert_eq!(app.outlet().region("grid").as_deref(), Some(""));
    app.shutdown();
}
