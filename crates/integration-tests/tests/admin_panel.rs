//! Admin panel flows through `AdminPanel::open`/`send`, with the media APIs
//! served by wiremock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use aries_mall_admin::backend::AdminBackend;
use aries_mall_admin::config::Endpoints;
use aries_mall_admin::media::upscaler::PollPolicy;
use aries_mall_admin::pages::{AdminEvent, AdminPage, AutoConfirm, ProductForm};
use aries_mall_admin::settings::{CLOUDINARY_CLOUD_NAME, CLOUDINARY_UPLOAD_PRESET};
use aries_mall_admin::testing::{FakeAdmin, product};
use aries_mall_admin::{AdminConfig, AdminPanel};
use aries_mall_core::{MediaKind, ToastKind};
use aries_mall_storefront::storage::{LocalStore, MemoryStore};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADMIN_EMAIL: &str = "admin@ariesmall.com";

fn panel(fake: &Arc<FakeAdmin>, config: AdminConfig) -> AdminPanel {
    let backend: Arc<dyn AdminBackend> = fake.clone();
    let local: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    AdminPanel::with_parts(config, Some(backend), local, Arc::new(AutoConfirm(true)))
}

async fn sign_in(panel: &AdminPanel, email: &str, password: &str) -> Option<AdminPage> {
    panel.open("#/admin-login").await;
    panel
        .send(AdminEvent::SubmitLogin {
            email: email.into(),
            password: password.into(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_only_the_admin_account_gets_in() {
    let fake = Arc::new(
        FakeAdmin::new()
            .with_account(ADMIN_EMAIL, "admin-pw")
            .with_account("shopper@example.com", "shop-pw")
            .with_products([product("1", "Ather 450X", "Electric Scooters", 150_000, 1)]),
    );
    let panel = panel(&fake, AdminConfig::default());

    assert_eq!(panel.open("#/dashboard").await, Some(AdminPage::Login));

    assert_eq!(sign_in(&panel, "shopper@example.com", "shop-pw").await, None);
    assert!(panel.toasts().contains(ToastKind::Error, "Login Failed"));
    assert!(!panel.context().is_admin());
    assert!(fake.session().is_none());
    assert_eq!(panel.open("#/media-hub").await, Some(AdminPage::Login));

    assert_eq!(
        sign_in(&panel, ADMIN_EMAIL, "admin-pw").await,
        Some(AdminPage::Dashboard)
    );
    assert_eq!(
        panel.outlet().region("total-products").as_deref(),
        Some("1")
    );
    assert_eq!(
        panel.open("#/admin-login").await,
        Some(AdminPage::Dashboard)
    );
    panel.shutdown();
}

#[tokio::test]
async fn test_created_product_shows_on_dashboard() {
    let fake = Arc::new(
        FakeAdmin::new()
            .with_account(ADMIN_EMAIL, "admin-pw")
            .with_products([product("1", "Ather 450X", "Electric Scooters", 150_000, 1)]),
    );
    let panel = panel(&fake, AdminConfig::default());
    sign_in(&panel, ADMIN_EMAIL, "admin-pw").await;

    assert_eq!(
        panel.open("#/product-manager").await,
        Some(AdminPage::ProductManager)
    );
    let form = ProductForm {
        name: "Steelbird Helmet".into(),
        brand: "Steelbird".into(),
        category: "Accessories".into(),
        price: "1500".into(),
        image_main: "https://img.test/helmet.png".into(),
        features: "ISI certified, , Scratch resistant".into(),
        ..ProductForm::default()
    };
    panel.send(AdminEvent::SaveProduct(form)).await.unwrap();
    assert!(panel.toasts().contains(ToastKind::Success, "Success"));
    assert!(
        panel
            .outlet()
            .region("products-table")
            .unwrap()
            .contains("Steelbird Helmet")
    );
    let stored = fake.stored_products();
    let helmet = stored.iter().find(|p| p.name == "Steelbird Helmet").unwrap();
    assert_eq!(helmet.features, vec!["ISI certified", "Scratch resistant"]);

    panel.open("#/dashboard").await;
    assert_eq!(
        panel.outlet().region("total-products").as_deref(),
        Some("2")
    );
    assert_eq!(
        panel.outlet().region("total-categories").as_deref(),
        Some("2")
    );
    panel.shutdown();
}

#[tokio::test]
async fn test_staged_url_upload_records_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .and(body_string_contains("https://img.test/bike.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/bike.jpg",
            "public_id": "bike"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fake = Arc::new(
        FakeAdmin::new()
            .with_account(ADMIN_EMAIL, "admin-pw")
            .with_config(CLOUDINARY_CLOUD_NAME, "demo")
            .with_config(CLOUDINARY_UPLOAD_PRESET, "unsigned"),
    );
    let config = AdminConfig {
        endpoints: Endpoints::single(&server.uri()).unwrap(),
        ..AdminConfig::default()
    };
    let panel = panel(&fake, config);
    sign_in(&panel, ADMIN_EMAIL, "admin-pw").await;
    assert_eq!(panel.open("#/media-hub").await, Some(AdminPage::MediaHub));

    panel
        .send(AdminEvent::StageUrl("https://img.test/bike.jpg".into()))
        .await
        .unwrap();
    assert!(
        panel
            .outlet()
            .region("staged-uploads")
            .unwrap()
            .contains("staged-item")
    );
    panel.send(AdminEvent::UploadAll).await.unwrap();

    assert!(panel.toasts().contains(ToastKind::Success, "Upload Complete"));
    let results = panel.outlet().region("upload-results").unwrap();
    assert!(results.contains("result-group__name\">bike</p>"));
    assert!(results.contains("Cloudinary Default"));
    let history = fake.stored_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].media_type, MediaKind::Upload);
    assert_eq!(history[0].admin_email.as_deref(), Some(ADMIN_EMAIL));
    panel.shutdown();
}

#[test]
fn test_poll_policy_backs_off_to_the_cap() {
    let policy = PollPolicy {
        initial: Duration::from_secs(3),
        factor: 2,
        max_delay: Duration::from_secs(20),
        max_attempts: 6,
    };
    let delays: Vec<u64> = policy.delays().map(|d| d.as_secs()).collect();
    assert_eq!(delays, vec![3, 6, 12, 20, 20, 20]);

    let total: Duration = PollPolicy::default().delays().sum();
    assert!(total <= Duration::from_secs(20 * 30));
    assert_eq!(PollPolicy::default().delays().count(), 20);
}
