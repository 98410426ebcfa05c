//! Storefront commands.
//!
//! Each command starts the shop over the local store in `ARIES_DATA_DIR`,
//! so the session, guest cart and wishlist carry over between runs.

use aries_mall_core::ProductId;
use aries_mall_storefront::pages::UiEvent;
use aries_mall_storefront::storage::{keys, write_json};
use aries_mall_storefront::store::SyncStatus;
use aries_mall_storefront::{Storefront, StorefrontConfig};
use tracing::info;

use super::{CommandError, password_or_prompt};
use crate::output;

/// Loads configuration and starts the shop.
///
/// # Errors
///
/// Returns `Config` for invalid environment values or `Storefront` if the
/// local store cannot be opened.
pub async fn open() -> Result<Storefront, CommandError> {
    let config = StorefrontConfig::from_env()?;
    Ok(Storefront::start(config).await?)
}

/// Saves the session and stops background tasks.
pub fn close(shop: Storefront) {
    let store = shop.store();
    let local = store.local();
    let saved = match store.session() {
        Some(session) => write_json(local.as_ref(), keys::SESSION, &session),
        None => local.remove(keys::SESSION),
    };
    if let Err(e) = saved {
        tracing::warn!(error = %e, "Failed to persist session");
    }
    shop.shutdown();
}

fn show(shop: &Storefront) {
    output::page(shop.outlet().title().as_deref(), &shop.outlet().render());
    output::toasts(&shop.toasts().drain());
}

pub async fn browse(shop: &Storefront, fragments: &[String]) -> Result<(), CommandError> {
    for fragment in fragments {
        shop.open(fragment).await;
        show(shop);
    }
    Ok(())
}

pub async fn login(
    shop: &Storefront,
    email: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = password_or_prompt(password)?;
    shop.open("#/login").await;
    shop.send(UiEvent::SubmitLogin {
        email: email.to_owned(),
        password,
    })
    .await?;
    output::toasts(&shop.toasts().drain());
    if !shop.store().is_authenticated() {
        return Err(CommandError::SignInFailed);
    }
    info!("Signed in");
    Ok(())
}

pub async fn logout(shop: &Storefront) -> Result<(), CommandError> {
    shop.send(UiEvent::SignOut).await?;
    output::toasts(&shop.toasts().drain());
    Ok(())
}

pub async fn add_to_cart(
    shop: &Storefront,
    product_id: &str,
    quantity: u32,
) -> Result<(), CommandError> {
    if quantity == 0 {
        return Err(CommandError::InvalidArgument(
            "quantity must be at least 1".to_owned(),
        ));
    }
    let product_id = ProductId::new(product_id);
    shop.open(&format!("#/product/{product_id}")).await;
    if quantity > 1 {
        let delta = i32::try_from(quantity - 1)
            .map_err(|_| CommandError::InvalidArgument("quantity is too large".to_owned()))?;
        shop.send(UiEvent::ChangeQuantity(delta)).await?;
    }
    shop.send(UiEvent::AddToCart { product_id }).await?;
    output::toasts(&shop.toasts().drain());
    output::line(&format!("Cart: {} item(s)", shop.store().cart_count()));
    Ok(())
}

fn report(status: SyncStatus) {
    let text = match status {
        SyncStatus::Unchanged => "Nothing changed.",
        SyncStatus::Local => "Saved on this device.",
        SyncStatus::Remote => "Saved to your account.",
        SyncStatus::Failed => "Changed for this session only; saving failed.",
    };
    output::line(text);
}

pub async fn set_quantity(
    shop: &Storefront,
    product_id: &str,
    quantity: i64,
) -> Result<(), CommandError> {
    let status = shop
        .store()
        .set_quantity(&ProductId::new(product_id), quantity)
        .await;
    report(status);
    Ok(())
}

pub async fn remove(shop: &Storefront, product_id: &str) -> Result<(), CommandError> {
    let status = shop
        .store()
        .remove_from_cart(&ProductId::new(product_id))
        .await;
    report(status);
    Ok(())
}

pub async fn toggle_wishlist(shop: &Storefront, product_id: &str) -> Result<(), CommandError> {
    let product_id = ProductId::new(product_id);
    let toggle = shop.store().toggle_wishlist(&product_id).await;
    output::line(if toggle.in_wishlist {
        "Added to wishlist."
    } else {
        "Removed from wishlist."
    });
    report(toggle.sync);
    output::line(&format!(
        "Wishlist: {} item(s)",
        shop.store().wishlist_count()
    ));
    Ok(())
}
