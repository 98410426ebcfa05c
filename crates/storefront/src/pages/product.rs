//! Product detail page.

use std::sync::{Mutex, PoisonError};

use askama::Template;
use async_trait::async_trait;
use aries_mall_core::image::{DETAIL_IMAGE_WIDTH, optimized_image_url};
use aries_mall_core::{Product, ProductId, Quantity};

use super::cards::{ProductCardActions, render_grid};
use super::{Effect, Page, PageContext, UiEvent};
use crate::error::Result;
use crate::outlet::View;
use crate::store::SyncStatus;

/// Gallery URLs for a product; never empty.
#[must_use]
pub fn gallery_images(product: &Product) -> Vec<String> {
    if product.images.is_empty() {
        return vec![optimized_image_url(None, DETAIL_IMAGE_WIDTH)];
    }
    product
        .images
        .iter()
        .map(|url| optimized_image_url(Some(url), DETAIL_IMAGE_WIDTH))
        .collect()
}

#[derive(Template)]
#[template(path = "partials/product_detail.html")]
struct DetailTemplate<'a> {
    product: &'a Product,
    brand: &'a str,
    rating: String,
    price: String,
    images: &'a [String],
    selected_image: usize,
    main_image: &'a str,
    quantity: u32,
    in_wishlist: bool,
    warranty: &'a str,
}

#[derive(Template)]
#[template(path = "pages/product.html")]
struct ProductTemplate;

const NOT_FOUND: &str =
    "<h2>Product Not Found</h2><p>The product you are looking for does not exist.</p>";

struct DetailState {
    product: Option<Product>,
    images: Vec<String>,
    selected_image: usize,
    quantity: Quantity,
    related: Vec<Product>,
}

/// `/product/:id`
pub struct ProductPage {
    id: ProductId,
    ctx: PageContext,
    actions: ProductCardActions,
    state: Mutex<DetailState>,
}

impl ProductPage {
    #[must_use]
    pub fn new(ctx: PageContext, id: ProductId) -> Self {
        Self {
            id,
            actions: ProductCardActions::new(ctx.clone()),
            ctx,
            state: Mutex::new(DetailState {
                product: None,
                images: Vec::new(),
                selected_image: 0,
                quantity: Quantity::ONE,
                related: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DetailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render_detail(&self, view: &View) -> Result<()> {
        let html = {
            let state = self.lock();
            let Some(product) = state.product.as_ref() else {
                return Ok(());
            };
            let main_image = state
                .images
                .get(state.selected_image)
                .map_or("", String::as_str);
            DetailTemplate {
                product,
                brand: product.brand_label(),
                rating: format!("{:.1}", product.rating),
                price: product.price.display(),
                images: &state.images,
                selected_image: state.selected_image,
                main_image,
                quantity: state.quantity.get(),
                in_wishlist: self.ctx.store.is_in_wishlist(&product.id),
                warranty: product.warranty_text(),
            }
            .render()?
        };
        view.set("detail", html)
    }

    fn render_related(&self, view: &View) -> Result<()> {
        let cards = self.actions.cards(&self.lock().related);
        if cards.is_empty() {
            return view.set("related", "");
        }
        let grid = render_grid(&cards, "")?;
        view.set(
            "related",
            format!(
                r#"<h2 class="related-title">You Might Also Like</h2><div class="product-grid">{grid}</div>"#
            ),
        )
    }

    /// Shows the sign-in prompt for guests. Returns the redirect, if any.
    fn require_login(&self, target: &str) -> Option<Effect> {
        if self.ctx.store.is_authenticated() {
            return None;
        }
        self.ctx.toasts.info(
            "Authentication Required",
            format!("Please log in to add items to your {target}."),
        );
        Some(Effect::Navigate("/login".to_owned()))
    }

    async fn add_main_to_cart(&self) -> Effect {
        if let Some(redirect) = self.require_login("cart") {
            return redirect;
        }
        let (product, quantity) = {
            let state = self.lock();
            (state.product.clone(), state.quantity)
        };
        let Some(product) = product else {
            return Effect::None;
        };
        let name = product.name.clone();
        let status = self.ctx.store.add_to_cart(product, quantity).await;
        self.ctx
            .toasts
            .success("Added to Cart", format!("{} x {name}", quantity.get()));
        if status == SyncStatus::Failed {
            self.ctx.toasts.error(
                "Cart Not Saved",
                "Your cart could not be saved. Please try again.",
            );
        }
        Effect::None
    }

    async fn toggle_main_wishlist(&self, view: &View) -> Result<Effect> {
        if let Some(redirect) = self.require_login("wishlist") {
            return Ok(redirect);
        }
        let Some(name) = self.lock().product.as_ref().map(|p| p.name.clone()) else {
            return Ok(Effect::None);
        };
        let toggle = self.ctx.store.toggle_wishlist(&self.id).await;
        let (title, verb) = if toggle.in_wishlist {
            ("Added to Wishlist", "added")
        } else {
            ("Removed from Wishlist", "removed")
        };
        self.ctx.toasts.success(title, format!("{name} was {verb}."));
        if toggle.sync == SyncStatus::Failed {
            self.ctx.toasts.error(
                "Wishlist Not Saved",
                "Your wishlist could not be saved. Please try again.",
            );
        }
        self.render_detail(view)?;
        Ok(Effect::None)
    }
}

#[async_trait]
impl Page for ProductPage {
    fn name(&self) -> &'static str {
        "product"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        ProductTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        view.set(
            "detail",
            r#"<div class="product-detail-skeleton animate-shimmer"></div>"#,
        )?;
        let Some(product) = self.ctx.catalog.product(&self.id).await else {
            view.set_title("Product Not Found | Aries Mall")?;
            return view.set("detail", NOT_FOUND);
        };
        view.set_title(format!("{} | Aries Mall", product.name))?;
        let related = self.ctx.catalog.related_products(&product).await;
        {
            let mut state = self.lock();
            state.images = gallery_images(&product);
            state.product = Some(product);
            state.related = related;
        }
        self.render_detail(view)?;
        self.render_related(view)
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match event {
            UiEvent::ChangeQuantity(delta) => {
                let changed = {
                    let mut state = self.lock();
                    let next = i64::from(state.quantity.get()) + i64::from(delta);
                    match Quantity::from_signed(next) {
                        Some(q) => {
                            state.quantity = q;
                            true
                        }
                        None => false,
                    }
                };
                if changed {
                    self.render_detail(view)?;
                }
            }
            UiEvent::SelectImage(index) => {
                let changed = {
                    let mut state = self.lock();
                    let valid = index < state.images.len();
                    if valid {
                        state.selected_image = index;
                    }
                    valid
                };
                if changed {
                    self.render_detail(view)?;
                }
            }
            UiEvent::AddToCart { product_id } if product_id == self.id => {
                return Ok(self.add_main_to_cart().await);
            }
            UiEvent::ToggleWishlist { product_id } if product_id == self.id => {
                return self.toggle_main_wishlist(view).await;
            }
            UiEvent::AddToCart { product_id } => {
                let related = self.lock().related.clone();
                self.actions.add_to_cart(&product_id, &related).await;
            }
            UiEvent::ToggleWishlist { product_id } => {
                self.actions.toggle_wishlist(&product_id).await;
                self.render_related(view)?;
            }
            _ => {}
        }
        Ok(Effect::None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::product;

    #[test]
    fn test_gallery_falls_back_to_detail_placeholder() {
        let mut p = product("1", "Helmet", "Accessories", "", 2_000);
        assert_eq!(
            gallery_images(&p),
            vec!["https://placehold.co/600x600/f5f3ed/1a1a1a?text=No+Image".to_owned()]
        );

        p.images = vec![
            "https://res.cloudinary.com/demo/image/upload/v1/a.jpg".into(),
            String::new(),
        ];
        let gallery = gallery_images(&p);
        assert_eq!(gallery.len(), 2);
        assert!(gallery[0].contains("/upload/w_600,"));
        assert!(gallery[1].contains("placehold.co/600x600"));
    }
}
