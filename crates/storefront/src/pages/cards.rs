//! Product cards shared by the home, category, search and wishlist views.

use askama::Template;
use aries_mall_core::image::{CARD_IMAGE_WIDTH, optimized_image_url};
use aries_mall_core::{Product, ProductId, Quantity};

use super::PageContext;
use crate::error::Result;
use crate::store::SyncStatus;

/// Card view model.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: String,
    pub rating: String,
    pub price: String,
    pub image: String,
    pub in_wishlist: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, in_wishlist: bool) -> Self {
        let brand = product.brand.trim();
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            brand: (!brand.is_empty()).then(|| brand.to_owned()),
            category: product.category.clone(),
            rating: format!("{:.1}", product.rating),
            price: product.price.display(),
            image: optimized_image_url(product.primary_image(), CARD_IMAGE_WIDTH),
            in_wishlist,
        }
    }
}

#[derive(Template)]
#[template(path = "partials/product_grid.html")]
struct GridTemplate<'a> {
    cards: &'a [ProductCard],
    empty_message: &'a str,
    removable: bool,
}

const SKELETON_CARD: &str = r#"<div class="product-card-skeleton"><div class="image animate-shimmer"></div><div class="info"><div class="line1 animate-shimmer"></div><div class="line2 animate-shimmer"></div></div></div>"#;

/// Link shown under an empty state.
#[derive(Debug, Clone, Copy)]
pub struct CallToAction<'a> {
    pub href: &'a str,
    pub label: &'a str,
}

/// Empty-state block with an optional call to action.
#[derive(Template)]
#[template(path = "partials/empty_state.html")]
pub struct EmptyState<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub action: Option<CallToAction<'a>>,
}

/// Renders a grid of cards, or `empty_message` when there are none.
///
/// # Errors
///
/// Returns `Template` if rendering fails.
pub fn render_grid(cards: &[ProductCard], empty_message: &str) -> Result<String> {
    Ok(GridTemplate {
        cards,
        empty_message,
        removable: false,
    }
    .render()?)
}

/// Like [`render_grid`], with a remove button on every card.
///
/// # Errors
///
/// Returns `Template` if rendering fails.
pub fn render_removable_grid(cards: &[ProductCard], empty_message: &str) -> Result<String> {
    Ok(GridTemplate {
        cards,
        empty_message,
        removable: true,
    }
    .render()?)
}

/// Placeholder cards shown while data loads.
#[must_use]
pub fn skeleton(count: usize) -> String {
    SKELETON_CARD.repeat(count)
}

/// Add-to-cart and wishlist buttons on product cards.
#[derive(Debug, Clone)]
pub struct ProductCardActions {
    ctx: PageContext,
}

impl ProductCardActions {
    #[must_use]
    pub const fn new(ctx: PageContext) -> Self {
        Self { ctx }
    }

    /// Builds cards with wishlist state from the store.
    #[must_use]
    pub fn cards(&self, products: &[Product]) -> Vec<ProductCard> {
        products
            .iter()
            .map(|p| ProductCard::new(p, self.ctx.store.is_in_wishlist(&p.id)))
            .collect()
    }

    /// Adds one unit. Looks in `shown` first, then asks the catalog.
    pub async fn add_to_cart(&self, product_id: &ProductId, shown: &[Product]) {
        let product = match shown.iter().find(|p| &p.id == product_id) {
            Some(p) => Some(p.clone()),
            None => self.ctx.catalog.product(product_id).await,
        };
        let Some(product) = product else {
            self.ctx
                .toasts
                .error("Product Unavailable", "This product could not be found.");
            return;
        };
        let name = product.name.clone();
        let status = self.ctx.store.add_to_cart(product, Quantity::ONE).await;
        self.ctx
            .toasts
            .success("Added to Cart", format!("{name} is now in your cart."));
        if status == SyncStatus::Failed {
            self.ctx.toasts.error(
                "Cart Not Saved",
                "Your cart could not be saved. Please try again.",
            );
        }
    }

    /// Flips wishlist membership. Returns the new membership.
    pub async fn toggle_wishlist(&self, product_id: &ProductId) -> bool {
        let toggle = self.ctx.store.toggle_wishlist(product_id).await;
        let description = if toggle.in_wishlist {
            "Item added to your favorites."
        } else {
            "Item removed from your favorites."
        };
        self.ctx.toasts.success("Wishlist Updated", description);
        if toggle.sync == SyncStatus::Failed {
            self.ctx.toasts.error(
                "Wishlist Not Saved",
                "Your wishlist could not be saved. Please try again.",
            );
        }
        toggle.in_wishlist
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::product;

    #[test]
    fn test_card_falls_back_to_placeholder_and_hides_blank_brand() {
        let p = product("7", "Helmet", "Accessories", "  ", 2_000);
        let card = ProductCard::new(&p, true);
        assert!(card.image.contains("placehold.co/500x500"));
        assert!(card.brand.is_none());
        assert_eq!(card.price, "₹2,000.00");
        assert_eq!(card.rating, "4.0");
    }

    #[test]
    fn test_grid_renders_cards_and_empty_message() {
        let p = product("7", "Helmet <XL>", "Accessories", "Steelbird", 2_000);
        let html = render_grid(&[ProductCard::new(&p, false)], "No products found.").unwrap();
        assert!(html.contains(r#"data-product-id="7""#));
        assert!(html.contains("Helmet &#60;XL&#62;") || html.contains("Helmet &lt;XL&gt;"));
        assert!(!html.contains("No products found."));

        let empty = render_grid(&[], "No products found.").unwrap();
        assert!(empty.contains("No products found."));
    }
}
