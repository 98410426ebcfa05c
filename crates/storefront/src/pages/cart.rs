//! Cart page: line items and order summary.

use askama::Template;
use async_trait::async_trait;
use aries_mall_core::image::{CART_IMAGE_WIDTH, optimized_image_url};
use aries_mall_core::{Cart, Price, ProductId};

use super::cards::{CallToAction, EmptyState};
use super::{Effect, Page, PageContext, UiEvent};
use crate::error::Result;
use crate::outlet::View;
use crate::store::SyncStatus;

/// Flat tax applied at checkout.
pub const TAX_PERCENT: u32 = 10;

/// Subtotal, taxes and total for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub subtotal: Price,
    pub taxes: Price,
    pub total: Price,
}

impl CartSummary {
    #[must_use]
    pub fn of(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        let taxes = subtotal.percent(TAX_PERCENT);
        Self {
            subtotal,
            taxes,
            total: subtotal + taxes,
        }
    }
}

struct CartLine {
    id: String,
    name: String,
    category: String,
    image: String,
    price: String,
    quantity: u32,
    line_total: String,
    can_decrease: bool,
}

#[derive(Template)]
#[template(path = "partials/cart_items.html")]
struct CartItemsTemplate {
    lines: Vec<CartLine>,
    subtotal: String,
    taxes: String,
    total: String,
}

#[derive(Template)]
#[template(path = "pages/cart.html")]
struct CartTemplate;

/// `/cart`
pub struct CartPage {
    ctx: PageContext,
}

impl CartPage {
    #[must_use]
    pub const fn new(ctx: PageContext) -> Self {
        Self { ctx }
    }

    fn render(&self, view: &View) -> Result<()> {
        let cart = self.ctx.store.cart();
        if cart.is_empty() {
            let empty = EmptyState {
                title: "Your Cart is Empty",
                text: "Looks like you haven't added anything to your cart yet.",
                action: Some(CallToAction {
                    href: "#/",
                    label: "Start Shopping",
                }),
            };
            return view.set("content", empty.render()?);
        }
        let summary = CartSummary::of(&cart);
        let lines = cart
            .items()
            .iter()
            .map(|item| CartLine {
                id: item.product.id.to_string(),
                name: item.product.name.clone(),
                category: item.product.category.clone(),
                image: optimized_image_url(item.product.primary_image(), CART_IMAGE_WIDTH),
                price: item.product.price.display(),
                quantity: item.quantity.get(),
                line_total: item.line_total().display(),
                can_decrease: item.quantity.get() > 1,
            })
            .collect();
        let html = CartItemsTemplate {
            lines,
            subtotal: summary.subtotal.display(),
            taxes: summary.taxes.display(),
            total: summary.total.display(),
        }
        .render()?;
        view.set("content", html)
    }

    fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.ctx
            .store
            .cart()
            .get(product_id)
            .map(|item| item.quantity.get())
    }

    fn report(&self, status: SyncStatus) {
        if status == SyncStatus::Failed {
            self.ctx.toasts.error(
                "Cart Not Saved",
                "Your cart could not be saved. Please try again.",
            );
        }
    }
}

#[async_trait]
impl Page for CartPage {
    fn name(&self) -> &'static str {
        "cart"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        CartTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        view.set_title("Shopping Cart | Aries Mall")?;
        self.render(view)
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match event {
            UiEvent::IncreaseQuantity { product_id } => {
                if let Some(current) = self.quantity_of(&product_id) {
                    let status = self
                        .ctx
                        .store
                        .set_quantity(&product_id, i64::from(current) + 1)
                        .await;
                    self.report(status);
                }
            }
            UiEvent::DecreaseQuantity { product_id } => {
                if let Some(current) = self.quantity_of(&product_id).filter(|q| *q > 1) {
                    let status = self
                        .ctx
                        .store
                        .set_quantity(&product_id, i64::from(current) - 1)
                        .await;
                    self.report(status);
                }
            }
            UiEvent::RemoveItem { product_id } => {
                let Some(name) = self
                    .ctx
                    .store
                    .cart()
                    .get(&product_id)
                    .map(|item| item.product.name.clone())
                else {
                    return Ok(Effect::None);
                };
                let status = self.ctx.store.remove_from_cart(&product_id).await;
                self.ctx
                    .toasts
                    .success("Item Removed", format!("{name} was removed from your cart."));
                self.report(status);
            }
            _ => return Ok(Effect::None),
        }
        self.render(view)?;
        Ok(Effect::None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aries_mall_core::{LineItem, Quantity};
    use rust_decimal::Decimal;

    use super::*;
    use crate::testing::product;

    #[test]
    fn test_summary_adds_ten_percent_tax() {
        let cart = Cart::from_items([
            LineItem {
                product: product("1", "Helmet", "Accessories", "Steelbird", 2_000),
                quantity: Quantity::new(2).unwrap(),
            },
            LineItem {
                product: product("2", "Gloves", "Accessories", "Rynox", 1_000),
                quantity: Quantity::ONE,
            },
        ]);
        let summary = CartSummary::of(&cart);
        assert_eq!(summary.subtotal.amount(), Decimal::from(5_000));
        assert_eq!(summary.taxes.amount(), Decimal::from(500));
        assert_eq!(summary.total.amount(), Decimal::from(5_500));
    }

    #[test]
    fn test_empty_cart_summary_is_zero() {
        let summary = CartSummary::of(&Cart::new());
        assert_eq!(summary.total, Price::ZERO);
    }
}
