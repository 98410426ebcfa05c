//! Category listing with brand, price and sort filters.
//!
//! The category and brand narrow the query on the backend; price range and
//! sort apply locally to the fetched list. Price input is debounced.

use std::sync::{Arc, Mutex, PoisonError};

use askama::Template;
use async_trait::async_trait;
use aries_mall_core::Product;
use aries_mall_core::slug::{normalize_slug, title_from_slug};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::debug;

use super::cards::{ProductCardActions, render_grid, skeleton};
use super::{Effect, Page, PageContext, UiEvent};
use crate::error::Result;
use crate::outlet::View;

/// Sort options on the category page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySort {
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    RatingDesc,
    NameAsc,
}

impl CategorySort {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "price-asc" => Self::PriceAsc,
            "price-desc" => Self::PriceDesc,
            "rating-desc" => Self::RatingDesc,
            "name-asc" => Self::NameAsc,
            _ => Self::Default,
        }
    }
}

/// Inclusive price bounds. Negative bounds are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceFilter {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

/// Applies the price filter, then sorts.
#[must_use]
pub fn filter_and_sort(products: &[Product], price: PriceFilter, sort: CategorySort) -> Vec<Product> {
    let min = price.min.filter(|m| !m.is_sign_negative());
    let max = price.max.filter(|m| !m.is_sign_negative());
    let mut result: Vec<Product> = products
        .iter()
        .filter(|p| min.is_none_or(|m| p.price.amount() >= m))
        .filter(|p| max.is_none_or(|m| p.price.amount() <= m))
        .cloned()
        .collect();
    match sort {
        CategorySort::Default => {}
        CategorySort::PriceAsc => result.sort_by(|a, b| a.price.cmp(&b.price)),
        CategorySort::PriceDesc => result.sort_by(|a, b| b.price.cmp(&a.price)),
        CategorySort::RatingDesc => result.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        CategorySort::NameAsc => {
            result.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        }
    }
    result
}

/// Distinct non-empty brands, sorted.
#[must_use]
pub fn available_brands(products: &[Product]) -> Vec<String> {
    let mut brands: Vec<String> = products
        .iter()
        .map(|p| p.brand.trim())
        .filter(|b| !b.is_empty())
        .map(str::to_owned)
        .collect();
    brands.sort();
    brands.dedup();
    brands
}

/// Page heading for a category slug and optional brand slug.
#[must_use]
pub fn category_title(slug: &str, brand: Option<&str>) -> String {
    let title = title_from_slug(slug);
    match brand {
        Some(brand) => format!("{title} ({})", brand.replace('-', " ").to_uppercase()),
        None => title,
    }
}

/// "Showing 3 products."
#[must_use]
pub fn count_text(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("Showing {count} product{plural}.")
}

struct BrandButton {
    label: String,
    slug: String,
    active: bool,
}

#[derive(Template)]
#[template(path = "partials/brand_filters.html")]
struct BrandFiltersTemplate {
    brands: Vec<BrandButton>,
    all_active: bool,
}

#[derive(Template)]
#[template(path = "pages/category.html")]
struct CategoryTemplate;

#[derive(Default)]
struct CategoryState {
    products: Vec<Product>,
    price: PriceFilter,
    sort: CategorySort,
}

/// `/category/:slug[?brand=]`
pub struct CategoryPage {
    slug: String,
    brand: Option<String>,
    ctx: PageContext,
    actions: ProductCardActions,
    state: Arc<Mutex<CategoryState>>,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

impl CategoryPage {
    #[must_use]
    pub fn new(ctx: PageContext, slug: &str, brand: Option<&str>) -> Self {
        Self {
            slug: slug.to_owned(),
            brand: brand.map(str::to_owned).filter(|b| !b.is_empty()),
            actions: ProductCardActions::new(ctx.clone()),
            ctx,
            state: Arc::new(Mutex::new(CategoryState::default())),
            debounce: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CategoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn brand_filters(&self, brands: &[String]) -> Result<String> {
        if brands.is_empty() {
            return Ok(r#"<p class="text-muted-foreground text-sm">No brands available.</p>"#.to_owned());
        }
        let buttons = brands
            .iter()
            .map(|b| {
                let slug = normalize_slug(b);
                BrandButton {
                    active: self.brand.as_deref() == Some(slug.as_str()),
                    label: b.clone(),
                    slug,
                }
            })
            .collect();
        Ok(BrandFiltersTemplate {
            brands: buttons,
            all_active: self.brand.is_none(),
        }
        .render()?)
    }

    fn set_debounce(&self, handle: Option<JoinHandle<()>>) {
        let previous = std::mem::replace(
            &mut *self.debounce.lock().unwrap_or_else(PoisonError::into_inner),
            handle,
        );
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

fn render_products(
    state: &Mutex<CategoryState>,
    actions: &ProductCardActions,
    view: &View,
) -> Result<()> {
    let visible = {
        let state = state.lock().unwrap_or_else(PoisonError::into_inner);
        filter_and_sort(&state.products, state.price, state.sort)
    };
    view.set("count", count_text(visible.len()))?;
    view.set(
        "grid",
        render_grid(
            &actions.cards(&visible),
            "No products match your filters in this category.",
        )?,
    )
}

#[async_trait]
impl Page for CategoryPage {
    fn name(&self) -> &'static str {
        "category"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        CategoryTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        let title = category_title(&self.slug, self.brand.as_deref());
        view.set_title(title.clone())?;
        view.set("title", title)?;
        view.set("grid", skeleton(12))?;

        let products = self
            .ctx
            .catalog
            .products_by_category(&self.slug, self.brand.as_deref())
            .await;

        // Brand list only reflects the unfiltered category.
        if self.brand.is_none() {
            let brands = available_brands(&products);
            view.set("brands", self.brand_filters(&brands)?)?;
        }
        self.lock().products = products;
        render_products(&self.state, &self.actions, view)
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match event {
            UiEvent::SortBy(value) => {
                self.lock().sort = CategorySort::parse(&value);
                render_products(&self.state, &self.actions, view)?;
            }
            UiEvent::PriceRange { min, max } => {
                let state = Arc::clone(&self.state);
                let actions = self.actions.clone();
                let view = view.clone();
                let delay = self.ctx.filter_debounce;
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    state.lock().unwrap_or_else(PoisonError::into_inner).price =
                        PriceFilter { min, max };
                    if let Err(e) = render_products(&state, &actions, &view) {
                        debug!(error = %e, "Debounced price filter dropped");
                    }
                });
                self.set_debounce(Some(handle));
            }
            UiEvent::SelectBrand(brand) => {
                let base = format!("/category/{}", self.slug);
                let target = match brand.map(|b| normalize_slug(&b)).filter(|b| !b.is_empty()) {
                    Some(slug) => format!("{base}?brand={slug}"),
                    None => base,
                };
                return Ok(Effect::Navigate(target));
            }
            UiEvent::AddToCart { product_id } => {
                let products = self.lock().products.clone();
                self.actions.add_to_cart(&product_id, &products).await;
            }
            UiEvent::ToggleWishlist { product_id } => {
                self.actions.toggle_wishlist(&product_id).await;
                render_products(&self.state, &self.actions, view)?;
            }
            _ => {}
        }
        Ok(Effect::None)
    }

    fn cleanup(&self) {
        self.set_debounce(None);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::product;

    fn prices(products: &[Product]) -> Vec<Decimal> {
        products.iter().map(|p| p.price.amount()).collect()
    }

    #[test]
    fn test_min_price_filter_then_ascending() {
        let list = vec![
            product("a", "A", "X", "B", 30),
            product("b", "B", "X", "B", 10),
            product("c", "C", "X", "B", 20),
        ];
        let filter = PriceFilter {
            min: Some(Decimal::from(15)),
            max: None,
        };
        let result = filter_and_sort(&list, filter, CategorySort::PriceAsc);
        assert_eq!(prices(&result), vec![Decimal::from(20), Decimal::from(30)]);
    }

    #[test]
    fn test_negative_bounds_ignored_and_name_sort() {
        let list = vec![
            product("a", "zeta", "X", "B", 30),
            product("b", "Alpha", "X", "B", 10),
        ];
        let filter = PriceFilter {
            min: Some(Decimal::from(-5)),
            max: Some(Decimal::from(-1)),
        };
        let result = filter_and_sort(&list, filter, CategorySort::NameAsc);
        assert_eq!(result[0].name, "Alpha");
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_titles_brands_and_count() {
        assert_eq!(category_title("electric-scooters", None), "Electric scooters");
        assert_eq!(
            category_title("electric-scooters", Some("tvs")),
            "Electric scooters (TVS)"
        );
        assert_eq!(
            category_title("motorcycles", Some("royal-enfield")),
            "Motorcycles (ROYAL ENFIELD)"
        );
        let list = vec![
            product("a", "A", "X", "TVS", 1),
            product("b", "B", "X", "", 1),
            product("c", "C", "X", "Bajaj", 1),
            product("d", "D", "X", "TVS", 1),
        ];
        assert_eq!(available_brands(&list), vec!["Bajaj", "TVS"]);
        assert_eq!(count_text(1), "Showing 1 product.");
        assert_eq!(count_text(0), "Showing 0 products.");
    }
}
