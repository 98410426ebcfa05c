//! `/search?q=`

use std::sync::{Mutex, PoisonError};

use askama::Template;
use async_trait::async_trait;
use aries_mall_core::Product;

use super::cards::{CallToAction, EmptyState, ProductCardActions, render_grid, skeleton};
use super::{Effect, Page, PageContext, UiEvent};
use crate::error::Result;
use crate::outlet::View;

/// Products whose name, category or brand contains `query`, ignoring case.
#[must_use]
pub fn search_products(products: &[Product], query: &str) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.matches_query(query))
        .cloned()
        .collect()
}

/// Message shown when nothing matched.
#[must_use]
pub fn no_results_text(query: &str) -> String {
    format!(
        "Sorry, we couldn't find any products matching \"{query}\". Try a different search term."
    )
}

#[derive(Template)]
#[template(path = "pages/search.html")]
struct SearchTemplate;

#[derive(Template)]
#[template(
    source = r#"Search results for: <span class="search-query-highlight">"{{ query }}"</span>"#,
    ext = "html"
)]
struct SearchTitleTemplate<'a> {
    query: &'a str,
}

pub struct SearchPage {
    query: Option<String>,
    actions: ProductCardActions,
    ctx: PageContext,
    results: Mutex<Vec<Product>>,
}

impl SearchPage {
    #[must_use]
    pub fn new(ctx: PageContext, query: Option<&str>) -> Self {
        Self {
            query: query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_owned),
            actions: ProductCardActions::new(ctx.clone()),
            ctx,
            results: Mutex::new(Vec::new()),
        }
    }

    fn render_results(&self, view: &View) -> Result<()> {
        let cards = self
            .actions
            .cards(&self.results.lock().unwrap_or_else(PoisonError::into_inner));
        view.set("grid", render_grid(&cards, "")?)
    }
}

#[async_trait]
impl Page for SearchPage {
    fn name(&self) -> &'static str {
        "search"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        SearchTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        let Some(query) = self.query.as_deref() else {
            view.set_title("Search | Aries Mall")?;
            view.set("title", "Search")?;
            view.set("count", "Please enter a search term in the header.")?;
            return view.set("grid", "");
        };
        view.set_title(format!("Search: {query} | Aries Mall"))?;
        view.set("title", SearchTitleTemplate { query }.render()?)?;
        view.set("grid", skeleton(8))?;

        let found = search_products(&self.ctx.catalog.products().await, query);
        view.set("count", format!("{} result(s) found.", found.len()))?;
        if found.is_empty() {
            let text = no_results_text(query);
            let empty = EmptyState {
                title: "No Results Found",
                text: &text,
                action: Some(CallToAction {
                    href: "#/",
                    label: "Continue Shopping",
                }),
            }
            .render()?;
            view.set("grid", "")?;
            return view.set("no-results", empty);
        }
        *self.results.lock().unwrap_or_else(PoisonError::into_inner) = found;
        self.render_results(view)
    }

    async fn handle(&self, view: &View, event: UiEvent) -> Result<Effect> {
        match event {
            UiEvent::AddToCart { product_id } => {
                let shown = self
                    .results
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                self.actions.add_to_cart(&product_id, &shown).await;
            }
            UiEvent::ToggleWishlist { product_id } => {
                self.actions.toggle_wishlist(&product_id).await;
                self.render_results(view)?;
            }
            _ => {}
        }
        Ok(Effect::None)
    }
}
