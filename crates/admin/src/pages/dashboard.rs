//! Catalog overview: totals, category distribution and newest products.

use std::collections::HashSet;

use askama::Template;
use aries_mall_core::Product;
use aries_mall_storefront::outlet::View;
use async_trait::async_trait;
use tracing::error;

use super::login::AlertTemplate;
use super::{AdminContext, Page};
use crate::error::Result;

const PLACEHOLDER_IMAGE: &str = "https://placehold.co/60x60/eee/aaa?text=N/A";
const LATEST_COUNT: usize = 5;

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_products: usize,
    pub unique_categories: usize,
    /// `(category, count)`, most products first; ties keep first-seen order
    pub distribution: Vec<(String, usize)>,
    /// Newest first
    pub latest: Vec<Product>,
}

impl DashboardStats {
    /// `products` must already be ordered newest first.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        let mut distribution: Vec<(String, usize)> = Vec::new();
        for product in products {
            match distribution.iter_mut().find(|(c, _)| *c == product.category) {
                Some((_, count)) => *count += 1,
                None => distribution.push((product.category.clone(), 1)),
            }
        }
        distribution.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            total_products: products.len(),
            unique_categories: products
                .iter()
                .map(|p| p.category.as_str())
                .collect::<HashSet<_>>()
                .len(),
            distribution,
            latest: products.iter().take(LATEST_COUNT).cloned().collect(),
        }
    }
}

struct LatestRow {
    name: String,
    category: String,
    image: String,
    price: String,
}

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
struct DashboardTemplate;

#[derive(Template)]
#[template(path = "partials/category_distribution.html")]
struct DistributionTemplate<'a> {
    distribution: &'a [(String, usize)],
}

#[derive(Template)]
#[template(path = "partials/latest_products.html")]
struct LatestTemplate {
    products: Vec<LatestRow>,
}

/// `#/dashboard`
pub struct DashboardPage {
    ctx: AdminContext,
}

impl DashboardPage {
    #[must_use]
    pub const fn new(ctx: AdminContext) -> Self {
        Self { ctx }
    }

    async fn products(&self) -> Vec<Product> {
        let Some(backend) = self.ctx.backend.as_ref() else {
            return Vec::new();
        };
        backend.products().await.unwrap_or_else(|e| {
            error!(error = %e, "Dashboard data fetch failed");
            Vec::new()
        })
    }

    fn render(view: &View, stats: &DashboardStats) -> Result<()> {
        let latest = stats
            .latest
            .iter()
            .map(|p| LatestRow {
                name: p.name.clone(),
                category: p.category.clone(),
                image: p
                    .primary_image()
                    .unwrap_or(PLACEHOLDER_IMAGE)
                    .to_owned(),
                price: p.price.display(),
            })
            .collect();

        view.set("total-products", stats.total_products.to_string())?;
        view.set("total-categories", stats.unique_categories.to_string())?;
        view.set(
            "distribution",
            DistributionTemplate {
                distribution: &stats.distribution,
            }
            .render()?,
        )?;
        view.set("latest", LatestTemplate { products: latest }.render()?)?;
        Ok(())
    }
}

#[async_trait]
impl Page for DashboardPage {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        DashboardTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        let products = self.products().await;
        let stats = DashboardStats::from_products(&products);
        match Self::render(view, &stats) {
            Err(e) if !e.is_stale() => {
                error!(error = %e, "Failed to render dashboard");
                let html = AlertTemplate {
                    kind: "error",
                    message: "A critical error occurred while loading dashboard data.",
                }
                .render()?;
                view.inject(html)?;
                Ok(())
            }
            other => other,
        }
    }
}
