//! Read-only catalog queries.
//!
//! Every lookup degrades to an empty list or `None` when the backend is
//! missing or fails, logging the failure; pages render their empty states
//! instead of erroring.

use std::sync::Arc;

use aries_mall_core::slug::slug_to_ilike_pattern;
use aries_mall_core::{HeroSlide, Product, ProductId};
use tracing::{error, instrument};

use crate::backend::ShopBackend;

/// Maximum number of related products shown on a detail page.
pub const RELATED_LIMIT: usize = 4;

/// Catalog facade over the optional backend.
#[derive(Clone)]
pub struct Catalog {
    backend: Option<Arc<dyn ShopBackend>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("has_backend", &self.backend.is_some())
            .finish()
    }
}

impl Catalog {
    #[must_use]
    pub fn new(backend: Option<Arc<dyn ShopBackend>>) -> Self {
        Self { backend }
    }

    /// Active hero slides, oldest first.
    #[instrument(skip(self))]
    pub async fn hero_slides(&self) -> Vec<HeroSlide> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        match backend.active_slides().await {
            Ok(rows) => rows.into_iter().map(HeroSlide::from).collect(),
            Err(e) => {
                error!(error = %e, "Failed to load hero slides");
                Vec::new()
            }
        }
    }

    /// Every product.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Vec<Product> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        backend.products().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to load products");
            Vec::new()
        })
    }

    /// Distinct non-empty categories in first-seen order.
    pub async fn categories(&self) -> Vec<String> {
        distinct_categories(&self.products().await)
    }

    /// Products whose category matches `slug`, optionally narrowed to a brand.
    ///
    /// Matching is case-insensitive and hyphens stand for any single
    /// character, so `electric-scooters` finds "Electric Scooters".
    #[instrument(skip(self))]
    pub async fn products_by_category(&self, slug: &str, brand: Option<&str>) -> Vec<Product> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        let category = slug_to_ilike_pattern(slug);
        let brand = brand.map(slug_to_ilike_pattern);
        backend
            .products_matching(&category, brand.as_deref())
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, slug, "Failed to load category products");
                Vec::new()
            })
    }

    #[instrument(skip(self))]
    pub async fn product(&self, id: &ProductId) -> Option<Product> {
        let backend = self.backend.as_ref()?;
        backend.product(id).await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to load product");
            None
        })
    }

    /// Up to [`RELATED_LIMIT`] other products from the same category.
    pub async fn related_products(&self, product: &Product) -> Vec<Product> {
        if product.category.trim().is_empty() {
            return Vec::new();
        }
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        let pattern = slug_to_ilike_pattern(&product.category);
        match backend.products_matching(&pattern, None).await {
            Ok(products) => products
                .into_iter()
                .filter(|p| p.id != product.id)
                .take(RELATED_LIMIT)
                .collect(),
            Err(e) => {
                error!(error = %e, "Failed to load related products");
                Vec::new()
            }
        }
    }
}

/// Distinct non-empty categories in first-seen order.
#[must_use]
pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in products.iter().map(|p| p.category.trim()) {
        if !category.is_empty() && !seen.iter().any(|c| c == category) {
            seen.push(category.to_owned());
        }
    }
    seen
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{FakeShop, product};

    fn shop() -> Arc<FakeShop> {
        Arc::new(FakeShop::new().with_products([
            product("1", "Chetak", "Electric Scooters", "Bajaj", 100_000),
            product("2", "iQube", "Electric Scooters", "TVS", 110_000),
            product("3", "Helmet", "Accessories", "Steelbird", 2_000),
            product("4", "Mystery", "", "", 10),
        ]))
    }

    #[tokio::test]
    async fn test_categories_are_distinct_in_first_seen_order() {
        let catalog = Catalog::new(Some(shop()));
        assert_eq!(
            catalog.categories().await,
            vec!["Electric Scooters", "Accessories"]
        );
    }

    #[tokio::test]
    async fn test_slug_matches_category_case_insensitively() {
        let catalog = Catalog::new(Some(shop()));
        let found = catalog.products_by_category("electric-scooters", None).await;
        assert_eq!(found.len(), 2);

        let tvs = catalog
            .products_by_category("electric-scooters", Some("tvs"))
            .await;
        assert_eq!(tvs.len(), 1);
        assert_eq!(tvs[0].name, "iQube");
    }

    #[tokio::test]
    async fn test_related_excludes_self() {
        let catalog = Catalog::new(Some(shop()));
        let chetak = catalog.product(&ProductId::new("1")).await.unwrap();
        let related = catalog.related_products(&chetak).await;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_degrades_without_backend_or_on_error() {
        let offline = Catalog::new(None);
        assert!(offline.products().await.is_empty());
        assert!(offline.product(&ProductId::new("1")).await.is_none());

        let shop = shop();
        shop.set_fail_reads(true);
        let failing = Catalog::new(Some(shop));
        assert!(failing.products().await.is_empty());
        assert!(failing.hero_slides().await.is_empty());
    }
}
