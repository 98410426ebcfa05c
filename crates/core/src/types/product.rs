//! Catalog products.
//!
//! Products are owned by the backend. The storefront only reads them; the
//! admin product manager writes them through [`ProductDraft`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Default warranty copy shown when a product has none.
pub const DEFAULT_WARRANTY: &str = "Standard manufacturer warranty applies.";

/// A product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    pub price: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// First non-empty image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .map(String::as_str)
            .find(|url| !url.trim().is_empty())
    }

    /// Brand for display, falling back to "Generic".
    #[must_use]
    pub fn brand_label(&self) -> &str {
        let brand = self.brand.trim();
        if brand.is_empty() { "Generic" } else { brand }
    }

    /// Warranty text for display.
    #[must_use]
    pub fn warranty_text(&self) -> &str {
        self.warranty
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .unwrap_or(DEFAULT_WARRANTY)
    }

    /// Case-insensitive substring match over name, category and brand.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        [&self.name, &self.category, &self.brand]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Insert/update payload for the `products` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: Price,
    pub description: String,
    pub images: Vec<String>,
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty: Option<String>,
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            price: product.price,
            description: product.description.clone(),
            images: product.images.clone(),
            features: product.features.clone(),
            warranty: product.warranty.clone(),
        }
    }
}

/// Treats an explicit JSON `null` like a missing field.
///
/// # Errors
///
/// Propagates the inner deserializer's error for values of the wrong type.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
