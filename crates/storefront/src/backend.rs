//! The storefront's view of the hosted backend.
//!
//! Pages and the store talk to [`ShopBackend`] rather than to the REST client
//! directly, so tests can substitute an in-memory implementation.

use async_trait::async_trait;
use aries_mall_core::{Product, ProductId, Quantity, Session, SlideRow, UserId};
use aries_mall_supabase::{Order, SignUpOutcome, SupabaseClient, SupabaseError};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A `cart_items` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRow {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A `wishlist_items` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistRow {
    pub user_id: UserId,
    pub product_id: ProductId,
}

/// Remote tables and auth operations the storefront needs.
#[async_trait]
pub trait ShopBackend: Send + Sync {
    /// The session the backend currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, SupabaseError>;

    /// Receiver notified on every login/logout transition.
    fn session_changes(&self) -> watch::Receiver<Option<Session>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SupabaseError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, SupabaseError>;

    async fn sign_out(&self) -> Result<(), SupabaseError>;

    async fn products(&self) -> Result<Vec<Product>, SupabaseError>;

    /// Products whose category (and brand, if given) match the
    /// case-insensitive patterns.
    async fn products_matching(
        &self,
        category_pattern: &str,
        brand_pattern: Option<&str>,
    ) -> Result<Vec<Product>, SupabaseError>;

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, SupabaseError>;

    /// Active slides, oldest first.
    async fn active_slides(&self) -> Result<Vec<SlideRow>, SupabaseError>;

    async fn cart_rows(&self, user: &UserId) -> Result<Vec<CartRow>, SupabaseError>;

    async fn upsert_cart_row(&self, row: &CartRow) -> Result<(), SupabaseError>;

    async fn update_cart_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<(), SupabaseError>;

    async fn delete_cart_row(&self, user: &UserId, product: &ProductId)
    -> Result<(), SupabaseError>;

    async fn wishlist_rows(&self, user: &UserId) -> Result<Vec<ProductId>, SupabaseError>;

    async fn insert_wishlist_row(&self, row: &WishlistRow) -> Result<(), SupabaseError>;

    async fn delete_wishlist_row(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<(), SupabaseError>;
}

#[derive(Deserialize)]
struct CartSelection {
    product_id: ProductId,
    quantity: Quantity,
}

#[derive(Deserialize)]
struct WishlistSelection {
    product_id: ProductId,
}

#[derive(Serialize)]
struct QuantityPatch {
    quantity: Quantity,
}

#[async_trait]
impl ShopBackend for SupabaseClient {
    async fn current_session(&self) -> Result<Option<Session>, SupabaseError> {
        Ok(self.auth().session())
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.auth().subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SupabaseError> {
        self.auth().sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, SupabaseError> {
        self.auth().sign_up(email, password, full_name).await
    }

    async fn sign_out(&self) -> Result<(), SupabaseError> {
        self.auth().sign_out().await
    }

    async fn products(&self) -> Result<Vec<Product>, SupabaseError> {
        self.from("products").select("*").fetch().await
    }

    async fn products_matching(
        &self,
        category_pattern: &str,
        brand_pattern: Option<&str>,
    ) -> Result<Vec<Product>, SupabaseError> {
        let mut query = self
            .from("products")
            .select("*")
            .ilike("category", category_pattern);
        if let Some(brand) = brand_pattern {
            query = query.ilike("brand", brand);
        }
        query.fetch().await
    }

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, SupabaseError> {
        self.from("products")
            .select("*")
            .eq("id", id)
            .fetch_optional()
            .await
    }

    async fn active_slides(&self) -> Result<Vec<SlideRow>, SupabaseError> {
        self.from("slides")
            .select("*")
            .eq("is_active", true)
            .order("created_at", Order::Ascending)
            .fetch()
            .await
    }

    async fn cart_rows(&self, user: &UserId) -> Result<Vec<CartRow>, SupabaseError> {
        let rows: Vec<CartSelection> = self
            .from("cart_items")
            .select("product_id,quantity")
            .eq("user_id", user)
            .fetch()
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| CartRow {
                user_id: user.clone(),
                product_id: r.product_id,
                quantity: r.quantity,
            })
            .collect())
    }

    async fn upsert_cart_row(&self, row: &CartRow) -> Result<(), SupabaseError> {
        self.from("cart_items")
            .upsert(row, "user_id,product_id")
            .await
    }

    async fn update_cart_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: Quantity,
    ) -> Result<(), SupabaseError> {
        self.from("cart_items")
            .eq("user_id", user)
            .eq("product_id", product)
            .update(&QuantityPatch { quantity })
            .await
    }

    async fn delete_cart_row(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<(), SupabaseError> {
        self.from("cart_items")
            .eq("user_id", user)
            .eq("product_id", product)
            .delete()
            .await
    }

    async fn wishlist_rows(&self, user: &UserId) -> Result<Vec<ProductId>, SupabaseError> {
        let rows: Vec<WishlistSelection> = self
            .from("wishlist_items")
            .select("product_id")
            .eq("user_id", user)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(|r| r.product_id).collect())
    }

    async fn insert_wishlist_row(&self, row: &WishlistRow) -> Result<(), SupabaseError> {
        self.from("wishlist_items").insert(row).await
    }

    async fn delete_wishlist_row(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<(), SupabaseError> {
        self.from("wishlist_items")
            .eq("user_id", user)
            .eq("product_id", product)
            .delete()
            .await
    }
}
