//! The admin panel's view of the hosted backend.

use async_trait::async_trait;
use aries_mall_core::{
    MediaHistoryEntry, NewMediaHistoryEntry, Product, ProductDraft, ProductId, Session, SlideDraft,
    SlideId, SlideRow,
};
use aries_mall_supabase::{Order, SupabaseClient, SupabaseError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A `system_config` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRow {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Tables and auth operations the admin panel needs.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    fn session(&self) -> Option<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SupabaseError>;

    async fn sign_out(&self) -> Result<(), SupabaseError>;

    /// Every product, newest first.
    async fn products(&self) -> Result<Vec<Product>, SupabaseError>;

    async fn insert_product(&self, draft: &ProductDraft) -> Result<(), SupabaseError>;

    async fn update_product(&self, id: &ProductId, draft: &ProductDraft)
    -> Result<(), SupabaseError>;

    async fn delete_product(&self, id: &ProductId) -> Result<(), SupabaseError>;

    /// Every slide, newest first.
    async fn slides(&self) -> Result<Vec<SlideRow>, SupabaseError>;

    async fn insert_slide(&self, draft: &SlideDraft) -> Result<(), SupabaseError>;

    async fn update_slide(&self, id: &SlideId, draft: &SlideDraft) -> Result<(), SupabaseError>;

    async fn delete_slide(&self, id: &SlideId) -> Result<(), SupabaseError>;

    async fn system_config(&self) -> Result<Vec<ConfigRow>, SupabaseError>;

    async fn insert_media_history(&self, entry: &NewMediaHistoryEntry)
    -> Result<(), SupabaseError>;

    /// The newest `limit` history entries.
    async fn media_history(&self, limit: usize) -> Result<Vec<MediaHistoryEntry>, SupabaseError>;

    /// Deletes every history row.
    async fn clear_media_history(&self) -> Result<(), SupabaseError>;
}

#[async_trait]
impl AdminBackend for SupabaseClient {
    fn session(&self) -> Option<Session> {
        self.auth().session()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SupabaseError> {
        self.auth().sign_in_with_password(email, password).await
    }

    async fn sign_out(&self) -> Result<(), SupabaseError> {
        self.auth().sign_out().await
    }

    async fn products(&self) -> Result<Vec<Product>, SupabaseError> {
        self.from("products")
            .select("*")
            .order("created_at", Order::Descending)
            .fetch()
            .await
    }

    async fn insert_product(&self, draft: &ProductDraft) -> Result<(), SupabaseError> {
        self.from("products").insert(&[draft]).await
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<(), SupabaseError> {
        self.from("products").eq("id", id).update(draft).await
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), SupabaseError> {
        self.from("products").eq("id", id).delete().await
    }

    async fn slides(&self) -> Result<Vec<SlideRow>, SupabaseError> {
        self.from("slides")
            .select("*")
            .order("created_at", Order::Descending)
            .fetch()
            .await
    }

    async fn insert_slide(&self, draft: &SlideDraft) -> Result<(), SupabaseError> {
        self.from("slides").insert(&[draft]).await
    }

    async fn update_slide(&self, id: &SlideId, draft: &SlideDraft) -> Result<(), SupabaseError> {
        self.from("slides").eq("id", id).update(draft).await
    }

    async fn delete_slide(&self, id: &SlideId) -> Result<(), SupabaseError> {
        self.from("slides").eq("id", id).delete().await
    }

    async fn system_config(&self) -> Result<Vec<ConfigRow>, SupabaseError> {
        self.from("system_config").select("key,value").fetch().await
    }

    async fn insert_media_history(
        &self,
        entry: &NewMediaHistoryEntry,
    ) -> Result<(), SupabaseError> {
        self.from("media_history").insert(&[entry]).await
    }

    async fn media_history(&self, limit: usize) -> Result<Vec<MediaHistoryEntry>, SupabaseError> {
        self.from("media_history")
            .select("*")
            .order("created_at", Order::Descending)
            .limit(limit)
            .fetch()
            .await
    }

    async fn clear_media_history(&self) -> Result<(), SupabaseError> {
        // PostgREST refuses an unfiltered DELETE.
        self.from("media_history")
            .neq("id", Uuid::nil())
            .delete()
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&server.uri(), SecretString::from("anon-key")).unwrap()
    }

    #[tokio::test]
    async fn test_products_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 2, "name": "Helmet", "price": 2000, "category": "Accessories"},
                {"id": 1, "name": "Chetak", "price": 115000, "category": "Scooters"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let products = client(&server).await.products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Helmet");
    }

    #[tokio::test]
    async fn test_clear_history_filters_on_nil_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/media_history"))
            .and(query_param("id", "neq.00000000-0000-0000-0000-000000000000"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.clear_media_history().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_history_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/media_history"))
            .and(body_json(json!([{
                "file_name": "hero",
                "file_url": "https://res.cloudinary.com/demo/image/upload/hero.png",
                "media_type": "upload",
                "admin_email": "admin@ariesmall.com"
            }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let entry = NewMediaHistoryEntry {
            file_name: "hero".into(),
            file_url: "https://res.cloudinary.com/demo/image/upload/hero.png".into(),
            media_type: aries_mall_core::MediaKind::Upload,
            admin_email: "admin@ariesmall.com".into(),
        };
        client(&server)
            .await
            .insert_media_history(&entry)
            .await
            .unwrap();
    }
}
