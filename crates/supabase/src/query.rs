//! PostgREST query builder.
//!
//! Filters accumulate as query-string pairs (`column=op.value`); the terminal
//! methods pick the HTTP verb. Duplicate keys are kept, so two filters on the
//! same column both apply.

use std::fmt::Display;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::SupabaseClient;
use crate::error::{ErrorBody, SupabaseError};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// A query against one table.
#[must_use = "queries do nothing until a terminal method is awaited"]
pub struct TableQuery {
    client: SupabaseClient,
    table: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    pub(crate) fn new(client: SupabaseClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_owned(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_owned(), value));
        self
    }

    /// Columns to return (`*` for all).
    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns.to_owned())
    }

    /// `column = value`.
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    /// `column <> value`.
    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("neq.{value}"))
    }

    /// Case-insensitive `LIKE`.
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.param(column, format!("ilike.{pattern}"))
    }

    pub fn order(self, column: &str, order: Order) -> Self {
        self.param("order", format!("{column}.{}", order.as_str()))
    }

    pub fn limit(self, count: usize) -> Self {
        self.param("limit", count.to_string())
    }

    /// Query-string pairs accumulated so far.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Runs a `GET` and decodes every row.
    ///
    /// # Errors
    ///
    /// Returns `Api` for non-2xx responses and `Parse` if rows do not decode.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, SupabaseError> {
        let response = self.request(Method::GET)?.send().await?;
        let response = check(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SupabaseError::Parse(format!("{} rows: {e}", self.table)))
    }

    /// Runs a `GET` limited to one row.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, SupabaseError> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// `POST` one row or an array of rows.
    ///
    /// # Errors
    ///
    /// Returns `Api` for non-2xx responses.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn insert<B: Serialize + Sync>(self, body: &B) -> Result<(), SupabaseError> {
        let response = self
            .request(Method::POST)?
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    /// `POST` and decode the inserted rows.
    ///
    /// # Errors
    ///
    /// Returns `Api` for non-2xx responses and `Parse` if rows do not decode.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn insert_returning<B, T>(self, body: &B) -> Result<Vec<T>, SupabaseError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST)?
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SupabaseError::Parse(format!("{} insert: {e}", self.table)))
    }

    /// `POST` merging rows that collide on `on_conflict` columns.
    ///
    /// # Errors
    ///
    /// Returns `Api` for non-2xx responses.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn upsert<B: Serialize + Sync>(
        self,
        body: &B,
        on_conflict: &str,
    ) -> Result<(), SupabaseError> {
        let response = self
            .param("on_conflict", on_conflict.to_owned())
            .request(Method::POST)?
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    /// `PATCH` every row matching the filters.
    ///
    /// # Errors
    ///
    /// Returns `Api` for non-2xx responses.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn update<B: Serialize + Sync>(self, body: &B) -> Result<(), SupabaseError> {
        let response = self
            .request(Method::PATCH)?
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    /// `DELETE` every row matching the filters.
    ///
    /// # Errors
    ///
    /// Returns `Api` for non-2xx responses.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(self) -> Result<(), SupabaseError> {
        let response = self.request(Method::DELETE)?.send().await?;
        check(response).await.map(drop)
    }

    fn request(&self, method: Method) -> Result<RequestBuilder, SupabaseError> {
        let url = self.client.table_url(&self.table)?;
        Ok(self
            .client
            .http()
            .request(method, url)
            .bearer_auth(self.client.bearer())
            .query(&self.params))
    }
}

/// Turns a non-2xx response into `SupabaseError::Api`.
pub(crate) async fn check(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    Err(SupabaseError::Api {
        status: status.as_u16(),
        message: ErrorBody::extract(&raw),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde::Deserialize;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i64,
        name: String,
    }

    async fn client(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&server.uri(), SecretString::from("anon-key")).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_filters_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("select", "*"))
            .and(query_param("category", "ilike.electric_scooters"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 1, "name": "Chetak"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Row> = client(&server)
            .await
            .from("products")
            .select("*")
            .ilike("category", "electric_scooters")
            .order("created_at", Order::Descending)
            .fetch()
            .await
            .unwrap();

        assert_eq!(rows, vec![Row { id: 1, name: "Chetak".into() }]);
    }

    #[tokio::test]
    async fn test_fetch_optional_returns_none_for_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let row: Option<Row> = client(&server)
            .await
            .from("products")
            .eq("id", 99)
            .fetch_optional()
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_upsert_sets_conflict_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/cart_items"))
            .and(query_param("on_conflict", "user_id,product_id"))
            .and(body_json(serde_json::json!({"user_id": "u1", "product_id": "5", "quantity": 2})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .from("cart_items")
            .upsert(
                &serde_json::json!({"user_id": "u1", "product_id": "5", "quantity": 2}),
                "user_id,product_id",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/wishlist_items"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"message": "permission denied"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .from("wishlist_items")
            .eq("user_id", "u1")
            .delete()
            .await
            .unwrap_err();

        match err {
            SupabaseError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
