//! Aries Mall backend client.
//!
//! A small typed client for the hosted backend-as-a-service: PostgREST
//! tables under `/rest/v1` and GoTrue auth under `/auth/v1`.
//!
//! ```rust,ignore
//! let client = SupabaseClient::new("https://xyz.supabase.co", anon_key)?;
//! let products: Vec<Product> = client.from("products").select("*").fetch().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod auth;
mod error;
mod query;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

pub use auth::{Auth, SignUpOutcome};
pub use error::SupabaseError;
pub use query::{Order, TableQuery};

/// Client identifier sent with every request.
const CLIENT_INFO: &str = concat!("aries-mall/", env!("CARGO_PKG_VERSION"));

/// Cheaply clonable handle to the backend.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    rest_url: Url,
    anon_key: SecretString,
    auth: Auth,
}

impl SupabaseClient {
    /// Create a client for the project at `project_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the URL cannot be parsed or the key is not a
    /// valid header value, and `Http` if the HTTP client fails to build.
    pub fn new(project_url: &str, anon_key: SecretString) -> Result<Self, SupabaseError> {
        let base = Url::parse(project_url.trim_end_matches('/'))
            .map_err(|e| SupabaseError::InvalidConfig(format!("project URL: {e}")))?;
        let rest_url = join(&base, "rest/v1/")?;
        let auth_url = join(&base, "auth/v1/")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key.expose_secret())
                .map_err(|e| SupabaseError::InvalidConfig(format!("anon key: {e}")))?,
        );
        headers.insert("X-Client-Info", HeaderValue::from_static(CLIENT_INFO));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let auth = Auth::new(http.clone(), auth_url);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                rest_url,
                anon_key,
                auth,
            }),
        })
    }

    /// Start a query against `table`.
    #[must_use]
    pub fn from(&self, table: &str) -> TableQuery {
        TableQuery::new(self.clone(), table)
    }

    /// Authentication API and session state.
    #[must_use]
    pub fn auth(&self) -> &Auth {
        &self.inner.auth
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(crate) fn table_url(&self, table: &str) -> Result<Url, SupabaseError> {
        join(&self.inner.rest_url, table)
    }

    /// Bearer token for table requests: the user's token when signed in,
    /// otherwise the anon key.
    pub(crate) fn bearer(&self) -> String {
        self.inner.auth.session().map_or_else(
            || self.inner.anon_key.expose_secret().to_owned(),
            |s| s.access_token.expose().to_owned(),
        )
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

fn join(base: &Url, path: &str) -> Result<Url, SupabaseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| SupabaseError::InvalidConfig(format!("URL join {path}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_url() {
        let result = SupabaseClient::new("not a url", SecretString::from("key"));
        assert!(matches!(result, Err(SupabaseError::InvalidConfig(_))));
    }

    #[test]
    fn test_table_url_and_bearer() {
        let client =
            SupabaseClient::new("https://abc.supabase.co/", SecretString::from("anon")).unwrap();
        assert_eq!(
            client.table_url("products").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/products"
        );
        assert_eq!(client.bearer(), "anon");
        assert!(!format!("{client:?}").contains("anon\""));
    }
}
