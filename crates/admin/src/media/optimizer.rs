//! `TinyPNG` compression client.
//!
//! `POST {base}shrink` with Basic auth `api:{key}`. A file is sent as its raw
//! bytes with its own content type; a URL is sent as
//! `{"source":{"url":...}}`. The optimized image URL comes back in the
//! `Location` header (or `output.url` in the body).

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use super::staging::StagedSource;
use crate::error::MediaError;

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    input: Option<SizeInfo>,
    output: Option<OutputInfo>,
}

#[derive(Debug, Deserialize)]
struct SizeInfo {
    size: u64,
}

#[derive(Debug, Deserialize)]
struct OutputInfo {
    size: u64,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// A compressed image hosted by `TinyPNG`.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    pub url: String,
    /// Percentage saved, when sizes were reported
    pub saved_percent: Option<f64>,
}

/// Percentage by which `output` is smaller than `input`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compression_ratio(input: u64, output: u64) -> f64 {
    if input == 0 {
        return 0.0;
    }
    (1.0 - output as f64 / input as f64) * 100.0
}

/// `TinyPNG` API client.
#[derive(Clone)]
pub struct TinyPng {
    inner: Arc<TinyPngInner>,
}

struct TinyPngInner {
    client: reqwest::Client,
    shrink_url: Url,
    authorization: SecretString,
}

impl std::fmt::Debug for TinyPng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinyPng")
            .field("shrink_url", &self.inner.shrink_url.as_str())
            .finish_non_exhaustive()
    }
}

impl TinyPng {
    /// # Errors
    ///
    /// Returns `Optimizer` if `base` cannot be joined with `shrink`.
    pub fn new(
        client: reqwest::Client,
        base: &Url,
        api_key: &SecretString,
    ) -> Result<Self, MediaError> {
        let shrink_url = base
            .join("shrink")
            .map_err(|e| MediaError::Optimizer(e.to_string()))?;
        let token = STANDARD.encode(format!("api:{}", api_key.expose_secret()));
        Ok(Self {
            inner: Arc::new(TinyPngInner {
                client,
                shrink_url,
                authorization: SecretString::from(format!("Basic {token}")),
            }),
        })
    }

    /// Compresses a staged image.
    ///
    /// # Errors
    ///
    /// Returns `Optimizer` for a non-success status or a response without a
    /// result URL, `Http` if the request fails.
    #[instrument(skip(self, source), fields(name = source.original_name()))]
    pub async fn shrink(&self, source: &StagedSource) -> Result<Optimized, MediaError> {
        let request = self
            .inner
            .client
            .post(self.inner.shrink_url.clone())
            .header(AUTHORIZATION, self.inner.authorization.expose_secret());
        let request = match source {
            StagedSource::File(file) => request
                .header(CONTENT_TYPE, file.mime.as_str())
                .body(file.bytes.clone()),
            StagedSource::Url(url) => request.json(&json!({ "source": { "url": url } })),
        };
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Request failed");
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(MediaError::Optimizer(
                body.error.unwrap_or_else(|| reason.to_owned()),
            ));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body: Option<ShrinkResponse> = response.json().await.ok();

        let saved_percent = body.as_ref().and_then(|b| match (&b.input, &b.output) {
            (Some(input), Some(output)) => Some(compression_ratio(input.size, output.size)),
            _ => None,
        });
        let url = location
            .or_else(|| body.and_then(|b| b.output).and_then(|o| o.url))
            .ok_or_else(|| {
                MediaError::Optimizer("TinyPNG did not return an optimized image URL.".to_owned())
            })?;

        debug!(saved_percent, "Image optimized");
        Ok(Optimized { url, saved_percent })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::media::staging::StagedFile;

    fn client(server: &MockServer) -> TinyPng {
        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        TinyPng::new(
            reqwest::Client::new(),
            &base,
            &SecretString::from("tiny-key"),
        )
        .unwrap()
    }

    #[test]
    fn test_compression_ratio() {
        assert!((compression_ratio(1000, 250) - 75.0).abs() < f64::EPSILON);
        assert!(compression_ratio(0, 10).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_file_uses_location_header() {
        let server = MockServer::start().await;
        // base64("api:tiny-key")
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .and(header("authorization", "Basic YXBpOnRpbnkta2V5"))
            .and(header("content-type", "image/png"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "https://api.tinify.com/output/abc")
                    .set_body_json(json!({
                        "input": {"size": 2000, "type": "image/png"},
                        "output": {"size": 500, "type": "image/png"}
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let source = StagedSource::File(StagedFile {
            name: "hero.png".into(),
            mime: "image/png".into(),
            bytes: vec![1, 2, 3],
        });
        let out = client(&server).shrink(&source).await.unwrap();
        assert_eq!(out.url, "https://api.tinify.com/output/abc");
        assert!((out.saved_percent.unwrap() - 75.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_url_source_falls_back_to_output_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .and(body_json(json!({"source": {"url": "https://example.com/a.jpg"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "output": {"size": 10, "url": "https://api.tinify.com/output/xyz"}
            })))
            .mount(&server)
            .await;

        let out = client(&server)
            .shrink(&StagedSource::Url("https://example.com/a.jpg".into()))
            .await
            .unwrap();
        assert_eq!(out.url, "https://api.tinify.com/output/xyz");
        assert!(out.saved_percent.is_none());
    }

    #[tokio::test]
    async fn test_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .and(body_json(json!({"source": {"url": "https://example.com/denied.jpg"}})))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .and(body_json(json!({"source": {"url": "https://example.com/empty.jpg"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;

        let tiny = client(&server);
        let err = tiny
            .shrink(&StagedSource::Url("https://example.com/denied.jpg".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "TinyPNG API Error: Unauthorized");

        let err = tiny
            .shrink(&StagedSource::Url("https://example.com/empty.jpg".into()))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TinyPNG API Error: TinyPNG did not return an optimized image URL."
        );
    }
}
