//! Replicate prediction client and bounded status polling.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::MediaError;

/// Upscale factors the model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    X2,
    X4,
}

impl Scale {
    #[must_use]
    pub const fn factor(self) -> u8 {
        match self {
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// `2` or `4`.
    #[must_use]
    pub const fn from_factor(factor: u8) -> Option<Self> {
        match factor {
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            _ => None,
        }
    }
}

/// Delays between status checks: exponential, capped, bounded in count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(3),
            factor: 2,
            max_delay: Duration::from_secs(30),
            max_attempts: 20,
        }
    }
}

impl PollPolicy {
    /// The wait before each attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let (factor, max_delay) = (self.factor, self.max_delay);
        std::iter::successors(Some(self.initial.min(max_delay)), move |d| {
            Some(d.saturating_mul(factor).min(max_delay))
        })
        .take(self.max_attempts as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Model output: one URL or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    One(String),
    Many(Vec<String>),
}

impl PredictionOutput {
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::One(url) => Some(url),
            Self::Many(urls) => urls.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionUrls {
    pub get: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<String>,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<PredictionOutput>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub urls: Option<PredictionUrls>,
}

impl Prediction {
    fn error_text(&self) -> String {
        match &self.error {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null) | None => "Unknown".to_owned(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Replicate API client.
#[derive(Clone)]
pub struct Replicate {
    inner: Arc<ReplicateInner>,
}

struct ReplicateInner {
    client: reqwest::Client,
    predictions_url: Url,
    authorization: SecretString,
}

impl std::fmt::Debug for Replicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replicate")
            .field("predictions_url", &self.inner.predictions_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Replicate {
    /// # Errors
    ///
    /// Returns `Upscale` if `base` cannot be joined with `predictions`.
    pub fn new(client: reqwest::Client, base: &Url, token: &SecretString) -> Result<Self, MediaError> {
        let predictions_url = base
            .join("predictions")
            .map_err(|e| MediaError::Upscale(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(ReplicateInner {
                client,
                predictions_url,
                authorization: SecretString::from(format!("Token {}", token.expose_secret())),
            }),
        })
    }

    async fn api_error(response: reqwest::Response) -> MediaError {
        let status = response.status().as_u16();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        MediaError::Upscale(format!(
            "({status}) {}",
            body.detail.as_deref().unwrap_or("Unknown Replicate Error")
        ))
    }

    /// Submits a prediction. Replicate answers 201 with the job.
    ///
    /// # Errors
    ///
    /// Returns `Upscale` for any other status or a job without a status URL.
    #[instrument(skip(self, model))]
    pub async fn start(
        &self,
        model: &str,
        image_url: &str,
        scale: Scale,
    ) -> Result<Prediction, MediaError> {
        let response = self
            .inner
            .client
            .post(self.inner.predictions_url.clone())
            .header(AUTHORIZATION, self.inner.authorization.expose_secret())
            .json(&json!({
                "version": model,
                "input": { "img": image_url, "scale": scale.factor() }
            }))
            .send()
            .await?;
        if response.status().as_u16() != 201 {
            return Err(Self::api_error(response).await);
        }
        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| MediaError::Upscale(format!("Unexpected response: {e}")))?;
        if prediction.urls.is_none() {
            return Err(MediaError::Upscale("Prediction has no status URL".to_owned()));
        }
        debug!(id = ?prediction.id, "Prediction started");
        Ok(prediction)
    }

    /// One status check.
    ///
    /// # Errors
    ///
    /// Returns `Upscale` for a non-success status or an unreadable body.
    pub async fn status(&self, status_url: &str) -> Result<Prediction, MediaError> {
        let response = self
            .inner
            .client
            .get(status_url)
            .header(AUTHORIZATION, self.inner.authorization.expose_secret())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| MediaError::Upscale(format!("Status check failed: {e}")))
    }

    /// Polls until the job ends, returning the output URL.
    ///
    /// # Errors
    ///
    /// Returns `JobFailed` for `failed`/`canceled` (or success without
    /// output), `PollExhausted` when the policy runs out, and the status
    /// check's error otherwise.
    #[instrument(skip(self, policy))]
    pub async fn poll(&self, status_url: &str, policy: PollPolicy) -> Result<String, MediaError> {
        for (attempt, delay) in policy.delays().enumerate() {
            tokio::time::sleep(delay).await;
            let prediction = self.status(status_url).await?;
            match prediction.status {
                PredictionStatus::Succeeded => {
                    return prediction
                        .output
                        .as_ref()
                        .and_then(PredictionOutput::url)
                        .map(str::to_owned)
                        .ok_or_else(|| MediaError::JobFailed("No output returned".to_owned()));
                }
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    return Err(MediaError::JobFailed(prediction.error_text()));
                }
                PredictionStatus::Unknown => {
                    warn!(attempt, "Unrecognized prediction status");
                }
                PredictionStatus::Starting | PredictionStatus::Processing => {
                    debug!(attempt, "Still processing");
                }
            }
        }
        Err(MediaError::PollExhausted {
            attempts: policy.max_attempts,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> Replicate {
        Replicate::new(
            reqwest::Client::new(),
            &Url::parse(&format!("{}/v1/", server.uri())).unwrap(),
            &SecretString::from("r8_token"),
        )
        .unwrap()
    }

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            initial: Duration::from_millis(1),
            factor: 2,
            max_delay: Duration::from_millis(4),
            max_attempts,
        }
    }

    #[test]
    fn test_default_policy_delays() {
        let delays: Vec<u64> = PollPolicy::default()
            .delays()
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays.len(), 20);
        assert_eq!(&delays[..6], &[3, 6, 12, 24, 30, 30]);
        assert!(delays.iter().all(|d| *d <= 30));
    }

    #[test]
    fn test_output_shapes() {
        let one: PredictionOutput = serde_json::from_value(json!("https://x/a.png")).unwrap();
        let many: PredictionOutput =
            serde_json::from_value(json!(["https://x/b.png", "https://x/c.png"])).unwrap();
        assert_eq!(one.url(), Some("https://x/a.png"));
        assert_eq!(many.url(), Some("https://x/b.png"));
    }

    #[tokio::test]
    async fn test_start_requires_201() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(header("authorization", "Token r8_token"))
            .and(body_json(json!({
                "version": "model-v1",
                "input": {"img": "https://res.cloudinary.com/demo/a.png", "scale": 4}
            })))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "detail": "Invalid version or not permitted"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .start("model-v1", "https://res.cloudinary.com/demo/a.png", Scale::X4)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "API Error: (422) Invalid version or not permitted"
        );
    }

    #[tokio::test]
    async fn test_poll_until_succeeded() {
        let server = MockServer::start().await;
        let status_url = format!("{}/v1/predictions/p1", server.uri());
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "output": "https://replicate.delivery/out.png"
            })))
            .mount(&server)
            .await;

        let url = client(&server).poll(&status_url, fast(5)).await.unwrap();
        assert_eq!(url, "https://replicate.delivery/out.png");
    }

    #[tokio::test]
    async fn test_poll_failed_and_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed", "error": "CUDA out of memory"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "starting"})))
            .expect(3)
            .mount(&server)
            .await;

        let replicate = client(&server);
        let err = replicate
            .poll(&format!("{}/v1/predictions/bad", server.uri()), fast(5))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "AI failed: CUDA out of memory");

        let err = replicate
            .poll(&format!("{}/v1/predictions/slow", server.uri()), fast(3))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::PollExhausted { attempts: 3 }));
    }
}
