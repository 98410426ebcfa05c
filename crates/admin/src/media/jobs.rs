//! Upload and upscale flows.
//!
//! Each staged item runs through its steps with a status line on the
//! [`ProgressBoard`]; the outcome is reported with a toast and, on success,
//! a history entry.

use std::sync::Arc;

use aries_mall_core::MediaKind;
use aries_mall_core::image::with_transform;
use aries_mall_storefront::ui::Toasts;
use tracing::{error, info, instrument, warn};

use super::cloudinary::{Cloudinary, RESULT_THUMBNAIL, UploadedAsset, preset_urls};
use super::history::MediaHistory;
use super::optimizer::TinyPng;
use super::staging::{StagedItem, StagedSource};
use super::upscaler::{PollPolicy, Replicate, Scale};
use super::ProgressBoard;
use crate::backend::AdminBackend;
use crate::config::Endpoints;
use crate::error::{AdminError, MediaError, Result};
use crate::settings::{
    CLOUDINARY_CLOUD_NAME, CLOUDINARY_UPSCALER_PRESET, IntegrationSettings, REPLICATE_API_TOKEN,
    SettingsCache, UPSCALER_MODEL,
};

/// Name used for upscale jobs started from a URL.
const URL_UPSCALE_NAME: &str = "URL_Upload.jpg";

/// Preview transform of the upscaler's original image.
const ORIGINAL_PREVIEW: &str = "w_400,h_400,c_limit";

/// A finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub name: String,
    pub asset: UploadedAsset,
}

impl UploadResult {
    #[must_use]
    pub fn thumbnail(&self) -> String {
        with_transform(&self.asset.secure_url, RESULT_THUMBNAIL)
    }

    /// `(label, url)` for each delivery preset.
    #[must_use]
    pub fn links(&self) -> Vec<(&'static str, String)> {
        preset_urls(&self.asset.secure_url)
    }
}

/// A finished upscale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleResult {
    pub name: String,
    pub scale: Scale,
    pub original_url: String,
    pub upscaled_url: String,
}

impl UpscaleResult {
    #[must_use]
    pub fn original_preview(&self) -> String {
        with_transform(&self.original_url, ORIGINAL_PREVIEW)
    }
}

/// Shared services of the media hub.
#[derive(Clone)]
pub struct MediaHub {
    settings: SettingsCache,
    toasts: Toasts,
    http: reqwest::Client,
    endpoints: Endpoints,
    poll: PollPolicy,
    progress: ProgressBoard,
    history: MediaHistory,
}

impl std::fmt::Debug for MediaHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHub")
            .field("endpoints", &self.endpoints)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl MediaHub {
    #[must_use]
    pub fn new(
        backend: Arc<dyn AdminBackend>,
        settings: SettingsCache,
        toasts: Toasts,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            settings,
            history: MediaHistory::new(backend, toasts.clone()),
            toasts,
            http: reqwest::Client::new(),
            endpoints,
            poll: PollPolicy::default(),
            progress: ProgressBoard::new(),
        }
    }

    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    #[must_use]
    pub const fn progress(&self) -> &ProgressBoard {
        &self.progress
    }

    #[must_use]
    pub const fn history(&self) -> &MediaHistory {
        &self.history
    }

    #[must_use]
    pub const fn settings(&self) -> &SettingsCache {
        &self.settings
    }

    async fn load_settings(&self) -> Result<Arc<IntegrationSettings>> {
        self.settings.get().await.inspect_err(|e| {
            self.toasts.error("Error", e.user_message());
        })
    }

    /// Optimizes (when a `TinyPNG` key is set) and uploads one item.
    ///
    /// # Errors
    ///
    /// Returns `Settings` or `Media(MissingConfig)` before any work starts,
    /// or the upload's `Media` error. Optimizer failures fall back to the
    /// original image.
    #[instrument(skip(self, item), fields(id = %item.id))]
    pub async fn upload(&self, item: StagedItem) -> Result<UploadResult> {
        let settings = self.load_settings().await?;
        let (cloud, preset) = match settings.upload_target() {
            Ok(target) => target,
            Err(e) => {
                self.toasts
                    .error("Configuration Error", "Cloudinary details are not set.");
                return Err(e.into());
            }
        };

        let name = item.display_name().to_owned();
        let id = item.id.clone();
        self.progress.start(&id, &name, "Initializing...");

        let source = self.optimize(&settings, &item).await;

        self.progress.update(&id, "2/2: Uploading to Cloudinary...");
        let cloudinary = Cloudinary::new(self.http.clone(), self.endpoints.cloudinary.clone());
        let asset = match cloudinary
            .upload(cloud, preset, &source, item.custom_name.as_deref())
            .await
        {
            Ok(asset) => asset,
            Err(e) => {
                error!(error = %e, "Upload failed");
                self.progress.fail(&id, &e.to_string());
                self.toasts.error("Upload Failed", e.to_string());
                return Err(e.into());
            }
        };

        self.progress.finish(&id);
        let final_name = item
            .custom_name
            .clone()
            .unwrap_or_else(|| asset.public_id.clone());
        info!(name = %final_name, "Upload complete");
        self.toasts.success("Upload Complete", final_name.as_str());
        self.history
            .save(&final_name, &asset.secure_url, MediaKind::Upload)
            .await;
        Ok(UploadResult {
            name: final_name,
            asset,
        })
    }

    async fn optimize(&self, settings: &IntegrationSettings, item: &StagedItem) -> StagedSource {
        let Some(key) = settings.tinypng_api_key.as_ref() else {
            self.progress
                .update(&item.id, "Skipping optimization: API key missing.");
            return item.source.clone();
        };
        self.progress
            .update(&item.id, "1/2: Optimizing with TinyPNG...");
        let shrunk = match TinyPng::new(self.http.clone(), &self.endpoints.tinypng, key) {
            Ok(tiny) => tiny.shrink(&item.source).await,
            Err(e) => Err(e),
        };
        match shrunk {
            Ok(optimized) => {
                if let Some(saved) = optimized.saved_percent {
                    self.progress.update(
                        &item.id,
                        format!("1/2: Optimizing with TinyPNG: Optimized! {saved:.1}% smaller."),
                    );
                }
                StagedSource::Url(optimized.url)
            }
            Err(e) => {
                warn!(error = %e, "Optimization failed; uploading original");
                self.progress
                    .update(&item.id, "Optimization skipped. Uploading original...");
                self.toasts.info(
                    "Optimization Skipped",
                    "Image optimizer unavailable. Uploading original.",
                );
                item.source.clone()
            }
        }
    }

    /// Uploads with the upscaler preset (files only), runs the model and
    /// waits for the result.
    ///
    /// # Errors
    ///
    /// Returns `Settings`, a `MissingConfig` for absent credentials, or the
    /// failing step's `Media` error. Every error also marks the progress
    /// line and shows "Upscale Failed".
    #[instrument(skip(self, item), fields(id = %item.id))]
    pub async fn upscale(&self, item: StagedItem, scale: Scale) -> Result<UpscaleResult> {
        let name = match &item.source {
            StagedSource::File(file) => file.name.clone(),
            StagedSource::Url(_) => URL_UPSCALE_NAME.to_owned(),
        };
        self.progress.start(&item.id, &name, "Preparing...");

        match self.run_upscale(&item, &name, scale).await {
            Ok(result) => {
                self.progress.finish(&item.id);
                self.history
                    .save(
                        &format!("{name} ({}x)", scale.factor()),
                        &result.upscaled_url,
                        MediaKind::Upscale,
                    )
                    .await;
                info!(name = %name, "Upscale complete");
                self.toasts.success("Upscale Successful", name.as_str());
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Upscale failed");
                let message = e.user_message();
                self.progress.fail(&item.id, &message);
                self.toasts.error("Upscale Failed", message);
                Err(e)
            }
        }
    }

    async fn run_upscale(&self, item: &StagedItem, name: &str, scale: Scale) -> Result<UpscaleResult> {
        let settings = self.settings.get().await?;
        let token = settings
            .replicate_api_token
            .as_ref()
            .ok_or(MediaError::MissingConfig(REPLICATE_API_TOKEN))?;
        let model = settings
            .upscaler_model
            .as_deref()
            .ok_or(MediaError::MissingConfig(UPSCALER_MODEL))?;

        let public_url = match &item.source {
            StagedSource::Url(url) => url.clone(),
            StagedSource::File(_) => {
                let cloud = settings
                    .cloudinary_cloud_name
                    .as_deref()
                    .ok_or(MediaError::MissingConfig(CLOUDINARY_CLOUD_NAME))?;
                let preset = settings
                    .cloudinary_upscaler_preset
                    .as_deref()
                    .ok_or(MediaError::MissingConfig(CLOUDINARY_UPSCALER_PRESET))?;
                self.progress
                    .update(&item.id, "1/3: Uploading to Cloudinary...");
                Cloudinary::new(self.http.clone(), self.endpoints.cloudinary.clone())
                    .upload(cloud, preset, &item.source, None)
                    .await?
                    .secure_url
            }
        };

        self.progress.update(&item.id, "2/3: Starting AI job...");
        let replicate = Replicate::new(self.http.clone(), &self.endpoints.replicate, token)?;
        let prediction = replicate.start(model, &public_url, scale).await?;
        let status_url = prediction
            .urls
            .map(|u| u.get)
            .ok_or_else(|| AdminError::from(MediaError::Upscale("Prediction has no status URL".to_owned())))?;

        self.progress.update(&item.id, "3/3: AI is processing...");
        let upscaled_url = replicate.poll(&status_url, self.poll).await?;

        Ok(UpscaleResult {
            name: name.to_owned(),
            scale,
            original_url: public_url,
            upscaled_url,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use aries_mall_core::ToastKind;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::media::staging::{PreviewRegistry, StagedFile, StagingArea, UPLOAD_PREFIX, UPSCALE_PREFIX};
    use crate::settings::{
        CLOUDINARY_UPLOAD_PRESET, TINYPNG_API_KEY,
    };
    use crate::testing::FakeAdmin;

    struct Harness {
        fake: Arc<FakeAdmin>,
        toasts: Toasts,
        hub: MediaHub,
    }

    fn harness(server: &MockServer, fake: FakeAdmin) -> Harness {
        let fake = Arc::new(fake);
        let toasts = Toasts::new();
        let settings = SettingsCache::new(fake.clone(), Duration::from_secs(300));
        let hub = MediaHub::new(
            fake.clone(),
            settings,
            toasts.clone(),
            Endpoints::single(&server.uri()).unwrap(),
        )
        .with_poll_policy(PollPolicy {
            initial: Duration::from_millis(1),
            factor: 2,
            max_delay: Duration::from_millis(2),
            max_attempts: 3,
        });
        Harness { fake, toasts, hub }
    }

    fn staged_png(prefix: &'static str, name: &str) -> StagedItem {
        let mut area = StagingArea::new(prefix, PreviewRegistry::new());
        let id = area
            .stage_file(StagedFile {
                name: name.to_owned(),
                mime: "image/png".to_owned(),
                bytes: vec![1, 2, 3],
            })
            .unwrap();
        area.take(&id).unwrap()
    }

    async fn mount_upload(server: &MockServer, public_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": format!("https://res.cloudinary.com/demo/image/upload/v1/{public_id}.png"),
                "public_id": public_id
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_upload_without_optimizer_key() {
        let server = MockServer::start().await;
        mount_upload(&server, "hero").await;
        let h = harness(
            &server,
            FakeAdmin::new()
                .with_config(CLOUDINARY_CLOUD_NAME, "demo")
                .with_config(CLOUDINARY_UPLOAD_PRESET, "unsigned"),
        );

        let result = h.hub.upload(staged_png(UPLOAD_PREFIX, "hero.png")).await.unwrap();
        assert_eq!(result.name, "hero");
        assert_eq!(
            result.thumbnail(),
            "https://res.cloudinary.com/demo/image/upload/w_200,h_200,c_fill/v1/hero.png"
        );
        assert_eq!(result.links().len(), 5);
        assert!(h.toasts.contains(ToastKind::Success, "Upload Complete"));
        assert!(h.hub.progress().snapshot().is_empty());

        let history = h.fake.stored_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].media_type, MediaKind::Upload);
    }

    #[tokio::test]
    async fn test_optimizer_failure_uploads_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "TooManyRequests"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_upload(&server, "hero").await;
        let h = harness(
            &server,
            FakeAdmin::new()
                .with_config(CLOUDINARY_CLOUD_NAME, "demo")
                .with_config(CLOUDINARY_UPLOAD_PRESET, "unsigned")
                .with_config(TINYPNG_API_KEY, "tiny"),
        );

        let mut item = staged_png(UPLOAD_PREFIX, "hero.png");
        item.custom_name = Some("home-hero".to_owned());
        let result = h.hub.upload(item).await.unwrap();
        assert_eq!(result.name, "home-hero");
        assert!(h.toasts.contains(ToastKind::Info, "Optimization Skipped"));
        assert!(h.toasts.contains(ToastKind::Success, "Upload Complete"));
    }

    #[tokio::test]
    async fn test_optimized_url_is_uploaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "https://api.tinify.com/output/opt1"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .and(body_string_contains("https://api.tinify.com/output/opt1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/opt.png",
                "public_id": "opt"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let h = harness(
            &server,
            FakeAdmin::new()
                .with_config(CLOUDINARY_CLOUD_NAME, "demo")
                .with_config(CLOUDINARY_UPLOAD_PRESET, "unsigned")
                .with_config(TINYPNG_API_KEY, "tiny"),
        );

        let result = h.hub.upload(staged_png(UPLOAD_PREFIX, "a.png")).await.unwrap();
        assert_eq!(result.name, "opt");
        assert!(!h.toasts.contains(ToastKind::Info, "Optimization Skipped"));
    }

    #[tokio::test]
    async fn test_upload_requires_cloudinary_settings() {
        let server = MockServer::start().await;
        let h = harness(&server, FakeAdmin::new());
        let err = h
            .hub
            .upload(staged_png(UPLOAD_PREFIX, "a.png"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdminError::Media(MediaError::MissingConfig(CLOUDINARY_CLOUD_NAME))
        ));
        assert!(h.toasts.contains(ToastKind::Error, "Configuration Error"));
    }

    #[tokio::test]
    async fn test_upload_failure_toast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Invalid image file"}
            })))
            .mount(&server)
            .await;
        let h = harness(
            &server,
            FakeAdmin::new()
                .with_config(CLOUDINARY_CLOUD_NAME, "demo")
                .with_config(CLOUDINARY_UPLOAD_PRESET, "unsigned"),
        );
        let item = staged_png(UPLOAD_PREFIX, "a.png");
        let id = item.id.clone();
        assert!(h.hub.upload(item).await.is_err());
        assert!(h.toasts.contains(ToastKind::Error, "Upload Failed"));
        assert_eq!(
            h.hub.progress().get(&id).unwrap().status,
            "Error: Cloudinary error: Invalid image file"
        );
        assert!(h.fake.stored_history().is_empty());
    }

    #[tokio::test]
    async fn test_upscale_file_end_to_end() {
        let server = MockServer::start().await;
        mount_upload(&server, "src").await;
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p1",
                "status": "starting",
                "urls": {"get": format!("{}/v1/predictions/p1", server.uri())}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "output": ["https://replicate.delivery/big.png"]
            })))
            .mount(&server)
            .await;
        let h = harness(
            &server,
            FakeAdmin::new()
                .with_config(CLOUDINARY_CLOUD_NAME, "demo")
                .with_config(CLOUDINARY_UPSCALER_PRESET, "upscale")
                .with_config(REPLICATE_API_TOKEN, "r8")
                .with_config(UPSCALER_MODEL, "model-v1"),
        );

        let result = h
            .hub
            .upscale(staged_png(UPSCALE_PREFIX, "scooter.png"), Scale::X4)
            .await
            .unwrap();
        assert_eq!(result.upscaled_url, "https://replicate.delivery/big.png");
        assert_eq!(
            result.original_preview(),
            "https://res.cloudinary.com/demo/image/upload/w_400,h_400,c_limit/v1/src.png"
        );
        assert!(h.toasts.contains(ToastKind::Success, "Upscale Successful"));
        let history = h.fake.stored_history();
        assert_eq!(history[0].file_name, "scooter.png (4x)");
        assert_eq!(history[0].media_type, MediaKind::Upscale);
    }

    #[tokio::test]
    async fn test_upscale_exhausted_marks_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": "starting",
                "urls": {"get": format!("{}/v1/predictions/p2", server.uri())}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .mount(&server)
            .await;
        let h = harness(
            &server,
            FakeAdmin::new()
                .with_config(REPLICATE_API_TOKEN, "r8")
                .with_config(UPSCALER_MODEL, "model-v1"),
        );

        let mut area = StagingArea::new(UPSCALE_PREFIX, PreviewRegistry::new());
        let id = area.stage_url("https://example.com/a.jpg").unwrap();
        let item = area.take(&id).unwrap();
        let err = h.hub.upscale(item, Scale::X2).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Media(MediaError::PollExhausted { attempts: 3 })
        ));
        let line = h.hub.progress().get(&id).unwrap();
        assert_eq!(line.name, "URL_Upload.jpg");
        assert!(line.status.starts_with("Error: "));
        assert!(h.toasts.contains(ToastKind::Error, "Upscale Failed"));
    }

    #[tokio::test]
    async fn test_upscale_missing_token() {
        let server = MockServer::start().await;
        let h = harness(&server, FakeAdmin::new());
        let err = h
            .hub
            .upscale(staged_png(UPSCALE_PREFIX, "a.png"), Scale::X2)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "REPLICATE_API_TOKEN is not configured");
    }
}
