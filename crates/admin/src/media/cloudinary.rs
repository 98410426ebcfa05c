//! Cloudinary unsigned uploads and delivery transforms.

use std::sync::Arc;

use aries_mall_core::image::with_transform;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::staging::StagedSource;
use crate::error::MediaError;

/// A named delivery transform offered after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPreset {
    pub key: &'static str,
    pub label: &'static str,
    /// Empty for the untransformed asset
    pub params: &'static str,
}

pub const TRANSFORM_PRESETS: [TransformPreset; 5] = [
    TransformPreset {
        key: "desktopSlider",
        label: "Desktop Slider",
        params: "w_1920,ar_16:9,c_pad,b_black,e_upscale,q_auto,f_auto",
    },
    TransformPreset {
        key: "mobileSlider",
        label: "Mobile Slider",
        params: "w_800,h_1080,e_upscale,q_auto,f_auto",
    },
    TransformPreset {
        key: "sliderThumbnail",
        label: "Slider Thumbnail",
        params: "w_200,h_200,c_fill,e_upscale,q_auto,f_auto",
    },
    TransformPreset {
        key: "productImage",
        label: "Product Image",
        params: "w_1080,h_1080,c_fill,e_upscale,q_auto,f_auto",
    },
    TransformPreset {
        key: "cloudinaryDefault",
        label: "Cloudinary Default",
        params: "",
    },
];

/// Thumbnail shown next to an upload result.
pub const RESULT_THUMBNAIL: &str = "w_200,h_200,c_fill";

/// `(label, url)` for every preset.
#[must_use]
pub fn preset_urls(secure_url: &str) -> Vec<(&'static str, String)> {
    TRANSFORM_PRESETS
        .iter()
        .map(|p| (p.label, with_transform(secure_url, p.params)))
        .collect()
}

/// A stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Cloudinary upload client.
#[derive(Debug, Clone)]
pub struct Cloudinary {
    inner: Arc<CloudinaryInner>,
}

#[derive(Debug)]
struct CloudinaryInner {
    client: reqwest::Client,
    base: Url,
}

impl Cloudinary {
    #[must_use]
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self {
            inner: Arc::new(CloudinaryInner { client, base }),
        }
    }

    /// Uploads a file or a remote URL with an unsigned preset.
    ///
    /// # Errors
    ///
    /// Returns `Upload` with Cloudinary's message for any status other than
    /// 200, `Http` if the request fails.
    #[instrument(skip(self, source), fields(name = source.original_name()))]
    pub async fn upload(
        &self,
        cloud_name: &str,
        preset: &str,
        source: &StagedSource,
        public_id: Option<&str>,
    ) -> Result<UploadedAsset, MediaError> {
        let url = self
            .inner
            .base
            .join(&format!("{cloud_name}/image/upload"))
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        let form = match source {
            StagedSource::File(file) => {
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.name.clone())
                    .mime_str(&file.mime)?;
                Form::new().part("file", part)
            }
            StagedSource::Url(remote) => Form::new().text("file", remote.clone()),
        };
        let mut form = form.text("upload_preset", preset.to_owned());
        if let Some(public_id) = public_id {
            form = form.text("public_id", public_id.to_owned());
        }

        let response = self.inner.client.post(url).multipart(form).send().await?;
        if response.status().as_u16() != 200 {
            let envelope: ErrorEnvelope = response.json().await.unwrap_or_default();
            return Err(MediaError::Upload(envelope.error.map_or_else(
                || "Cloudinary upload failed".to_owned(),
                |e| e.message,
            )));
        }
        let asset: UploadedAsset = response
            .json()
            .await
            .map_err(|e| MediaError::Upload(format!("Unexpected response: {e}")))?;
        debug!(public_id = %asset.public_id, "Uploaded");
        Ok(asset)
    }
}
