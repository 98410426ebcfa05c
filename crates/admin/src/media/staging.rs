//! Staging area for images waiting to be uploaded or upscaled.
//!
//! Each staged file holds a preview handle registered in a
//! [`PreviewRegistry`]. The handle is released when the item is discarded,
//! taken for processing and finished, or when the staging area is dropped.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::debug;

use crate::error::{AdminError, MediaError};

/// Id prefix for the uploader.
pub const UPLOAD_PREFIX: &str = "pending";
/// Id prefix for the upscaler.
pub const UPSCALE_PREFIX: &str = "upscale-pending";

/// `{prefix}-{millis}-{9 random alphanumerics}`.
#[must_use]
pub fn staging_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{prefix}-{millis}-{suffix}")
}

/// Guesses an image MIME type from a file extension.
#[must_use]
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// An image read into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    /// Reads a local file, guessing its type from the extension.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_owned();
        Ok(Self {
            name,
            mime: mime_from_path(path).to_owned(),
            bytes,
        })
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// What an item will upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedSource {
    File(StagedFile),
    Url(String),
}

impl StagedSource {
    /// File name, or the last path segment of a URL.
    #[must_use]
    pub fn original_name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Url(url) => url.rsplit('/').next().unwrap_or(url),
        }
    }

    /// The original name without its extension.
    #[must_use]
    pub fn default_name(&self) -> &str {
        let name = self.original_name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }
}

/// Live preview handles.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, id: &str) -> PreviewHandle {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_owned());
        PreviewHandle {
            id: id.to_owned(),
            registry: self.clone(),
        }
    }

    /// Number of handles not yet released.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A preview of a staged file. Released on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    id: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    /// `preview://{id}`
    #[must_use]
    pub fn uri(&self) -> String {
        format!("preview://{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        debug!(id = %self.id, "Preview released");
    }
}

/// One staged image.
#[derive(Debug)]
pub struct StagedItem {
    pub id: String,
    pub source: StagedSource,
    /// Name typed by the admin; blank means none
    pub custom_name: Option<String>,
    preview: Option<PreviewHandle>,
}

impl StagedItem {
    /// Custom name, else the original name without extension.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.custom_name
            .as_deref()
            .unwrap_or_else(|| self.source.default_name())
    }

    /// Preview URI for files; URLs preview themselves.
    #[must_use]
    pub fn preview(&self) -> String {
        match (&self.preview, &self.source) {
            (Some(handle), _) => handle.uri(),
            (None, StagedSource::Url(url)) => url.clone(),
            (None, StagedSource::File(file)) => file.name.clone(),
        }
    }
}

/// Ordered list of staged images.
#[derive(Debug)]
pub struct StagingArea {
    prefix: &'static str,
    items: Vec<StagedItem>,
    previews: PreviewRegistry,
}

impl StagingArea {
    #[must_use]
    pub fn new(prefix: &'static str, previews: PreviewRegistry) -> Self {
        Self {
            prefix,
            items: Vec::new(),
            previews,
        }
    }

    /// Stages an image file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFileType` for a non-image MIME type.
    pub fn stage_file(&mut self, file: StagedFile) -> Result<String, MediaError> {
        if !file.is_image() {
            return Err(MediaError::InvalidFileType(file.name));
        }
        let id = staging_id(self.prefix);
        let preview = Some(self.previews.open(&id));
        self.items.push(StagedItem {
            id: id.clone(),
            source: StagedSource::File(file),
            custom_name: None,
            preview,
        });
        Ok(id)
    }

    /// Stages an image URL.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank URL.
    pub fn stage_url(&mut self, url: &str) -> Result<String, AdminError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AdminError::Validation(
                "Please enter a valid image URL.".to_owned(),
            ));
        }
        let id = staging_id(self.prefix);
        self.items.push(StagedItem {
            id: id.clone(),
            source: StagedSource::Url(url.to_owned()),
            custom_name: None,
            preview: None,
        });
        Ok(id)
    }

    /// Sets the custom name; blank clears it.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        self.items.iter_mut().find(|i| i.id == id).is_some_and(|item| {
            item.custom_name = (!name.is_empty()).then(|| name.to_owned());
            true
        })
    }

    /// Removes an item, releasing its preview.
    pub fn discard(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        before != self.items.len()
    }

    /// Removes an item for processing. Its preview lives until the returned
    /// item is dropped.
    pub fn take(&mut self, id: &str) -> Option<StagedItem> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Removes every item, in staging order.
    pub fn take_all(&mut self) -> Vec<StagedItem> {
        std::mem::take(&mut self.items)
    }

    #[must_use]
    pub fn items(&self) -> &[StagedItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png(name: &str) -> StagedFile {
        StagedFile {
            name: name.to_owned(),
            mime: "image/png".to_owned(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_staging_id_shape() {
        let id = staging_id(UPLOAD_PREFIX);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "pending");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));

        assert!(staging_id(UPSCALE_PREFIX).starts_with("upscale-pending-"));
    }

    #[test]
    fn test_rejects_non_images() {
        let mut area = StagingArea::new(UPLOAD_PREFIX, PreviewRegistry::new());
        let err = area
            .stage_file(StagedFile {
                name: "notes.txt".into(),
                mime: "text/plain".into(),
                bytes: Vec::new(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "File \"notes.txt\" is not an image.");
        assert!(area.is_empty());
        assert!(area.stage_url("   ").is_err());
    }

    #[test]
    fn test_previews_released_on_discard_and_drop() {
        let registry = PreviewRegistry::new();
        let mut area = StagingArea::new(UPLOAD_PREFIX, registry.clone());
        let a = area.stage_file(png("a.png")).unwrap();
        area.stage_file(png("b.png")).unwrap();
        area.stage_url("https://example.com/c.jpg").unwrap();
        assert_eq!(registry.live(), 2);

        assert!(area.discard(&a));
        assert_eq!(registry.live(), 1);

        drop(area);
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_display_name() {
        let mut area = StagingArea::new(UPLOAD_PREFIX, PreviewRegistry::new());
        let id = area.stage_file(png("hero.banner.png")).unwrap();
        assert_eq!(area.items()[0].display_name(), "hero.banner");

        area.rename(&id, "  home-hero ");
        assert_eq!(area.items()[0].display_name(), "home-hero");
        area.rename(&id, "");
        assert_eq!(area.items()[0].display_name(), "hero.banner");

        area.stage_url("https://cdn.example.com/img/scooter").unwrap();
        assert_eq!(area.items()[1].display_name(), "scooter");
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(mime_from_path(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_from_path(Path::new("a.pdf")), "application/octet-stream");
    }
}
