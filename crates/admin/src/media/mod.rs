//! Media hub: staging, optimization, upload, upscaling and history.
//!
//! - [`staging`] - staged files and URLs with preview handles
//! - [`optimizer`] - `TinyPNG` compression
//! - [`cloudinary`] - unsigned uploads and delivery transforms
//! - [`upscaler`] - Replicate predictions and bounded polling
//! - [`jobs`] - the upload and upscale flows with per-item progress
//! - [`history`] - the `media_history` log

pub mod cloudinary;
pub mod history;
pub mod jobs;
pub mod optimizer;
pub mod staging;
pub mod upscaler;

use std::sync::{Arc, Mutex, PoisonError};

pub use cloudinary::{Cloudinary, TRANSFORM_PRESETS, UploadedAsset};
pub use history::MediaHistory;
pub use jobs::{MediaHub, UploadResult, UpscaleResult};
pub use staging::{PreviewRegistry, StagedFile, StagedItem, StagedSource, StagingArea};
pub use upscaler::{PollPolicy, Scale};

/// Where an item stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressState {
    Running,
    Failed,
}

/// One in-flight item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressItem {
    pub id: String,
    pub name: String,
    pub status: String,
    pub state: ProgressState,
}

impl ProgressItem {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == ProgressState::Failed
    }
}

/// Status lines for items being processed. Finished items are removed;
/// failed items stay with their error.
#[derive(Debug, Clone, Default)]
pub struct ProgressBoard {
    items: Arc<Mutex<Vec<ProgressItem>>>,
}

impl ProgressBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_items<T>(&self, f: impl FnOnce(&mut Vec<ProgressItem>) -> T) -> T {
        f(&mut self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn start(&self, id: &str, name: &str, status: &str) {
        self.with_items(|items| {
            items.retain(|i| i.id != id);
            items.push(ProgressItem {
                id: id.to_owned(),
                name: name.to_owned(),
                status: status.to_owned(),
                state: ProgressState::Running,
            });
        });
    }

    pub fn update(&self, id: &str, status: impl Into<String>) {
        let status = status.into();
        self.with_items(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                item.status = status;
            }
        });
    }

    pub fn fail(&self, id: &str, message: &str) {
        self.with_items(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                item.status = format!("Error: {message}");
                item.state = ProgressState::Failed;
            }
        });
    }

    pub fn finish(&self, id: &str) {
        self.with_items(|items| items.retain(|i| i.id != id));
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProgressItem> {
        self.with_items(|items| items.iter().find(|i| i.id == id).cloned())
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ProgressItem> {
        self.with_items(|items| items.clone())
    }
}
