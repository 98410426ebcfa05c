//! Log of uploaded and upscaled media (`media_history`).

use std::sync::Arc;

use aries_mall_core::image::{is_cloudinary_url, with_transform};
use aries_mall_core::{MediaHistoryEntry, MediaKind, NewMediaHistoryEntry};
use aries_mall_storefront::ui::Toasts;
use tracing::{error, info, instrument, warn};

use crate::backend::AdminBackend;

/// Entries shown in the history tab.
pub const HISTORY_LIMIT: usize = 50;

/// Transform for history thumbnails.
pub const HISTORY_THUMBNAIL: &str = "w_100,h_100,c_fill";

pub const CLEAR_PROMPT: &str = "Are you sure you want to PERMANENTLY delete the entire upload history log? The files themselves will remain in Cloudinary.";

/// Thumbnail for an entry; only Cloudinary URLs are transformed.
#[must_use]
pub fn thumbnail_url(url: &str) -> String {
    if is_cloudinary_url(url) {
        with_transform(url, HISTORY_THUMBNAIL)
    } else {
        url.to_owned()
    }
}

#[derive(Clone)]
pub struct MediaHistory {
    backend: Arc<dyn AdminBackend>,
    toasts: Toasts,
}

impl std::fmt::Debug for MediaHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHistory").finish_non_exhaustive()
    }
}

impl MediaHistory {
    #[must_use]
    pub fn new(backend: Arc<dyn AdminBackend>, toasts: Toasts) -> Self {
        Self { backend, toasts }
    }

    /// Records an upload. Failures are logged, never shown.
    #[instrument(skip(self, url))]
    pub async fn save(&self, name: &str, url: &str, kind: MediaKind) {
        let admin_email = self
            .backend
            .session()
            .and_then(|s| s.user.email)
            .unwrap_or_else(|| "unknown".to_owned());
        let entry = NewMediaHistoryEntry {
            file_name: name.to_owned(),
            file_url: url.to_owned(),
            media_type: kind,
            admin_email,
        };
        if let Err(e) = self.backend.insert_media_history(&entry).await {
            warn!(error = %e, "Failed to save media history");
        }
    }

    /// Newest entries first; empty (with an error toast) on failure.
    pub async fn load(&self) -> Vec<MediaHistoryEntry> {
        match self.backend.media_history(HISTORY_LIMIT).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to load media history");
                self.toasts.error("Error", "Could not load history.");
                Vec::new()
            }
        }
    }

    /// Deletes every entry. Returns whether anything was attempted and
    /// succeeded; `confirmed == false` does nothing.
    pub async fn clear(&self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        match self.backend.clear_media_history().await {
            Ok(()) => {
                info!("Media history cleared");
                self.toasts.success("History Cleared", "");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to clear media history");
                self.toasts.error("Error", "Could not clear history.");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aries_mall_core::ToastKind;

    use super::*;
    use crate::testing::FakeAdmin;

    #[test]
    fn test_thumbnail_only_for_cloudinary() {
        assert_eq!(
            thumbnail_url("https://res.cloudinary.com/demo/image/upload/v1/a.png"),
            "https://res.cloudinary.com/demo/image/upload/w_100,h_100,c_fill/v1/a.png"
        );
        assert_eq!(
            thumbnail_url("https://replicate.delivery/out.png"),
            "https://replicate.delivery/out.png"
        );
    }

    #[tokio::test]
    async fn test_save_records_admin_email_or_unknown() {
        let fake = Arc::new(FakeAdmin::new());
        let history = MediaHistory::new(fake.clone(), Toasts::new());

        history.save("a", "https://x/a.png", MediaKind::Upload).await;
        fake.login_as("admin@ariesmall.com");
        history.save("b (4x)", "https://x/b.png", MediaKind::Upscale).await;

        let stored = fake.stored_history();
        assert_eq!(stored[0].admin_email.as_deref(), Some("unknown"));
        assert_eq!(stored[1].admin_email.as_deref(), Some("admin@ariesmall.com"));
        assert_eq!(stored[1].media_type, MediaKind::Upscale);
    }

    #[tokio::test]
    async fn test_save_failure_is_silent() {
        let fake = Arc::new(FakeAdmin::new());
        fake.set_fail_writes(true);
        let toasts = Toasts::new();
        MediaHistory::new(fake.clone(), toasts.clone())
            .save("a", "https://x/a.png", MediaKind::Upload)
            .await;
        assert!(toasts.recent().is_empty());
    }

    #[tokio::test]
    async fn test_load_limits_and_orders() {
        let fake = Arc::new(FakeAdmin::new());
        for i in 0..55 {
            fake.seed_history(&format!("f{i}"), "https://x/f.png", MediaKind::Upload);
        }
        let entries = MediaHistory::new(fake, Toasts::new()).load().await;
        assert_eq!(entries.len(), HISTORY_LIMIT);
        assert_eq!(entries[0].file_name, "f54");
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let fake = Arc::new(FakeAdmin::new());
        fake.seed_history("a", "https://x/a.png", MediaKind::Upload);
        let toasts = Toasts::new();
        let history = MediaHistory::new(fake.clone(), toasts.clone());

        assert!(!history.clear(false).await);
        assert_eq!(fake.stored_history().len(), 1);

        assert!(history.clear(true).await);
        assert!(fake.stored_history().is_empty());
        assert!(toasts.contains(ToastKind::Success, "History Cleared"));

        fake.set_fail_writes(true);
        assert!(!history.clear(true).await);
        assert!(toasts.contains(ToastKind::Error, "Error"));
    }

    #[tokio::test]
    async fn test_load_failure_toasts() {
        let fake = Arc::new(FakeAdmin::new());
        fake.set_fail_reads(true);
        let toasts = Toasts::new();
        assert!(MediaHistory::new(fake, toasts.clone()).load().await.is_empty());
        assert!(toasts.recent()[0].description.as_deref() == Some("Could not load history."));
    }
}
