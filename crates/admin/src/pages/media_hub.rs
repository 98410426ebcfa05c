//! Media hub: uploader, upscaler and history tabs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use askama::Template;
use aries_mall_core::MediaHistoryEntry;
use aries_mall_storefront::outlet::View;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::{AdminContext, AdminEvent, Effect, MediaTab, Page};
use crate::error::{AdminError, Result};
use crate::media::history::{CLEAR_PROMPT, thumbnail_url};
use crate::media::staging::{UPLOAD_PREFIX, UPSCALE_PREFIX};
use crate::media::{
    PreviewRegistry, ProgressItem, Scale, StagedFile, StagedItem, StagingArea,
    UploadResult, UpscaleResult,
};

const HISTORY_DATE_FORMAT: &str = "%b %d, %Y %H:%M";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TabLink {
    key: &'static str,
    label: &'static str,
    active: bool,
}

struct StagedRow {
    id: String,
    name: String,
    preview: String,
}

impl From<&StagedItem> for StagedRow {
    fn from(item: &StagedItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.display_name().to_owned(),
            preview: item.preview(),
        }
    }
}

struct HistoryRow {
    name: String,
    url: String,
    thumbnail: String,
    kind: &'static str,
    date: String,
}

impl From<&MediaHistoryEntry> for HistoryRow {
    fn from(entry: &MediaHistoryEntry) -> Self {
        Self {
            name: entry.file_name.clone(),
            url: entry.file_url.clone(),
            thumbnail: thumbnail_url(&entry.file_url),
            kind: entry.media_type.as_str(),
            date: entry
                .created_at
                .map(|at| at.format(HISTORY_DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "pages/media_hub.html")]
struct MediaHubTemplate;

#[derive(Template)]
#[template(path = "partials/media_tabs.html")]
struct TabsTemplate {
    tabs: Vec<TabLink>,
}

#[derive(Template)]
#[template(path = "partials/staged_list.html")]
struct StagedTemplate {
    items: Vec<StagedRow>,
}

#[derive(Template)]
#[template(path = "partials/progress_list.html")]
struct ProgressTemplate {
    items: Vec<ProgressItem>,
}

#[derive(Template)]
#[template(path = "partials/upload_results.html")]
struct UploadResultsTemplate<'a> {
    results: &'a [UploadResult],
}

#[derive(Template)]
#[template(path = "partials/upscale_results.html")]
struct UpscaleResultsTemplate<'a> {
    results: &'a [UpscaleResult],
}

#[derive(Template)]
#[template(path = "partials/history_list.html")]
struct HistoryTemplate {
    entries: Vec<HistoryRow>,
}

/// `#/media-hub`
pub struct MediaHubPage {
    ctx: AdminContext,
    tab: Mutex<MediaTab>,
    uploads: Mutex<StagingArea>,
    upscales: Mutex<StagingArea>,
    uploaded: Mutex<Vec<UploadResult>>,
    upscaled: Mutex<Vec<UpscaleResult>>,
    previews: PreviewRegistry,
}

impl MediaHubPage {
    #[must_use]
    pub fn new(ctx: AdminContext) -> Self {
        let previews = PreviewRegistry::new();
        Self {
            ctx,
            tab: Mutex::new(MediaTab::default()),
            uploads: Mutex::new(StagingArea::new(UPLOAD_PREFIX, previews.clone())),
            upscales: Mutex::new(StagingArea::new(UPSCALE_PREFIX, previews.clone())),
            uploaded: Mutex::new(Vec::new()),
            upscaled: Mutex::new(Vec::new()),
            previews,
        }
    }

    /// Preview handles still held by staged items.
    #[must_use]
    pub fn live_previews(&self) -> usize {
        self.previews.live()
    }

    fn render_tabs(&self, view: &View) -> Result<()> {
        let current = *lock(&self.tab);
        let tabs = [
            (MediaTab::Uploader, "uploader", "Uploader"),
            (MediaTab::Upscaler, "upscaler", "AI Upscaler"),
            (MediaTab::History, "history", "History"),
        ]
        .into_iter()
        .map(|(tab, key, label)| TabLink {
            key,
            label,
            active: tab == current,
        })
        .collect();
        view.set("tabs", TabsTemplate { tabs }.render()?)?;
        Ok(())
    }

    fn render_staging(&self, view: &View) -> Result<()> {
        let uploads = lock(&self.uploads).items().iter().map(StagedRow::from).collect();
        let upscales = lock(&self.upscales).items().iter().map(StagedRow::from).collect();
        view.set("staged-uploads", StagedTemplate { items: uploads }.render()?)?;
        view.set("staged-upscales", StagedTemplate { items: upscales }.render()?)?;
        Ok(())
    }

    fn render_progress(&self, view: &View) -> Result<()> {
        let items = self.ctx.media()?.progress().snapshot();
        view.set("progress", ProgressTemplate { items }.render()?)?;
        Ok(())
    }

    fn render_results(&self, view: &View) -> Result<()> {
        let html = UploadResultsTemplate {
            results: &lock(&self.uploaded),
        }
        .render()?;
        view.set("upload-results", html)?;
        let html = UpscaleResultsTemplate {
            results: &lock(&self.upscaled),
        }
        .render()?;
        view.set("upscale-results", html)?;
        Ok(())
    }

    async fn render_history(&self, view: &View) -> Result<()> {
        let entries = self.ctx.media()?.history().load().await;
        let entries = entries.iter().map(HistoryRow::from).collect();
        view.set("history", HistoryTemplate { entries }.render()?)?;
        Ok(())
    }

    fn render_all(&self, view: &View) -> Result<()> {
        self.render_tabs(view)?;
        self.render_staging(view)?;
        self.render_progress(view)?;
        self.render_results(view)
    }

    fn stage_file(&self, area: &Mutex<StagingArea>, file: StagedFile) {
        if let Err(e) = lock(area).stage_file(file) {
            self.ctx.toasts.error("Invalid File Type", e.to_string());
        }
    }

    fn stage_url(&self, area: &Mutex<StagingArea>, url: &str) {
        if let Err(e) = lock(area).stage_url(url) {
            self.ctx.toasts.error("Invalid URL", e.user_message());
        }
    }

    async fn upload(&self, items: Vec<StagedItem>) -> Result<()> {
        let media = self.ctx.media()?;
        let outcomes = join_all(items.into_iter().map(|item| media.upload(item))).await;
        for outcome in outcomes {
            match outcome {
                Ok(result) => lock(&self.uploaded).insert(0, result),
                Err(e) => debug!(error = %e, "Upload did not complete"),
            }
        }
        Ok(())
    }

    async fn upscale(&self, scale: Scale) -> Result<()> {
        let items = lock(&self.upscales).take_all();
        if items.is_empty() {
            self.ctx.toasts.error(
                "No Images Added",
                "Please add images to the staging area first.",
            );
            return Ok(());
        }
        let media = self.ctx.media()?;
        let outcomes = join_all(items.into_iter().map(|item| media.upscale(item, scale))).await;
        for outcome in outcomes {
            match outcome {
                Ok(result) => lock(&self.upscaled).insert(0, result),
                Err(e) => debug!(error = %e, "Upscale did not complete"),
            }
        }
        Ok(())
    }

    async fn clear_history(&self, view: &View) -> Result<()> {
        let confirmed = self.ctx.confirm.confirm(CLEAR_PROMPT);
        if self.ctx.media()?.history().clear(confirmed).await {
            self.render_history(view).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Page for MediaHubPage {
    fn name(&self) -> &'static str {
        "media-hub"
    }

    fn template(&self) -> std::result::Result<String, askama::Error> {
        MediaHubTemplate.render()
    }

    async fn init(&self, view: &View) -> Result<()> {
        if self.ctx.media.is_none() {
            warn!("Media hub opened without a backend");
        }
        view.set("history", "")?;
        match self.render_all(view) {
            Err(AdminError::Validation(message)) => {
                self.ctx.toasts.error("Error", message);
                Ok(())
            }
            other => other,
        }
    }

    async fn handle(&self, view: &View, event: AdminEvent) -> Result<Effect> {
        match event {
            AdminEvent::SelectTab(tab) => {
                *lock(&self.tab) = tab;
                if tab == MediaTab::History {
                    self.render_history(view).await?;
                }
            }
            AdminEvent::StageFile(file) => self.stage_file(&self.uploads, file),
            AdminEvent::StageUrl(url) => self.stage_url(&self.uploads, &url),
            AdminEvent::RenameStaged { id, name } => {
                lock(&self.uploads).rename(&id, &name);
            }
            AdminEvent::DiscardStaged(id) => {
                lock(&self.uploads).discard(&id);
            }
            AdminEvent::Upload(id) => {
                let item = lock(&self.uploads).take(&id);
                if let Some(item) = item {
                    self.upload(vec![item]).await?;
                }
            }
            AdminEvent::UploadAll => {
                let items = lock(&self.uploads).take_all();
                if items.is_empty() {
                    self.ctx.toasts.error(
                        "No Images Added",
                        "Please add images to the staging area first.",
                    );
                } else {
                    self.upload(items).await?;
                }
            }
            AdminEvent::StageUpscaleFile(file) => self.stage_file(&self.upscales, file),
            AdminEvent::StageUpscaleUrl(url) => self.stage_url(&self.upscales, &url),
            AdminEvent::DiscardUpscale(id) => {
                lock(&self.upscales).discard(&id);
            }
            AdminEvent::StartUpscale(scale) => self.upscale(scale).await?,
            AdminEvent::RefreshHistory => self.render_history(view).await?,
            AdminEvent::ClearHistory => self.clear_history(view).await?,
            _ => return Ok(Effect::None),
        }
        self.render_all(view)?;
        Ok(Effect::None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use aries_mall_core::{MediaKind, ToastKind};
    use aries_mall_storefront::outlet::Outlet;

    use super::*;
    use crate::testing::{FakeAdmin, test_context};

    fn png(name: &str) -> StagedFile {
        StagedFile {
            name: name.to_owned(),
            mime: "image/png".to_owned(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    async fn open_page(fake: &Arc<FakeAdmin>) -> (MediaHubPage, View) {
        let page = MediaHubPage::new(test_context(fake));
        let view = Outlet::new().begin_navigation();
        view.inject(page.template().unwrap()).unwrap();
        page.init(&view).await.unwrap();
        (page, view)
    }

    #[tokio::test]
    async fn test_staging_and_discard_release_previews() {
        let fake = Arc::new(FakeAdmin::new());
        let (page, view) = open_page(&fake).await;

        page.handle(&view, AdminEvent::StageFile(png("bike.png"))).await.unwrap();
        page.handle(&view, AdminEvent::StageUrl("https://img.test/x.jpg".into()))
            .await
            .unwrap();
        assert_eq!(page.live_previews(), 1);
        let staged = view.region("staged-uploads").unwrap().unwrap();
        assert!(staged.contains("bike"));
        assert!(staged.contains("https://img.test/x.jpg"));

        let id = lock(&page.uploads).items()[0].id.clone();
        assert!(id.starts_with("pending-"));
        page.handle(&view, AdminEvent::DiscardStaged(id)).await.unwrap();
        assert_eq!(page.live_previews(), 0);
    }

    #[tokio::test]
    async fn test_invalid_inputs_toast() {
        let fake = Arc::new(FakeAdmin::new());
        let (page, view) = open_page(&fake).await;

        let text = StagedFile {
            name: "notes.txt".into(),
            mime: "text/plain".into(),
            bytes: Vec::new(),
        };
        page.handle(&view, AdminEvent::StageFile(text)).await.unwrap();
        page.handle(&view, AdminEvent::StageUrl("  ".into())).await.unwrap();
        assert!(page.ctx.toasts.contains(ToastKind::Error, "Invalid File Type"));
        assert!(page.ctx.toasts.contains(ToastKind::Error, "Invalid URL"));
        assert!(lock(&page.uploads).is_empty());
    }

    #[tokio::test]
    async fn test_nothing_staged() {
        let fake = Arc::new(FakeAdmin::new());
        let (page, view) = open_page(&fake).await;
        page.handle(&view, AdminEvent::StartUpscale(Scale::X2)).await.unwrap();
        page.handle(&view, AdminEvent::UploadAll).await.unwrap();
        let titles: Vec<_> = page.ctx.toasts.recent().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["No Images Added", "No Images Added"]);
    }

    #[tokio::test]
    async fn test_upload_without_settings_keeps_nothing() {
        let fake = Arc::new(FakeAdmin::new());
        let (page, view) = open_page(&fake).await;
        page.handle(&view, AdminEvent::StageFile(png("a.png"))).await.unwrap();
        page.handle(&view, AdminEvent::UploadAll).await.unwrap();
        assert!(page.ctx.toasts.contains(ToastKind::Error, "Configuration Error"));
        assert!(lock(&page.uploaded).is_empty());
    }

    #[tokio::test]
    async fn test_history_tab() {
        let fake = Arc::new(FakeAdmin::new());
        let (page, view) = open_page(&fake).await;
        page.handle(&view, AdminEvent::SelectTab(MediaTab::History))
            .await
            .unwrap();
        assert!(view.region("history").unwrap().unwrap().contains("No history found."));

        fake.seed_history(
            "hero",
            "https://res.cloudinary.com/demo/image/upload/v1/hero.jpg",
            MediaKind::Upload,
        );
        page.handle(&view, AdminEvent::RefreshHistory).await.unwrap();
        let html = view.region("history").unwrap().unwrap();
        assert!(html.contains("upload/w_100,h_100,c_fill/v1/hero.jpg"));
        assert!(view.region("tabs").unwrap().unwrap().contains("tab-btn active"));

        page.handle(&view, AdminEvent::ClearHistory).await.unwrap();
        assert!(fake.stored_history().is_empty());
        assert!(page.ctx.toasts.contains(ToastKind::Success, "History Cleared"));
    }
}
