//! Homepage slide manager, hosted on the product manager page.

use std::sync::{Mutex, PoisonError};

use askama::Template;
use aries_mall_core::{ImageFit, SlideDraft, SlideId, SlideRow};
use aries_mall_storefront::outlet::View;
use tracing::{error, info};

use super::AdminContext;
use crate::components::{Cell, DataTable, TableColumn, TableRow};
use crate::error::Result;

const PLACEHOLDER_IMAGE: &str = "https://placehold.co/200x120?text=No+Img";
const DELETE_PROMPT: &str = "Are you sure you want to delete this slide?";
const FITS: [&str; 3] = ["cover", "contain", "fill"];

/// Values of the slide form. Blank text fields are stored as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideForm {
    /// `None` creates a new slide.
    pub id: Option<SlideId>,
    pub title: String,
    pub description: String,
    pub button_text: String,
    pub button_link: String,
    pub image_url_desktop: String,
    pub image_url_mobile: String,
    pub thumbnail_url: String,
    pub show_overlay: bool,
    pub fit_desktop: ImageFit,
    pub fit_mobile: ImageFit,
    pub is_active: bool,
}

impl Default for SlideForm {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            button_text: String::new(),
            button_link: String::new(),
            image_url_desktop: String::new(),
            image_url_mobile: String::new(),
            thumbnail_url: String::new(),
            show_overlay: true,
            fit_desktop: ImageFit::Cover,
            fit_mobile: ImageFit::Cover,
            is_active: true,
        }
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl SlideForm {
    #[must_use]
    pub fn from_row(row: &SlideRow) -> Self {
        Self {
            id: Some(row.id.clone()),
            title: row.title.clone().unwrap_or_default(),
            description: row.description.clone().unwrap_or_default(),
            button_text: row.button_text.clone().unwrap_or_default(),
            button_link: row.button_link.clone().unwrap_or_default(),
            image_url_desktop: row.image_url_desktop.clone().unwrap_or_default(),
            image_url_mobile: row.image_url_mobile.clone().unwrap_or_default(),
            thumbnail_url: row.thumbnail_url.clone().unwrap_or_default(),
            show_overlay: row.show_overlay,
            fit_desktop: row.fit_desktop,
            fit_mobile: row.fit_mobile,
            is_active: row.is_active,
        }
    }

    #[must_use]
    pub fn to_draft(&self) -> SlideDraft {
        SlideDraft {
            title: blank_to_none(&self.title),
            description: blank_to_none(&self.description),
            button_text: blank_to_none(&self.button_text),
            button_link: blank_to_none(&self.button_link),
            image_url_desktop: blank_to_none(&self.image_url_desktop),
            image_url_mobile: blank_to_none(&self.image_url_mobile),
            thumbnail_url: blank_to_none(&self.thumbnail_url),
            show_overlay: self.show_overlay,
            fit_desktop: self.fit_desktop,
            fit_mobile: self.fit_mobile,
            is_active: self.is_active,
        }
    }
}

fn table_row(slide: &SlideRow) -> TableRow {
    let image = slide
        .thumbnail_url
        .as_deref()
        .or(slide.image_url_mobile.as_deref())
        .unwrap_or(PLACEHOLDER_IMAGE);
    let (status, class) = if slide.is_active {
        ("Active", "slide-table__status--active")
    } else {
        ("Inactive", "slide-table__status--inactive")
    };
    TableRow {
        id: slide.id.to_string(),
        cells: vec![
            Cell::image(image, slide.title.as_deref().unwrap_or("Slide")),
            Cell::text(slide.title.as_deref().unwrap_or("(No Title)")),
            Cell::text(slide.button_text.as_deref().unwrap_or("(No Button)")),
            Cell::text(status).class(class),
        ],
    }
}

#[derive(Template)]
#[template(path = "partials/slide_form.html")]
struct SlideModalTemplate<'a> {
    title: &'a str,
    form: &'a SlideForm,
    fits: [&'static str; 3],
}

/// Slide table and modal state.
pub struct SlideManager {
    ctx: AdminContext,
    slides: Mutex<Vec<SlideRow>>,
}

impl SlideManager {
    #[must_use]
    pub const fn new(ctx: AdminContext) -> Self {
        Self {
            ctx,
            slides: Mutex::new(Vec::new()),
        }
    }

    /// Loads slides newest first and renders the table.
    ///
    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    pub async fn fetch(&self, view: &View) -> Result<()> {
        match self.ctx.backend()?.slides().await {
            Ok(slides) => *self.slides.lock().unwrap_or_else(PoisonError::into_inner) = slides,
            Err(e) => {
                error!(error = %e, "Failed to fetch slides");
                self.ctx.toasts.error("Error", "Could not fetch slides.");
            }
        }
        self.render_table(view)
    }

    fn render_table(&self, view: &View) -> Result<()> {
        let rows = self
            .slides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(table_row)
            .collect();
        let html = DataTable::new("slides")
            .column(TableColumn::new("image", "Image"))
            .column(TableColumn::new("title", "Title"))
            .column(TableColumn::new("button_text", "Button"))
            .column(TableColumn::new("status", "Status"))
            .empty_state("No slides found. Add one to get started!")
            .rows(rows)
            .render()?;
        view.set("slides-table", html)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    pub fn open_modal(&self, view: &View, id: Option<&SlideId>) -> Result<()> {
        let existing = id.and_then(|id| {
            self.slides
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|s| s.id == *id)
                .map(SlideForm::from_row)
        });
        let (title, form) = match existing {
            Some(form) => ("Edit Slide", form),
            None => ("Add New Slide", SlideForm::default()),
        };
        let html = SlideModalTemplate {
            title,
            form: &form,
            fits: FITS,
        }
        .render()?;
        view.set("modal", html)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    pub async fn save(&self, view: &View, form: &SlideForm) -> Result<()> {
        let backend = self.ctx.backend()?;
        let draft = form.to_draft();
        let outcome = match &form.id {
            Some(id) => backend.update_slide(id, &draft).await,
            None => backend.insert_slide(&draft).await,
        };
        if let Err(e) = outcome {
            error!(error = %e, "Failed to save slide");
            self.ctx
                .toasts
                .error("Error", format!("Could not save slide: {}", e.user_message()));
            return Ok(());
        }

        let verb = if form.id.is_some() { "updated" } else { "created" };
        info!(verb, "Slide saved");
        self.ctx
            .toasts
            .success("Success", format!("Slide successfully {verb}."));
        view.set("modal", "")?;
        self.fetch(view).await
    }

    /// # Errors
    ///
    /// Returns `Stale` once a newer navigation has begun.
    pub async fn delete(&self, view: &View, id: &SlideId) -> Result<()> {
        if !self.ctx.confirm.confirm(DELETE_PROMPT) {
            return Ok(());
        }
        if let Err(e) = self.ctx.backend()?.delete_slide(id).await {
            error!(error = %e, slide_id = %id, "Failed to delete slide");
            self.ctx.toasts.error("Error", "Could not delete slide.");
            return Ok(());
        }
        self.ctx
            .toasts
            .success("Success", "Slide deleted successfully.");
        self.fetch(view).await
    }
}
