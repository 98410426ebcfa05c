//! Hero carousel slides.
//!
//! The `slides` table uses snake_case columns; the storefront works with the
//! camelCase [`HeroSlide`] view model produced by `From<SlideRow>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::id::SlideId;

/// CSS `object-fit` for a slide image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

impl ImageFit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Fill => "fill",
        }
    }

    /// Parses a stored value; unknown or empty values mean `cover`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "contain" => Self::Contain,
            "fill" => Self::Fill,
            _ => Self::Cover,
        }
    }
}

impl<'de> Deserialize<'de> for ImageFit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse_lenient).unwrap_or_default())
    }
}

/// A row of the `slides` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRow {
    pub id: SlideId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub button_link: Option<String>,
    #[serde(default)]
    pub image_url_desktop: Option<String>,
    #[serde(default)]
    pub image_url_mobile: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_true")]
    pub show_overlay: bool,
    #[serde(default)]
    pub fit_desktop: ImageFit,
    #[serde(default)]
    pub fit_mobile: ImageFit,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

/// Insert/update payload for the `slides` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    pub image_url_desktop: Option<String>,
    pub image_url_mobile: Option<String>,
    pub thumbnail_url: Option<String>,
    pub show_overlay: bool,
    pub fit_desktop: ImageFit,
    pub fit_mobile: ImageFit,
    pub is_active: bool,
}

impl From<&SlideRow> for SlideDraft {
    fn from(row: &SlideRow) -> Self {
        Self {
            title: row.title.clone(),
            description: row.description.clone(),
            button_text: row.button_text.clone(),
            button_link: row.button_link.clone(),
            image_url_desktop: row.image_url_desktop.clone(),
            image_url_mobile: row.image_url_mobile.clone(),
            thumbnail_url: row.thumbnail_url.clone(),
            show_overlay: row.show_overlay,
            fit_desktop: row.fit_desktop,
            fit_mobile: row.fit_mobile,
            is_active: row.is_active,
        }
    }
}

/// Slide data as the hero carousel consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlide {
    pub title: String,
    pub description: String,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    pub background_image_desktop: Option<String>,
    pub background_image_mobile: Option<String>,
    pub thumbnail_image: Option<String>,
    pub overlay: bool,
    pub fit_desktop: ImageFit,
    pub fit_mobile: ImageFit,
}

impl From<SlideRow> for HeroSlide {
    fn from(row: SlideRow) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            title: row.title.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            button_text: non_empty(row.button_text),
            button_link: non_empty(row.button_link),
            background_image_desktop: non_empty(row.image_url_desktop),
            background_image_mobile: non_empty(row.image_url_mobile),
            thumbnail_image: non_empty(row.thumbnail_url),
            overlay: row.show_overlay,
            fit_desktop: row.fit_desktop,
            fit_mobile: row.fit_mobile,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_view_renames_fields() {
        let row: SlideRow = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Monsoon Sale",
            "button_text": "Shop now",
            "button_link": "#/category/electronics",
            "image_url_desktop": "https://res.cloudinary.com/x/image/upload/d.jpg",
            "image_url_mobile": "",
            "thumbnail_url": null,
            "show_overlay": false,
            "fit_desktop": "contain",
            "fit_mobile": null,
            "is_active": true
        }))
        .unwrap();

        let slide = HeroSlide::from(row);
        assert_eq!(slide.title, "Monsoon Sale");
        assert_eq!(slide.button_text.as_deref(), Some("Shop now"));
        assert!(slide.background_image_mobile.is_none());
        assert!(!slide.overlay);
        assert_eq!(slide.fit_desktop, ImageFit::Contain);
        assert_eq!(slide.fit_mobile, ImageFit::Cover);

        let json = serde_json::to_value(&slide).unwrap();
        assert_eq!(json["buttonLink"], "#/category/electronics");
        assert_eq!(json["fitDesktop"], "contain");
    }
}
