//! Cloudinary URL helpers.
//!
//! Cloudinary applies transformations encoded in the delivery URL path right
//! after `/upload/`. These helpers insert or replace that segment so the same
//! stored asset can be served at card, thumbnail or hero sizes.

use std::sync::LazyLock;

use regex::Regex;

/// Card images in product grids.
pub const CARD_IMAGE_WIDTH: u32 = 500;
/// Thumbnails in the cart.
pub const CART_IMAGE_WIDTH: u32 = 150;
/// Main image on the product detail page.
pub const DETAIL_IMAGE_WIDTH: u32 = 600;

/// `/upload/` plus an existing transform segment, if one is present.
///
/// A transform segment holds `key_value` pairs, so it contains an underscore.
static UPLOAD_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/upload/(?:[^/]*_[^/]*/)?").expect("Invalid regex"));

/// Placeholder used when a product has no image.
#[must_use]
pub fn placeholder_image(width: u32) -> String {
    format!("https://placehold.co/{width}x{width}/f5f3ed/1a1a1a?text=No+Image")
}

/// Whether the URL points at a Cloudinary delivery path.
#[must_use]
pub fn is_cloudinary_url(url: &str) -> bool {
    url.contains("cloudinary.com") && url.contains("/upload/")
}

/// Square, auto-format, auto-quality variant of an image at `width` pixels.
///
/// Existing transforms are replaced. Non-Cloudinary URLs are returned as-is,
/// and a missing or blank URL yields the placeholder.
#[must_use]
pub fn optimized_image_url(url: Option<&str>, width: u32) -> String {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return placeholder_image(width);
    };
    if !is_cloudinary_url(url) {
        return url.to_owned();
    }
    let replacement = format!("/upload/w_{width},ar_1:1,c_fill,f_auto,q_auto/");
    UPLOAD_SEGMENT_RE
        .replacen(url, 1, replacement.as_str())
        .into_owned()
}

/// Inserts `params` after the first `/upload/`, keeping anything already there.
///
/// Empty `params` returns the URL unchanged.
#[must_use]
pub fn with_transform(url: &str, params: &str) -> String {
    if params.is_empty() {
        return url.to_owned();
    }
    url.replacen("/upload/", &format!("/upload/{params}/"), 1)
}
