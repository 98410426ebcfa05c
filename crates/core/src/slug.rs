//! Slugs for category and brand links.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("Invalid regex"));

/// Lower-cases, turns whitespace runs into `-` and strips everything outside
/// `[a-z0-9-]`.
///
/// ```
/// use aries_mall_core::slug::normalize_slug;
///
/// assert_eq!(normalize_slug("Home & Kitchen"), "home--kitchen");
/// assert_eq!(normalize_slug("  Hero MotoCorp "), "hero-motocorp");
/// ```
#[must_use]
pub fn normalize_slug(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let dashed = WHITESPACE_RE.replace_all(&lowered, "-");
    NON_SLUG_RE.replace_all(&dashed, "").into_owned()
}

/// Human title for a slug: hyphens become spaces and the first letter is
/// capitalized.
#[must_use]
pub fn title_from_slug(slug: &str) -> String {
    let spaced = slug.replace('-', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Case-insensitive pattern matching a slug against its source text.
///
/// Hyphens become single-character wildcards so `electric-scooters` matches
/// `Electric Scooters`. Literal `%`, `_` and `\` are escaped.
#[must_use]
pub fn slug_to_ilike_pattern(slug: &str) -> String {
    let mut pattern = String::with_capacity(slug.len());
    for c in slug.chars() {
        match c {
            '-' => pattern.push('_'),
            '%' | '_' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            _ => pattern.push(c),
        }
    }
    pattern
}
