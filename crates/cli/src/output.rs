//! Terminal output: rendered pages as plain text, toasts as status lines.

#![allow(clippy::print_stdout)]

use std::sync::LazyLock;

use aries_mall_core::{Toast, ToastKind};
use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("Invalid regex"));

const ENTITIES: [(&str, &str); 8] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#34;", "\""),
    ("&#39;", "'"),
    ("&#x27;", "'"),
    ("&middot;", "·"),
    ("&amp;", "&"),
];

/// Strips markup, keeping one line per block of text.
#[must_use]
pub fn page_text(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "\n");
    let mut text = BLANK_LINES_RE.replace_all(&text, "\n").into_owned();
    for (entity, plain) in ENTITIES {
        text = text.replace(entity, plain);
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn page(title: Option<&str>, html: &str) {
    if let Some(title) = title {
        println!("== {title} ==");
    }
    println!("{}", page_text(html));
}

pub fn toasts(toasts: &[Toast]) {
    for toast in toasts {
        let tag = match toast.kind {
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
        };
        match toast.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => println!("[{tag}] {}: {description}", toast.title),
            None => println!("[{tag}] {}", toast.title),
        }
    }
}

pub fn line(text: &str) {
    println!("{text}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_text() {
        let html = "<div>\n  <h2>Latest &amp; greatest</h2>\n\n<p class=\"x\">₹1,500.00</p>\n</div>";
        assert_eq!(page_text(html), "Latest & greatest\n₹1,500.00");
    }

    #[test]
    fn test_escaped_markup_stays_text() {
        assert_eq!(page_text("<p>&lt;b&gt;</p>"), "<b>");
    }
}
