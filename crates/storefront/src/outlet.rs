//! The in-process document pages render into.
//!
//! An [`Outlet`] holds the shared chrome (header) and the current page: the
//! injected page template plus named regions filled in by the page
//! controller. Templates mark regions with `<!--region:NAME-->`.
//!
//! Every navigation bumps the document generation and hands out a [`View`]
//! bound to it. A `View` from an older navigation can no longer mutate the
//! document; its writes fail with [`AppError::Stale`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{AppError, Result};

/// Proof that a navigation is (or was) the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationToken {
    generation: u64,
}

impl NavigationToken {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Document {
    generation: u64,
    chrome: String,
    page: String,
    regions: BTreeMap<String, String>,
    title: Option<String>,
}

/// Shared document handle.
#[derive(Debug, Clone, Default)]
pub struct Outlet {
    doc: Arc<Mutex<Document>>,
}

impl Outlet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a navigation, invalidating every earlier token.
    #[must_use]
    pub fn begin_navigation(&self) -> View {
        let mut doc = self.lock();
        doc.generation += 1;
        View {
            outlet: self.clone(),
            token: NavigationToken {
                generation: doc.generation,
            },
        }
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Replaces the shared chrome. Not tied to any navigation.
    pub fn set_chrome(&self, html: String) {
        self.lock().chrome = html;
    }

    #[must_use]
    pub fn chrome(&self) -> String {
        self.lock().chrome.clone()
    }

    /// Contents of a region on the current page.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<String> {
        self.lock().regions.get(name).cloned()
    }

    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.lock().title.clone()
    }

    /// The current page with regions substituted, without chrome.
    #[must_use]
    pub fn page(&self) -> String {
        let doc = self.lock();
        fill_regions(&doc.page, &doc.regions)
    }

    /// The full document: chrome followed by the page.
    #[must_use]
    pub fn render(&self) -> String {
        let doc = self.lock();
        let mut out = String::with_capacity(doc.chrome.len() + doc.page.len());
        out.push_str(&doc.chrome);
        out.push_str(&fill_regions(&doc.page, &doc.regions));
        out
    }
}

fn marker(name: &str) -> String {
    format!("<!--region:{name}-->")
}

fn fill_regions(page: &str, regions: &BTreeMap<String, String>) -> String {
    regions
        .iter()
        .fold(page.to_owned(), |html, (name, content)| {
            html.replace(&marker(name), content)
        })
}

/// Write access to the page of one navigation.
#[derive(Debug, Clone)]
pub struct View {
    outlet: Outlet,
    token: NavigationToken,
}

impl View {
    #[must_use]
    pub const fn token(&self) -> NavigationToken {
        self.token
    }

    /// Whether no newer navigation has begun.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.outlet.generation() == self.token.generation
    }

    #[must_use]
    pub fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut Document) -> T) -> Result<T> {
        let mut doc = self.outlet.lock();
        if doc.generation != self.token.generation {
            return Err(AppError::Stale);
        }
        Ok(f(&mut doc))
    }

    /// Replaces the page with a freshly rendered template.
    ///
    /// # Errors
    ///
    /// Returns `Stale` if a newer navigation began.
    pub fn inject(&self, template: String) -> Result<()> {
        self.with_doc(|doc| {
            doc.page = template;
            doc.regions.clear();
            doc.title = None;
        })
    }

    /// Fills a region.
    ///
    /// # Errors
    ///
    /// Returns `Stale` if a newer navigation began.
    pub fn set(&self, region: &str, html: impl Into<String>) -> Result<()> {
        let html = html.into();
        self.with_doc(|doc| {
            doc.regions.insert(region.to_owned(), html);
        })
    }

    /// # Errors
    ///
    /// Returns `Stale` if a newer navigation began.
    pub fn set_title(&self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.with_doc(|doc| doc.title = Some(title))
    }

    /// Reads a region of this navigation's page.
    ///
    /// # Errors
    ///
    /// Returns `Stale` if a newer navigation began.
    pub fn region(&self, name: &str) -> Result<Option<String>> {
        self.with_doc(|doc| doc.regions.get(name).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_fill_markers() {
        let outlet = Outlet::new();
        outlet.set_chrome("<header></header>".to_owned());
        let view = outlet.begin_navigation();
        view.inject("<main><!--region:grid--></main>".to_owned())
            .unwrap();
        view.set("grid", "<p>card</p>").unwrap();

        assert_eq!(outlet.page(), "<main><p>card</p></main>");
        assert_eq!(
            outlet.render(),
            "<header></header><main><p>card</p></main>"
        );
    }

    #[test]
    fn test_stale_view_cannot_mutate() {
        let outlet = Outlet::new();
        let old = outlet.begin_navigation();
        old.inject("old".to_owned()).unwrap();

        let new = outlet.begin_navigation();
        new.inject("<!--region:body-->".to_owned()).unwrap();

        assert!(!old.is_current());
        assert!(matches!(old.set("body", "late"), Err(AppError::Stale)));
        assert!(matches!(old.inject("x".to_owned()), Err(AppError::Stale)));
        assert!(outlet.region("body").is_none());
        assert!(new.is_current());
    }

    #[test]
    fn test_inject_clears_previous_regions() {
        let outlet = Outlet::new();
        let view = outlet.begin_navigation();
        view.inject("<!--region:a-->".to_owned()).unwrap();
        view.set("a", "1").unwrap();
        view.set_title("Cart").unwrap();

        let next = outlet.begin_navigation();
        next.inject("page".to_owned()).unwrap();
        assert!(outlet.region("a").is_none());
        assert!(outlet.title().is_none());
    }
}
