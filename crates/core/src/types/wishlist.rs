//! Wishlist: a set of product ids kept in insertion order.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Products a user has marked as favorites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    ids: Vec<ProductId>,
}

impl Wishlist {
    /// An empty wishlist.
    #[must_use]
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Builds a wishlist, dropping duplicate ids.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let mut list = Self::new();
        for id in ids {
            if !list.contains(&id) {
                list.ids.push(id);
            }
        }
        list
    }

    /// Adds the id if absent, removes it if present. Returns the new membership.
    ///
    /// Ids are kept in the order they were added, so an id that is removed
    /// and added again moves to the end.
    pub fn toggle(&mut self, id: &ProductId) -> bool {
        if let Some(pos) = self.ids.iter().position(|existing| existing == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id.clone());
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_toggle_restores_state() {
        let mut list = Wishlist::from_ids([ProductId::new("1"), ProductId::new("2")]);
        let before = list.clone();
        let id = ProductId::new("3");
        assert!(list.toggle(&id));
        assert!(!list.toggle(&id));
        assert_eq!(list, before);

        let existing = ProductId::new("1");
        assert!(!list.toggle(&existing));
        assert!(list.toggle(&existing));
        assert_eq!(list.ids(), [ProductId::new("2"), ProductId::new("1")]);
    }

    #[test]
    fn test_from_ids_dedups() {
        let list = Wishlist::from_ids(["1", "1", "2"].map(ProductId::new));
        assert_eq!(list.len(), 2);
    }
}
