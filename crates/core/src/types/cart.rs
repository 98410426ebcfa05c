//! Shopping cart.
//!
//! A cart is a set of line items keyed by product id. Quantities are
//! [`Quantity`] values, which cannot be zero, so "remove the last unit"
//! always removes the line item.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// A positive item quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Returns `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(q) => Some(Self(q)),
            None => None,
        }
    }

    /// Converts a signed request into a quantity; zero and negatives are `None`.
    /// Values above `u32::MAX` saturate.
    #[must_use]
    pub fn from_signed(value: i64) -> Option<Self> {
        if value <= 0 {
            return None;
        }
        Self::new(u32::try_from(value).unwrap_or(u32::MAX))
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Adds two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product together with how many units are in the cart.
///
/// Serializes as the product object with an extra `quantity` field, which is
/// the shape of the guest cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: Quantity,
}

impl LineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity.get()
    }
}

/// Result of [`Cart::set_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line item now holds this quantity.
    Updated(Quantity),
    /// The line item was removed.
    Removed,
    /// No line item exists for the product.
    Unknown,
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builds a cart from line items, merging duplicate product ids.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.add(item.product, item.quantity);
        }
        cart
    }

    /// Adds `quantity` units of `product`, returning the new line quantity.
    pub fn add(&mut self, product: Product, quantity: Quantity) -> Quantity {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            return existing.quantity;
        }
        self.items.push(LineItem { product, quantity });
        quantity
    }

    /// Sets the quantity of a line item; zero or negative removes it.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> QuantityChange {
        let Some(pos) = self.items.iter().position(|i| &i.product.id == product_id) else {
            return QuantityChange::Unknown;
        };
        match (Quantity::from_signed(quantity), self.items.get_mut(pos)) {
            (Some(q), Some(item)) => {
                item.quantity = q;
                QuantityChange::Updated(q)
            }
            _ => {
                self.items.remove(pos);
                QuantityChange::Removed
            }
        }
    }

    /// Removes a line item, returning whether one existed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        self.set_quantity(product_id, 0) == QuantityChange::Removed
    }

    /// Looks up a line item.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.product.id == product_id)
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity.get())).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(id: &str, price: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": format!("Product {id}"), "price": price,
        }))
        .unwrap()
    }

    #[test]
    fn test_quantity_rejects_zero_and_negative() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::from_signed(-3).is_none());
        assert_eq!(Quantity::from_signed(2).unwrap().get(), 2);
    }

    #[test]
    fn test_add_increments_existing_line() {
        let mut cart = Cart::new();
        cart.add(product("1", 100), Quantity::ONE);
        let q = cart.add(product("1", 100), Quantity::new(2).unwrap());
        assert_eq!(q.get(), 3);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_set_quantity_branches() {
        let mut cart = Cart::new();
        cart.add(product("1", 100), Quantity::ONE);
        let id = ProductId::new("1");

        assert_eq!(
            cart.set_quantity(&id, 5),
            QuantityChange::Updated(Quantity::new(5).unwrap())
        );
        assert_eq!(
            cart.set_quantity(&ProductId::new("9"), 5),
            QuantityChange::Unknown
        );
        assert_eq!(cart.set_quantity(&id, -1), QuantityChange::Removed);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_saturates_huge_values() {
        let mut cart = Cart::new();
        cart.add(product("1", 100), Quantity::ONE);
        let id = ProductId::new("1");

        assert_eq!(
            cart.set_quantity(&id, 5_000_000_000),
            QuantityChange::Updated(Quantity::new(u32::MAX).unwrap())
        );
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_quantity(), u64::from(u32::MAX));
        assert!(Quantity::from_signed(i64::MIN).is_none());
    }

    #[test]
    fn test_count_is_sum_of_quantities() {
        let mut cart = Cart::new();
        let steps: [(&str, i64); 7] = [
            ("a", 2),
            ("b", 1),
            ("a", 0),
            ("c", 4),
            ("b", 7),
            ("c", -2),
            ("d", 3),
        ];
        for (id, qty) in steps {
            if let Some(q) = Quantity::from_signed(qty) {
                cart.add(product(id, 10), q);
            } else {
                cart.set_quantity(&ProductId::new(id), qty);
            }
            let sum: u64 = cart.items().iter().map(|i| u64::from(i.quantity.get())).sum();
            assert_eq!(cart.total_quantity(), sum);
            assert!(cart.items().iter().all(|i| i.quantity.get() > 0));
        }
    }

    #[test]
    fn test_subtotal() {
        let mut cart = Cart::new();
        cart.add(product("1", 250), Quantity::new(2).unwrap());
        cart.add(product("2", 100), Quantity::ONE);
        assert_eq!(cart.subtotal().amount(), Decimal::from(600));
    }

    #[test]
    fn test_snapshot_shape_is_flat() {
        let cart = Cart::from_items([LineItem {
            product: product("1", 10),
            quantity: Quantity::ONE,
        }]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json[0]["id"], "1");
        assert_eq!(json[0]["quantity"], 1);
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
