//! Shopping cart model.
//!
//! A [`Cart`] is an ordered list of [`CartItem`] lines, unique by
//! `(product_slug, flavour)`. Adding a line that already exists bumps its
//! quantity instead of appending a duplicate.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The line index does not exist.
    #[error("cart has no line {index} (cart has {len} lines)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of lines in the cart.
        len: usize,
    },
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default)]
    pub product_id: ProductId,
    pub product_slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavour: Option<String>,
    /// Always at least 1 for lines held in a [`Cart`].
    pub quantity: u32,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Whether this line has the given identity key.
    #[must_use]
    pub fn matches(&self, product_slug: &str, flavour: Option<&str>) -> bool {
        self.product_slug == product_slug && self.flavour.as_deref() == flavour
    }

    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// Input for adding a product to the cart.
///
/// Accepts the field names product pages send (`id`, `slug`,
/// `selectedFlavour`) as well as the cart's own camelCase names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    #[serde(default, alias = "id")]
    pub product_id: ProductId,
    #[serde(alias = "slug")]
    pub product_slug: String,
    pub name: String,
    #[serde(default, alias = "selectedFlavour")]
    pub flavour: Option<String>,
    /// Defaults to 1 when absent or zero.
    #[serde(default)]
    pub quantity: Option<u32>,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewCartItem {
    /// Quantity to add, treating absent or zero as 1.
    #[must_use]
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.filter(|&q| q > 0).unwrap_or(1)
    }
}

impl From<NewCartItem> for CartItem {
    fn from(item: NewCartItem) -> Self {
        let quantity = item.effective_quantity();
        Self {
            product_id: item.product_id,
            product_slug: item.product_slug,
            name: item.name,
            flavour: item.flavour,
            quantity,
            price: item.price,
            image: item.image,
        }
    }
}

/// An ordered cart, unique by `(product_slug, flavour)`.
///
/// Serialised as a bare JSON array. Deserialising merges duplicate lines and
/// drops zero-quantity lines, so a cart read from storage or the server
/// always upholds the uniqueness invariant.
///
/// ```
/// use flow_hydration_core::{Cart, NewCartItem, Price, ProductId};
///
/// let item = NewCartItem {
///     product_id: ProductId::new("p1"),
///     product_slug: "electrolyte-mix".into(),
///     name: "Electrolyte Mix".into(),
///     flavour: Some("lemon".into()),
///     quantity: None,
///     price: Price::from_rupees(10),
///     image: None,
/// };
///
/// let mut cart = Cart::new();
/// cart.add(item.clone());
/// cart.add(item);
/// assert_eq!(cart.len(), 1);
/// assert_eq!(cart.count(), 2);
/// assert_eq!(cart.total(), Price::from_rupees(20));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// The cart lines, in order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the line with the given identity key.
    #[must_use]
    pub fn position(&self, product_slug: &str, flavour: Option<&str>) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.matches(product_slug, flavour))
    }

    /// Add an item, merging into an existing line with the same identity key.
    ///
    /// Returns the index of the affected line.
    pub fn add(&mut self, item: NewCartItem) -> usize {
        let quantity = item.effective_quantity();
        if let Some(index) = self.position(&item.product_slug, item.flavour.as_deref())
            && let Some(line) = self.items.get_mut(index)
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return index;
        }

        self.items.push(item.into());
        self.items.len() - 1
    }

    /// Set the quantity of the line at `index`; zero or below removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::IndexOutOfRange`] if there is no such line. The
    /// cart is left unchanged.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> Result<(), CartError> {
        let len = self.items.len();
        let line = self
            .items
            .get_mut(index)
            .ok_or(CartError::IndexOutOfRange { index, len })?;

        if quantity <= 0 {
            self.items.remove(index);
        } else {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        Ok(())
    }

    /// Remove the line at `index`, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::IndexOutOfRange`] if there is no such line.
    pub fn remove(&mut self, index: usize) -> Result<CartItem, CartError> {
        if index >= self.items.len() {
            return Err(CartError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(lines: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for line in lines.into_iter().filter(|line| line.quantity > 0) {
            match cart.position(&line.product_slug, line.flavour.as_deref()) {
                Some(index) => {
                    if let Some(existing) = cart.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => cart.items.push(line),
            }
        }
        cart
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl FromIterator<CartItem> for Cart {
    fn from_iter<I: IntoIterator<Item = CartItem>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl IntoIterator for Cart {
    type Item = CartItem;
    type IntoIter = std::vec::IntoIter<CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
