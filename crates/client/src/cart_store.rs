//! Local cart persistence.

use std::sync::Arc;

use flow_hydration_core::Cart;
use tokio::sync::watch;

use crate::storage::{KeyValueStore, StorageError, keys};

/// Persistent local cart with change notifications.
///
/// Every [`save`](Self::save) publishes the new cart to subscribers, so a
/// rendering layer can refresh badges and totals without polling.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    updates: Arc<watch::Sender<Cart>>,
}

impl CartStore {
    /// Create a cart store over `store`, seeding subscribers with the stored cart.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let initial = read_cart(&*store);
        let (updates, _) = watch::channel(initial);
        Self {
            store,
            updates: Arc::new(updates),
        }
    }

    /// The locally stored cart; unreadable data reads as empty.
    #[must_use]
    pub fn load(&self) -> Cart {
        read_cart(&*self.store)
    }

    /// Persist `cart` and notify subscribers.
    pub fn save(&self, cart: &Cart) {
        let result = serde_json::to_string(cart)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(keys::CART, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist cart");
        }

        self.updates.send_replace(cart.clone());
    }

    /// Receive the cart after every save.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.updates.subscribe()
    }
}

fn read_cart(store: &dyn KeyValueStore) -> Cart {
    match store.get(keys::CART) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable local cart");
            Cart::new()
        }),
        Ok(None) => Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read local cart");
            Cart::new()
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &self.load().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use flow_hydration_core::{NewCartItem, Price, ProductId};

    use super::*;
    use crate::storage::MemoryStore;

    fn item(slug: &str) -> NewCartItem {
        NewCartItem {
            product_id: ProductId::new(slug),
            product_slug: slug.to_string(),
            name: slug.to_string(),
            flavour: None,
            quantity: None,
            price: Price::from_rupees(99),
            image: None,
        }
    }

    #[test]
    fn test_empty_store_loads_empty_cart() {
        let carts = CartStore::new(Arc::new(MemoryStore::new()));
        assert!(carts.load().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartStore::new(store.clone());

        let mut cart = Cart::new();
        cart.add(item("a"));
        carts.save(&cart);

        assert_eq!(carts.load(), cart);
        assert!(store.get(keys::CART).unwrap().unwrap().starts_with('['));
    }

    #[test]
    fn test_corrupt_cart_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::CART, "not json").unwrap();
        assert!(CartStore::new(store).load().is_empty());
    }

    #[tokio::test]
    async fn test_save_notifies_subscribers() {
        let carts = CartStore::new(Arc::new(MemoryStore::new()));
        let mut rx = carts.subscribe();

        let mut cart = Cart::new();
        cart.add(item("a"));
        carts.save(&cart);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), cart);
    }
}
