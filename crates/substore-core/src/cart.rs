//! Cart Store
//!
//! Holds the user's pending product selection. Every mutation persists the
//! full snapshot; a broken storage backend degrades the cart to in-memory
//! for the session instead of surfacing errors to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::{CART_KEY, KeyValueStorage};

/// A single cart line, unique by product id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier
    #[serde(rename = "productId")]
    pub product_id: String,

    /// Quantity, always > 0 while the item is in the cart
    pub quantity: u32,
}

/// Cart store backed by durable key-value storage
pub struct CartStore {
    storage: Arc<dyn KeyValueStorage>,
    items: Vec<CartItem>,
}

impl CartStore {
    /// Create a cart, loading any prior snapshot from storage.
    ///
    /// A missing, unreadable, or unparseable snapshot falls back to an
    /// empty cart; the session continues in-memory.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let items = match storage.get(CART_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unparseable cart snapshot");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Cart storage unavailable, starting in-memory");
                Vec::new()
            }
        };

        Self { storage, items }
    }

    /// Add a quantity of a product; accumulates onto an existing line.
    ///
    /// A zero quantity is a no-op.
    pub fn add(&mut self, product_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity += quantity;
        } else {
            self.items.push(CartItem {
                product_id: product_id.to_string(),
                quantity,
            });
        }

        self.persist();
    }

    /// Remove a product's line entirely, regardless of quantity
    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
        self.persist();
    }

    /// Current lines in insertion order
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empty the cart
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Write the full snapshot; storage failures keep the in-memory state
    /// authoritative for the rest of the session.
    fn persist(&self) {
        let snapshot = match serde_json::to_string(&self.items) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize cart snapshot");
                return;
            }
        };

        if let Err(e) = self.storage.set(CART_KEY, &snapshot) {
            tracing::warn!(error = %e, "Failed to persist cart, continuing in-memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, StoreError};
    use crate::storage::MemoryStorage;

    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(StoreError::Storage("backend offline".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(StoreError::Storage("backend offline".into()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(StoreError::Storage("backend offline".into()))
        }
        fn clear(&self) -> Result<()> {
            Err(StoreError::Storage("backend offline".into()))
        }
    }

    #[test]
    fn test_add_accumulates_quantity() {
        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        cart.add("1", 2);
        cart.add("1", 3);
        cart.add("2", 1);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.items()[1].product_id, "2");
    }

    #[test]
    fn test_zero_quantity_is_noop() {
        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        cart.add("1", 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_deletes_entire_line() {
        let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
        cart.add("1", 7);
        cart.remove("1");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());

        let mut cart = CartStore::new(storage.clone());
        cart.add("1", 2);
        cart.add("2", 1);

        let reloaded = CartStore::new(storage);
        assert_eq!(reloaded.items().len(), 2);
        assert_eq!(reloaded.items()[0].quantity, 2);
    }

    #[test]
    fn test_degrades_to_in_memory_on_storage_failure() {
        let mut cart = CartStore::new(Arc::new(FailingStorage));
        cart.add("1", 2);
        cart.add("1", 1);

        // Mutations never surface storage errors; state stays in-memory.
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_unparseable_snapshot_falls_back_to_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CART_KEY, "not json").unwrap();

        let cart = CartStore::new(storage);
        assert!(cart.is_empty());
    }
}
