//! Durable Key-Value Storage
//!
//! The cart and order stores persist through this abstraction instead of
//! talking to browser local storage directly, so they can be tested (and
//! deployed server-side) without a real browser backend.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, StoreError};

/// Storage key for the cart snapshot
pub const CART_KEY: &str = "cart";

/// Storage key for the currency preference
pub const CURRENCY_KEY: &str = "currency";

/// Storage key for the order history
pub const ORDER_HISTORY_KEY: &str = "orderHistory";

/// Key-value storage trait (Strategy pattern)
///
/// Implement this for each backend: browser local storage, a server-side
/// datastore keyed by session, an in-memory map for tests.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under a key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value under a key, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key entirely
    fn remove(&self, key: &str) -> Result<()>;

    /// Drop all keys
    fn clear(&self) -> Result<()>;
}

/// In-memory storage (for development and tests)
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Storage("storage lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("storage lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("storage lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("storage lock poisoned".into()))?;
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));

        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));

        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }
}
