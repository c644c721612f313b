//! Name-based store resolution.

use crate::store::ItemStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves stores by name.
///
/// The synchronization engine resolves its target store through a registry:
/// either from an explicit option or from the database name carried by the
/// serialized item itself.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: RwLock<HashMap<String, Arc<ItemStore>>>,
}

impl StoreRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a store under its own name, replacing any previous entry.
    pub fn register(&self, store: Arc<ItemStore>) {
        self.stores
            .write()
            .insert(store.name().to_string(), store);
    }

    /// Resolves a store by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ItemStore>> {
        self.stores.read().get(name).cloned()
    }

    /// Returns the number of registered stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    /// Returns true if no stores are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}
