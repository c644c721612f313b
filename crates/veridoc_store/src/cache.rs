//! Item and data caches.
//!
//! Reads through the store populate these caches; committed edits do not
//! evict. Cache invalidation is an explicit post-commit step, so a missed
//! invalidation observably serves stale snapshots.

use crate::item::LiveItem;
use parking_lot::RwLock;
use std::collections::HashMap;
use veridoc_model::ItemId;

/// Lightweight item information held in the data cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    /// Item identifier.
    pub id: ItemId,
    /// Parent item identifier.
    pub parent_id: ItemId,
    /// Template identifier.
    pub template_id: ItemId,
    /// Item name.
    pub name: String,
}

/// The store's item cache (full snapshots) and data cache (item
/// information).
#[derive(Debug, Default)]
pub struct ItemCaches {
    items: RwLock<HashMap<ItemId, LiveItem>>,
    data: RwLock<HashMap<ItemId, ItemInfo>>,
}

impl ItemCaches {
    /// Creates empty caches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached item snapshot, if present.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<LiveItem> {
        self.items.read().get(&id).cloned()
    }

    /// Returns cached item information, if present.
    #[must_use]
    pub fn info(&self, id: ItemId) -> Option<ItemInfo> {
        self.data.read().get(&id).cloned()
    }

    /// Stores a snapshot in both caches.
    pub fn store(&self, item: &LiveItem) {
        self.data.write().insert(
            item.id(),
            ItemInfo {
                id: item.id(),
                parent_id: item.parent_id(),
                template_id: item.template_id(),
                name: item.name().to_string(),
            },
        );
        self.items.write().insert(item.id(), item.clone());
    }

    /// Evicts one item from both caches.
    ///
    /// Returns true if anything was actually removed.
    pub fn remove_item(&self, id: ItemId) -> bool {
        let from_items = self.items.write().remove(&id).is_some();
        let from_data = self.data.write().remove(&id).is_some();
        from_items || from_data
    }

    /// Returns the number of cached item snapshots.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Drops everything from both caches.
    pub fn clear(&self) {
        self.items.write().clear();
        self.data.write().clear();
    }
}
