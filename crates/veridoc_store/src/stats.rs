//! Store operation counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracking store activity.
///
/// Used by callers to verify idempotence: a merge that has nothing to do
/// must open no edit transaction and trigger no cache invalidation.
#[derive(Debug, Default)]
pub struct StoreStats {
    edits_opened: AtomicU64,
    cache_evictions: AtomicU64,
    items_created: AtomicU64,
    versions_removed: AtomicU64,
}

impl StoreStats {
    pub(crate) fn record_edit_opened(&self) {
        self.edits_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_eviction(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_item_created(&self) {
        self.items_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_version_removed(&self) {
        self.versions_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of edit transactions opened.
    #[must_use]
    pub fn edits_opened(&self) -> u64 {
        self.edits_opened.load(Ordering::Relaxed)
    }

    /// Number of explicit cache invalidations issued.
    #[must_use]
    pub fn cache_evictions(&self) -> u64 {
        self.cache_evictions.load(Ordering::Relaxed)
    }

    /// Number of items created.
    #[must_use]
    pub fn items_created(&self) -> u64 {
        self.items_created.load(Ordering::Relaxed)
    }

    /// Number of versions removed.
    #[must_use]
    pub fn versions_removed(&self) -> u64 {
        self.versions_removed.load(Ordering::Relaxed)
    }
}
