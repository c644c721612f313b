//! The live item store and its scoped edit transactions.

use crate::cache::{ItemCaches, ItemInfo};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::events::{EventPipeline, ItemEvent, ItemEventKind};
use crate::field::FieldValue;
use crate::item::{new_revision, ItemVersion, LiveItem, VersionKey};
use crate::stats::StoreStats;
use crate::template::TemplateEngine;
use crate::trail::TrailStore;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use veridoc_model::ItemId;

/// A named, mutable, versioned item store.
///
/// Items handed out are snapshots. Reads go through the item caches;
/// mutation happens through store-level operations or an [`ItemEdit`]
/// scope. Committed mutations do not evict cached snapshots — callers
/// issue [`invalidate_caches`](ItemStore::invalidate_caches) explicitly
/// after commit, mirroring the cache discipline of the host platform.
#[derive(Debug)]
pub struct ItemStore {
    name: String,
    config: StoreConfig,
    items: RwLock<HashMap<ItemId, LiveItem>>,
    templates: TemplateEngine,
    caches: ItemCaches,
    events: EventPipeline,
    trails: TrailStore,
    open_edits: Mutex<HashSet<ItemId>>,
    stats: StoreStats,
}

impl ItemStore {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, StoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: StoreConfig) -> Self {
        let events = EventPipeline::new(config.remote_events);
        Self {
            name: name.into(),
            config,
            items: RwLock::new(HashMap::new()),
            templates: TemplateEngine::new(),
            caches: ItemCaches::new(),
            events,
            trails: TrailStore::new(),
            open_edits: Mutex::new(HashSet::new()),
            stats: StoreStats::default(),
        }
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the template engine.
    #[must_use]
    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    /// Returns the event pipeline.
    #[must_use]
    pub fn events(&self) -> &EventPipeline {
        &self.events
    }

    /// Returns the item caches.
    #[must_use]
    pub fn caches(&self) -> &ItemCaches {
        &self.caches
    }

    /// Returns the trail tables.
    #[must_use]
    pub fn trails(&self) -> &TrailStore {
        &self.trails
    }

    /// Returns the operation counters.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Returns an item snapshot by ID, reading through the item cache.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<LiveItem> {
        if let Some(cached) = self.caches.item(id) {
            return Some(cached);
        }
        let item = self.items.read().get(&id).cloned()?;
        self.caches.store(&item);
        Some(item)
    }

    /// Returns lightweight item information, reading through the data
    /// cache.
    ///
    /// Cheaper than [`item`](ItemStore::item) when only identity, parent,
    /// template and name are needed.
    #[must_use]
    pub fn item_info(&self, id: ItemId) -> Option<ItemInfo> {
        if let Some(info) = self.caches.info(id) {
            return Some(info);
        }
        let item = self.items.read().get(&id).cloned()?;
        self.caches.store(&item);
        self.caches.info(id)
    }

    /// Returns one version of an item, bypassing the caches.
    #[must_use]
    pub fn item_version(&self, id: ItemId, key: &VersionKey) -> Option<ItemVersion> {
        self.items.read().get(&id)?.versions.get(key).cloned()
    }

    /// Returns the revision stamp of one version, bypassing the caches.
    #[must_use]
    pub fn version_revision(&self, id: ItemId, key: &VersionKey) -> Option<String> {
        self.items
            .read()
            .get(&id)?
            .versions
            .get(key)
            .map(|v| v.revision.clone())
    }

    /// Returns the number of items in the store.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Computes the human-readable path of an item by walking its parents.
    #[must_use]
    pub fn item_path(&self, id: ItemId) -> Option<String> {
        let items = self.items.read();
        let mut segments = Vec::new();
        let mut current = id;
        // Depth cap guards against parent cycles.
        for _ in 0..64 {
            let item = items.get(&current)?;
            segments.push(item.name.clone());
            if item.parent_id.is_nil() {
                segments.reverse();
                return Some(format!("/{}", segments.join("/")));
            }
            current = item.parent_id;
        }
        None
    }

    /// Creates a root item (an item with no parent).
    pub fn add_root(
        &self,
        name: &str,
        template_id: ItemId,
        id: ItemId,
    ) -> StoreResult<LiveItem> {
        self.insert_from_template(name, template_id, ItemId::nil(), id)
    }

    /// Creates an item under a parent from a template.
    ///
    /// Shared fields with template defaults are populated, and one initial
    /// version is created in the configured default language with the
    /// non-shared defaults.
    pub fn add_from_template(
        &self,
        name: &str,
        template_id: ItemId,
        parent_id: ItemId,
        id: ItemId,
    ) -> StoreResult<LiveItem> {
        if !self.items.read().contains_key(&parent_id) {
            return Err(StoreError::ParentNotFound { id: parent_id });
        }
        self.insert_from_template(name, template_id, parent_id, id)
    }

    fn insert_from_template(
        &self,
        name: &str,
        template_id: ItemId,
        parent_id: ItemId,
        id: ItemId,
    ) -> StoreResult<LiveItem> {
        let template = self
            .templates
            .template(template_id)
            .ok_or(StoreError::TemplateNotFound { id: template_id })?;

        let mut item = LiveItem::new(id, parent_id, template_id, name);
        let mut initial = ItemVersion::new(new_revision());
        for field in template.fields() {
            let Some(default) = &field.default_value else {
                continue;
            };
            let value = FieldValue::Text(default.clone());
            if field.shared {
                item.shared.insert(field.id, value);
            } else {
                initial.fields.insert(field.id, value);
            }
        }
        item.versions
            .insert(VersionKey::new(&self.config.default_language, 1), initial);

        {
            let mut items = self.items.write();
            if items.contains_key(&id) {
                return Err(StoreError::ItemExists { id });
            }
            items.insert(id, item.clone());
        }
        self.stats.record_item_created();
        self.events
            .emit(ItemEvent::item(&self.name, ItemEventKind::Created, id));
        tracing::debug!(store = %self.name, item = %id, "item created");
        Ok(item)
    }

    /// Moves an item under a new parent.
    pub fn move_item(&self, id: ItemId, new_parent: ItemId) -> StoreResult<()> {
        {
            let mut items = self.items.write();
            if !items.contains_key(&new_parent) {
                return Err(StoreError::ParentNotFound { id: new_parent });
            }
            let item = items
                .get_mut(&id)
                .ok_or(StoreError::ItemNotFound { id })?;
            item.parent_id = new_parent;
        }
        self.events
            .emit(ItemEvent::item(&self.name, ItemEventKind::Moved, id));
        Ok(())
    }

    /// Creates a version at exactly the given (language, number) identity.
    pub fn add_version_at(&self, id: ItemId, key: VersionKey) -> StoreResult<()> {
        {
            let mut items = self.items.write();
            let item = items
                .get_mut(&id)
                .ok_or(StoreError::ItemNotFound { id })?;
            if item.versions.contains_key(&key) {
                return Err(StoreError::VersionExists {
                    id,
                    language: key.language,
                    number: key.number,
                });
            }
            item.versions.insert(key, ItemVersion::new(new_revision()));
        }
        self.events
            .emit(ItemEvent::item(&self.name, ItemEventKind::VersionAdded, id));
        Ok(())
    }

    /// Removes one version from an item.
    pub fn remove_version(&self, id: ItemId, key: &VersionKey) -> StoreResult<()> {
        {
            let mut items = self.items.write();
            let item = items
                .get_mut(&id)
                .ok_or(StoreError::ItemNotFound { id })?;
            if item.versions.remove(key).is_none() {
                return Err(StoreError::VersionNotFound {
                    id,
                    language: key.language.clone(),
                    number: key.number,
                });
            }
        }
        self.stats.record_version_removed();
        self.events.emit(ItemEvent::item(
            &self.name,
            ItemEventKind::VersionRemoved,
            id,
        ));
        Ok(())
    }

    /// Removes every version from an item.
    pub fn remove_all_versions(&self, id: ItemId) -> StoreResult<()> {
        let removed = {
            let mut items = self.items.write();
            let item = items
                .get_mut(&id)
                .ok_or(StoreError::ItemNotFound { id })?;
            let count = item.versions.len();
            item.versions.clear();
            count
        };
        for _ in 0..removed {
            self.stats.record_version_removed();
        }
        if removed > 0 {
            self.events.emit(ItemEvent::item(
                &self.name,
                ItemEventKind::VersionRemoved,
                id,
            ));
        }
        Ok(())
    }

    /// Deletes an item.
    pub fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        if self.items.write().remove(&id).is_none() {
            return Err(StoreError::ItemNotFound { id });
        }
        self.events
            .emit(ItemEvent::item(&self.name, ItemEventKind::Deleted, id));
        Ok(())
    }

    /// Evicts an item from the caches.
    ///
    /// This is the explicit post-commit step; it must be issued even when
    /// the surrounding operation ultimately fails, to avoid serving stale
    /// cached reads.
    pub fn invalidate_caches(&self, id: ItemId) {
        self.caches.remove_item(id);
        self.stats.record_cache_eviction();
    }

    /// Opens a scoped edit transaction on an item.
    ///
    /// At most one edit may be open per item at a time; the transaction
    /// commits exactly once when the returned scope is dropped, on every
    /// exit path.
    pub fn begin_edit(&self, id: ItemId) -> StoreResult<ItemEdit<'_>> {
        let item = self
            .items
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::ItemNotFound { id })?;
        if !self.open_edits.lock().insert(id) {
            return Err(StoreError::EditInProgress { id });
        }
        self.stats.record_edit_opened();
        let original_name = item.name.clone();
        let original_template = item.template_id;
        Ok(ItemEdit {
            store: self,
            item,
            original_name,
            original_template,
        })
    }
}

/// A scoped edit transaction against one item.
///
/// Mutations are applied to a working copy and become visible when the
/// scope is dropped. Dropping always commits; there is no abort — error
/// handling happens above this layer, and cache invalidation is a separate
/// explicit step.
#[derive(Debug)]
pub struct ItemEdit<'a> {
    store: &'a ItemStore,
    item: LiveItem,
    original_name: String,
    original_template: ItemId,
}

impl ItemEdit<'_> {
    /// Returns the working copy.
    #[must_use]
    pub fn item(&self) -> &LiveItem {
        &self.item
    }

    /// Renames the item.
    pub fn set_name(&mut self, name: &str) {
        self.item.name = name.to_string();
    }

    /// Changes the item branch.
    pub fn set_branch(&mut self, branch_id: ItemId) {
        self.item.branch_id = branch_id;
    }

    /// Changes the item template.
    ///
    /// Stored field values are kept; values for fields absent from the new
    /// template simply stop resolving through it.
    pub fn set_template(&mut self, template_id: ItemId) {
        self.item.template_id = template_id;
    }

    /// Sets a shared field value.
    pub fn set_shared_field(&mut self, field_id: ItemId, value: FieldValue) {
        self.item.shared.insert(field_id, value);
    }

    /// Resets a shared field to its template default.
    pub fn reset_shared_field(&mut self, field_id: ItemId) {
        self.item.shared.remove(&field_id);
    }

    /// Sets a version-scoped field value.
    pub fn set_version_field(
        &mut self,
        key: &VersionKey,
        field_id: ItemId,
        value: FieldValue,
    ) -> StoreResult<()> {
        self.version_mut(key)?.fields.insert(field_id, value);
        Ok(())
    }

    /// Resets a version-scoped field to its template default.
    pub fn reset_version_field(&mut self, key: &VersionKey, field_id: ItemId) -> StoreResult<()> {
        self.version_mut(key)?.fields.remove(&field_id);
        Ok(())
    }

    /// Sets the revision stamp of a version.
    pub fn set_revision(&mut self, key: &VersionKey, revision: impl Into<String>) -> StoreResult<()> {
        self.version_mut(key)?.revision = revision.into();
        Ok(())
    }

    fn version_mut(&mut self, key: &VersionKey) -> StoreResult<&mut ItemVersion> {
        let id = self.item.id;
        self.item
            .versions
            .get_mut(key)
            .ok_or_else(|| StoreError::VersionNotFound {
                id,
                language: key.language.clone(),
                number: key.number,
            })
    }
}

impl Drop for ItemEdit<'_> {
    fn drop(&mut self) {
        let id = self.item.id;
        {
            let mut items = self.store.items.write();
            // A concurrently deleted item stays deleted.
            if let Some(slot) = items.get_mut(&id) {
                *slot = self.item.clone();
            }
        }
        self.store.open_edits.lock().remove(&id);

        if self.item.name != self.original_name {
            self.store.events.emit(ItemEvent::item(
                &self.store.name,
                ItemEventKind::Renamed,
                id,
            ));
        }
        if self.item.template_id != self.original_template {
            self.store.events.emit(ItemEvent::item(
                &self.store.name,
                ItemEventKind::TemplateChanged,
                id,
            ));
        }
        self.store
            .events
            .emit(ItemEvent::item(&self.store.name, ItemEventKind::Saved, id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use crate::template::{Template, TemplateField};

    const TEMPLATE_ID: ItemId = ItemId::from_bytes([0x10; 16]);
    const ROOT_ID: ItemId = ItemId::from_bytes([0x01; 16]);
    const TITLE_ID: ItemId = ItemId::from_bytes([0x20; 16]);
    const BODY_ID: ItemId = ItemId::from_bytes([0x21; 16]);

    fn store() -> ItemStore {
        let store = ItemStore::new("master");
        store.templates().define(
            Template::new(TEMPLATE_ID, "page")
                .with_field(
                    TemplateField::new(TITLE_ID, "Title", FieldKind::Text, true)
                        .with_default("Untitled"),
                )
                .with_field(TemplateField::new(BODY_ID, "Body", FieldKind::Text, false)),
        );
        store.add_root("content", TEMPLATE_ID, ROOT_ID).unwrap();
        store
    }

    #[test]
    fn add_from_template_applies_defaults() {
        let store = store();
        let id = ItemId::from_bytes([0x02; 16]);
        let item = store
            .add_from_template("home", TEMPLATE_ID, ROOT_ID, id)
            .unwrap();

        assert_eq!(item.shared_field(TITLE_ID), Some(&FieldValue::text("Untitled")));
        assert_eq!(item.version_count(), 1);
        assert!(item.version(&VersionKey::new("en", 1)).is_some());
        assert_eq!(store.stats().items_created(), 2);
    }

    #[test]
    fn add_from_template_requires_parent_and_template() {
        let store = store();
        let err = store
            .add_from_template("x", TEMPLATE_ID, ItemId::from_bytes([0x99; 16]), ItemId::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::ParentNotFound { .. }));

        let err = store
            .add_from_template("x", ItemId::from_bytes([0x98; 16]), ROOT_ID, ItemId::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::TemplateNotFound { .. }));
    }

    #[test]
    fn duplicate_item_rejected() {
        let store = store();
        let err = store
            .add_from_template("again", TEMPLATE_ID, ROOT_ID, ROOT_ID)
            .unwrap_err();
        assert!(matches!(err, StoreError::ItemExists { .. }));
    }

    #[test]
    fn edit_commits_on_drop() {
        let store = store();
        {
            let mut edit = store.begin_edit(ROOT_ID).unwrap();
            edit.set_shared_field(TITLE_ID, FieldValue::text("Changed"));
        }
        store.invalidate_caches(ROOT_ID);
        let item = store.item(ROOT_ID).unwrap();
        assert_eq!(item.shared_field(TITLE_ID), Some(&FieldValue::text("Changed")));
        assert_eq!(store.stats().edits_opened(), 1);
    }

    #[test]
    fn edit_is_not_reentrant() {
        let store = store();
        let _edit = store.begin_edit(ROOT_ID).unwrap();
        let err = store.begin_edit(ROOT_ID).unwrap_err();
        assert!(matches!(err, StoreError::EditInProgress { .. }));
    }

    #[test]
    fn edit_reopens_after_drop() {
        let store = store();
        drop(store.begin_edit(ROOT_ID).unwrap());
        assert!(store.begin_edit(ROOT_ID).is_ok());
    }

    #[test]
    fn item_info_reads_through_data_cache() {
        let store = store();
        let info = store.item_info(ROOT_ID).unwrap();
        assert_eq!(info.name, "content");
        assert_eq!(info.template_id, TEMPLATE_ID);

        {
            let mut edit = store.begin_edit(ROOT_ID).unwrap();
            edit.set_name("renamed");
        }
        // Served from the data cache until explicitly invalidated.
        assert_eq!(store.item_info(ROOT_ID).unwrap().name, "content");
        store.invalidate_caches(ROOT_ID);
        assert_eq!(store.item_info(ROOT_ID).unwrap().name, "renamed");

        assert!(store.item_info(ItemId::new()).is_none());
    }

    #[test]
    fn cached_read_is_stale_until_invalidated() {
        let store = store();
        // Prime the cache.
        let before = store.item(ROOT_ID).unwrap();
        {
            let mut edit = store.begin_edit(ROOT_ID).unwrap();
            edit.set_name("renamed");
        }
        // Still served from cache.
        assert_eq!(store.item(ROOT_ID).unwrap().name(), before.name());

        store.invalidate_caches(ROOT_ID);
        assert_eq!(store.item(ROOT_ID).unwrap().name(), "renamed");
    }

    #[test]
    fn rename_emits_renamed_and_saved() {
        let store = store();
        let rx = store.events().subscribe();
        {
            let mut edit = store.begin_edit(ROOT_ID).unwrap();
            edit.set_name("renamed");
        }
        let kinds: Vec<ItemEventKind> = rx.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ItemEventKind::Renamed, ItemEventKind::Saved]);
    }

    #[test]
    fn move_item_reparents() {
        let store = store();
        let a = ItemId::from_bytes([0x02; 16]);
        let b = ItemId::from_bytes([0x03; 16]);
        store.add_from_template("a", TEMPLATE_ID, ROOT_ID, a).unwrap();
        store.add_from_template("b", TEMPLATE_ID, ROOT_ID, b).unwrap();

        store.move_item(b, a).unwrap();
        store.invalidate_caches(b);
        assert_eq!(store.item(b).unwrap().parent_id(), a);

        let err = store.move_item(b, ItemId::from_bytes([0x99; 16])).unwrap_err();
        assert!(matches!(err, StoreError::ParentNotFound { .. }));
    }

    #[test]
    fn version_lifecycle() {
        let store = store();
        let key = VersionKey::new("da", 1);
        store.add_version_at(ROOT_ID, key.clone()).unwrap();
        assert!(store.item_version(ROOT_ID, &key).is_some());
        assert!(store.version_revision(ROOT_ID, &key).is_some());

        let err = store.add_version_at(ROOT_ID, key.clone()).unwrap_err();
        assert!(matches!(err, StoreError::VersionExists { .. }));

        store.remove_version(ROOT_ID, &key).unwrap();
        assert!(store.item_version(ROOT_ID, &key).is_none());
        assert_eq!(store.stats().versions_removed(), 1);

        let err = store.remove_version(ROOT_ID, &key).unwrap_err();
        assert!(matches!(err, StoreError::VersionNotFound { .. }));
    }

    #[test]
    fn remove_all_versions_counts() {
        let store = store();
        store.add_version_at(ROOT_ID, VersionKey::new("da", 1)).unwrap();
        store.remove_all_versions(ROOT_ID).unwrap();
        // Initial "en#1" plus the added "da#1".
        assert_eq!(store.stats().versions_removed(), 2);
        store.invalidate_caches(ROOT_ID);
        assert_eq!(store.item(ROOT_ID).unwrap().version_count(), 0);
    }

    #[test]
    fn item_path_walks_parents() {
        let store = store();
        let a = ItemId::from_bytes([0x02; 16]);
        let b = ItemId::from_bytes([0x03; 16]);
        store.add_from_template("home", TEMPLATE_ID, ROOT_ID, a).unwrap();
        store.add_from_template("news", TEMPLATE_ID, a, b).unwrap();

        assert_eq!(store.item_path(b).unwrap(), "/content/home/news");
        assert!(store.item_path(ItemId::new()).is_none());
    }

    #[test]
    fn delete_item_removes() {
        let store = store();
        let a = ItemId::from_bytes([0x02; 16]);
        store.add_from_template("a", TEMPLATE_ID, ROOT_ID, a).unwrap();
        store.delete_item(a).unwrap();
        store.invalidate_caches(a);
        assert!(store.item(a).is_none());
        assert!(matches!(
            store.delete_item(a),
            Err(StoreError::ItemNotFound { .. })
        ));
    }

    #[test]
    fn edit_version_field_requires_version() {
        let store = store();
        let mut edit = store.begin_edit(ROOT_ID).unwrap();
        let missing = VersionKey::new("ja", 1);
        assert!(matches!(
            edit.set_version_field(&missing, BODY_ID, FieldValue::text("x")),
            Err(StoreError::VersionNotFound { .. })
        ));
        let present = VersionKey::new("en", 1);
        edit.set_version_field(&present, BODY_ID, FieldValue::text("x"))
            .unwrap();
        edit.set_revision(&present, "r2").unwrap();
        drop(edit);

        assert_eq!(
            store.version_revision(ROOT_ID, &present).as_deref(),
            Some("r2")
        );
    }
}
