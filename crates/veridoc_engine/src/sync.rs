//! Reconciliation of serialized items against a live store.
//!
//! [`build_sync_item`] extracts the serialized form of a live item;
//! [`paste_sync_item`] merges a serialized item back in, creating, moving,
//! retemplating, updating fields and pruning stale versions as needed.

use crate::error::{EngineError, EngineResult};
use crate::options::LoadOptions;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use veridoc_model::{
    decode, decode_blob, encode, encode_blob, well_known, ItemId, SerializedItem, SyncField,
    SyncVersion,
};
use veridoc_store::{
    FieldKind, FieldValue, ItemEdit, ItemStore, LiveItem, StoreError, StoreRegistry, Template,
    TemplateField, VersionKey,
};

/// Extracts the serialized form of a live item.
///
/// Shared fields are the item's stored shared values whose IDs resolve on
/// its template; version fields analogously per version. Fields absent
/// from the template are silently skipped. Blob values are Base64-encoded
/// with line breaks. Versions come out ascending by (language, number).
pub fn build_sync_item(store: &ItemStore, id: ItemId) -> EngineResult<SerializedItem> {
    let item = store
        .item(id)
        .ok_or(EngineError::Store(StoreError::ItemNotFound { id }))?;
    let template = assert_template(store, item.template_id())?;

    let mut sync_item = SerializedItem::new(
        item.id(),
        item.parent_id(),
        store.name(),
        item.name(),
        item.template_id(),
    )
    .with_branch(item.branch_id())
    .with_template_name(template.name())
    .with_path(store.item_path(id).unwrap_or_default());

    for (field_id, value) in item.shared_fields() {
        let Some(declared) = template.field(*field_id) else {
            continue;
        };
        if declared.shared {
            sync_item.add_shared_field(*field_id, &declared.name, &declared.key, field_text(value));
        }
    }

    for (key, version) in item.versions() {
        let Some(sync_version) =
            sync_item.add_version(&key.language, key.number, version.revision())
        else {
            continue;
        };
        for (field_id, value) in version.fields() {
            let Some(declared) = template.field(*field_id) else {
                continue;
            };
            if !declared.shared {
                sync_version.add_field(*field_id, &declared.name, &declared.key, field_text(value));
            }
        }
    }
    Ok(sync_item)
}

/// Serializes a live item into the text format.
pub fn write_item(store: &ItemStore, id: ItemId, writer: &mut impl Write) -> EngineResult<()> {
    let text = encode(&build_sync_item(store, id)?);
    writer.write_all(text.as_bytes())?;
    Ok(())
}

/// Parses serialized text and merges it into a registered store.
pub fn read_item(
    registry: &StoreRegistry,
    text: &str,
    options: &LoadOptions,
    fail_on_inconsistency: bool,
) -> EngineResult<Option<LiveItem>> {
    let sync_item = decode(text)?;
    paste_sync_item(registry, &sync_item, options, fail_on_inconsistency)
}

/// Merges one serialized item into its target store.
///
/// Returns the resulting live item, or `None` when the data is
/// inconsistent (missing parent on the creation path) and
/// `fail_on_inconsistency` is false.
pub fn paste_sync_item(
    registry: &StoreRegistry,
    sync_item: &SerializedItem,
    options: &LoadOptions,
    fail_on_inconsistency: bool,
) -> EngineResult<Option<LiveItem>> {
    let store_name = options.database.as_deref().unwrap_or(&sync_item.database);
    let store = registry
        .get(store_name)
        .ok_or_else(|| EngineError::StoreNotFound {
            name: store_name.to_string(),
        })?;

    let parent = store.item(sync_item.parent_id);
    let id = if options.use_new_id {
        ItemId::new()
    } else {
        sync_item.id
    };
    let target = store.item(id);

    // Derived copy carrying the computed force flag; the caller's own
    // options stay untouched.
    let mut derived = options.clone();
    let mut created = false;
    let mut deferred: Option<EngineError> = None;

    match &target {
        None => {
            if parent.is_none() {
                if fail_on_inconsistency {
                    return Err(EngineError::ParentItemNotFound {
                        parent_id: sync_item.parent_id,
                        item_id: sync_item.id,
                    });
                }
                return Ok(None);
            }
            assert_template(&store, sync_item.template_id)?;
            store.add_from_template(&sync_item.name, sync_item.template_id, sync_item.parent_id, id)?;
            // Template-default versions must not survive into the merge.
            store.remove_all_versions(id)?;
            derived.force_update = true;
            created = true;
            tracing::debug!(item = %id, store = store_name, "created item for paste");
        }
        Some(existing) => {
            if !derived.force_update {
                derived.force_update = need_update(&store, id, sync_item);
            }
            if derived.force_update {
                if parent.is_none() && fail_on_inconsistency {
                    deferred = Some(EngineError::ParentForMovedItemNotFound {
                        parent_id: sync_item.parent_id,
                        item_id: id,
                    });
                }
                if let Some(parent) = &parent {
                    if parent.id() != existing.parent_id() {
                        store.move_item(id, parent.id())?;
                    }
                }
            }
        }
    }

    match apply_update(&store, id, sync_item, options, &derived) {
        Ok(item) => {
            if let Some(err) = deferred {
                return Err(err);
            }
            Ok(Some(item))
        }
        Err(
            err @ (EngineError::ParentItemNotFound { .. }
            | EngineError::ParentForMovedItemNotFound { .. }
            | EngineError::FieldMissingFromTemplate { .. }),
        ) => Err(err),
        Err(err) => {
            if created {
                // Do not leave a half-populated item behind.
                if let Err(rollback) = store.delete_item(id) {
                    tracing::warn!(item = %id, error = %rollback, "rollback of created item failed");
                }
                store.invalidate_caches(id);
            }
            Err(EngineError::PasteFailed {
                path: sync_item.item_path.clone(),
                source: Box::new(err),
            })
        }
    }
}

/// Applies the field and version updates of an already-resolved item.
fn apply_update(
    store: &ItemStore,
    id: ItemId,
    sync_item: &SerializedItem,
    options: &LoadOptions,
    derived: &LoadOptions,
) -> EngineResult<LiveItem> {
    let mut item = fetch(store, id)?;
    let mut mutated = false;

    if derived.force_update {
        if item.template_id() != sync_item.template_id {
            {
                let mut edit = store.begin_edit(id)?;
                edit.set_template(sync_item.template_id);
            }
            // Template change can silently alter field layout.
            store.invalidate_caches(id);
            item = fetch(store, id)?;
        }
        if item.name() != sync_item.name || item.branch_id() != sync_item.branch_id {
            {
                let mut edit = store.begin_edit(id)?;
                edit.set_name(&sync_item.name);
                edit.set_branch(sync_item.branch_id);
            }
            store.invalidate_caches(id);
            item = fetch(store, id)?;
        }
        resync_template_engine(store, &item);

        // The edit commits on drop even when a paste fails partway, so
        // caches must be invalidated before the error propagates.
        let pasted = paste_shared_pass(store, id, sync_item, options);
        store.invalidate_caches(id);
        pasted?;
        item = fetch(store, id)?;
        resync_template_engine(store, &item);
        mutated = true;
    }

    let mut pending: HashSet<VersionKey> = HashSet::new();
    if derived.force_update {
        pending.extend(item.version_keys());
    }
    for version in &sync_item.versions {
        if paste_version(store, id, version, &mut pending, derived)? {
            mutated = true;
        }
    }
    if derived.force_update {
        // Live versions absent from the serialized form are stale.
        for key in &pending {
            store.remove_version(id, key)?;
            mutated = true;
        }
    }

    if mutated {
        store.invalidate_caches(id);
    }
    fetch(store, id)
}

/// Merges one serialized version, tracking survivors in the pending
/// deletion set.
fn paste_version(
    store: &ItemStore,
    id: ItemId,
    sync_version: &SyncVersion,
    pending: &mut HashSet<VersionKey>,
    options: &LoadOptions,
) -> EngineResult<bool> {
    let key = VersionKey::new(&sync_version.language, sync_version.version);
    let live_revision = store.version_revision(id, &key);
    let stale = live_revision.as_deref() != Some(sync_version.revision.as_str());
    if !options.force_update && !stale {
        return Ok(false);
    }

    if live_revision.is_none() {
        store.add_version_at(id, key.clone())?;
    } else {
        pending.remove(&key);
    }

    // As in the shared pass: the edit commits whatever was written before
    // a failure, so invalidate before propagating.
    let written = write_version_fields(store, id, &key, sync_version, options);
    store.invalidate_caches(id);
    written?;
    let item = fetch(store, id)?;
    resync_template_engine(store, &item);
    Ok(true)
}

/// Runs the shared-field pass inside one edit transaction.
fn paste_shared_pass(
    store: &ItemStore,
    id: ItemId,
    sync_item: &SerializedItem,
    options: &LoadOptions,
) -> EngineResult<()> {
    let mut edit = store.begin_edit(id)?;
    if options.force_update {
        for field_id in edit.item().shared_field_ids() {
            edit.reset_shared_field(field_id);
        }
    }
    for field in &sync_item.shared_fields {
        paste_shared_field(store, &mut edit, field)?;
    }
    Ok(())
}

/// Writes one version's fields inside one edit transaction.
///
/// The revision stamp is set last; a failed paste leaves it stale so the
/// next merge retries the version.
fn write_version_fields(
    store: &ItemStore,
    id: ItemId,
    key: &VersionKey,
    sync_version: &SyncVersion,
    options: &LoadOptions,
) -> EngineResult<()> {
    let mut edit = store.begin_edit(id)?;
    if options.force_update {
        for field_id in edit.item().version_field_ids(key) {
            edit.reset_version_field(key, field_id)?;
        }
    }
    let mut owner_supplied = false;
    for field in &sync_version.fields {
        if field.field_id == well_known::OWNER_FIELD_ID {
            owner_supplied = true;
        }
        let declared = resolve_template_field(store, edit.item().template_id(), id, field)?;
        let value = field_payload(declared.kind, field)?;
        edit.set_version_field(key, field.field_id, value)?;
    }
    if !owner_supplied {
        // A payload that omits ownership must not inherit a stale owner.
        edit.reset_version_field(key, well_known::OWNER_FIELD_ID)?;
    }
    edit.set_revision(key, &sync_version.revision)?;
    Ok(())
}

/// Pastes one shared field through an open edit.
fn paste_shared_field(
    store: &ItemStore,
    edit: &mut ItemEdit<'_>,
    field: &SyncField,
) -> EngineResult<()> {
    let item_id = edit.item().id();
    let declared = resolve_template_field(store, edit.item().template_id(), item_id, field)?;
    edit.set_shared_field(field.field_id, field_payload(declared.kind, field)?);
    Ok(())
}

/// Returns true if any serialized version differs from its live
/// equivalent (or has none).
fn need_update(store: &ItemStore, id: ItemId, sync_item: &SerializedItem) -> bool {
    sync_item.versions.iter().any(|version| {
        let key = VersionKey::new(&version.language, version.version);
        store.version_revision(id, &key).as_deref() != Some(version.revision.as_str())
    })
}

/// Resolves a template, retrying once after a cache reset.
fn assert_template(store: &ItemStore, id: ItemId) -> EngineResult<Arc<Template>> {
    if let Some(template) = store.templates().template(id) {
        return Ok(template);
    }
    store.templates().invalidate();
    store
        .templates()
        .template(id)
        .ok_or(EngineError::Store(StoreError::TemplateNotFound { id }))
}

/// Resolves a field declaration, retrying once after a template-cache
/// reset — templates may have just changed underfoot.
fn resolve_template_field(
    store: &ItemStore,
    template_id: ItemId,
    item_id: ItemId,
    field: &SyncField,
) -> EngineResult<TemplateField> {
    let template = assert_template(store, template_id)?;
    if let Some(declared) = template.field(field.field_id) {
        return Ok(declared.clone());
    }
    store.templates().invalidate();
    let template = assert_template(store, template_id)?;
    template
        .field(field.field_id)
        .cloned()
        .ok_or_else(|| EngineError::FieldMissingFromTemplate {
            field_name: field.name.clone(),
            template_name: template.name().to_string(),
            item_id,
        })
}

/// Converts a serialized value to its stored form.
///
/// A blob-typed field whose value is not itself an identifier reference
/// is Base64-decoded to raw bytes; everything else is stored as text.
fn field_payload(kind: FieldKind, field: &SyncField) -> EngineResult<FieldValue> {
    if kind == FieldKind::Blob && ItemId::parse(&field.value).is_none() {
        return Ok(FieldValue::Blob(decode_blob(&field.value)?));
    }
    Ok(FieldValue::Text(field.value.clone()))
}

/// Converts a stored value to its serialized text.
fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::Blob(bytes) => encode_blob(bytes),
    }
}

/// Resets the template engine view when the item itself defines a
/// template; metadata changes must be visible to subsequent validation.
fn resync_template_engine(store: &ItemStore, item: &LiveItem) {
    if store.templates().is_template_part(item) {
        store.templates().invalidate();
    }
}

fn fetch(store: &ItemStore, id: ItemId) -> EngineResult<LiveItem> {
    store
        .item(id)
        .ok_or(EngineError::Store(StoreError::ItemNotFound { id }))
}
