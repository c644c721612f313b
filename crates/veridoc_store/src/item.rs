//! Live items and their language/number versions.

use crate::field::FieldValue;
use crate::template::Template;
use std::collections::BTreeMap;
use std::fmt;
use veridoc_model::ItemId;

/// Mints a fresh opaque revision stamp.
#[must_use]
pub fn new_revision() -> String {
    ItemId::new().to_string()
}

/// Identity of one version: language plus positive number.
///
/// Ordered by language name, then number — the order versions are
/// serialized in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionKey {
    /// Language tag, e.g. `en`.
    pub language: String,
    /// Version number.
    pub number: u32,
}

impl VersionKey {
    /// Creates a version key.
    pub fn new(language: impl Into<String>, number: u32) -> Self {
        Self {
            language: language.into(),
            number,
        }
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.language, self.number)
    }
}

/// One live version: revision stamp plus version-scoped field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemVersion {
    pub(crate) revision: String,
    pub(crate) fields: BTreeMap<ItemId, FieldValue>,
}

impl ItemVersion {
    pub(crate) fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns the revision stamp.
    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Returns the stored value of a field, if any.
    #[must_use]
    pub fn field(&self, field_id: ItemId) -> Option<&FieldValue> {
        self.fields.get(&field_id)
    }

    /// Iterates the stored field values.
    pub fn fields(&self) -> impl Iterator<Item = (&ItemId, &FieldValue)> {
        self.fields.iter()
    }

    /// Resolves a field value: the stored value, else the template default.
    #[must_use]
    pub fn resolved(&self, template: &Template, field_id: ItemId) -> Option<FieldValue> {
        if let Some(value) = self.fields.get(&field_id) {
            return Some(value.clone());
        }
        template
            .field(field_id)?
            .default_value
            .as_ref()
            .map(|v| FieldValue::Text(v.clone()))
    }
}

/// One live, mutable item in a store.
///
/// Instances handed out by the store are snapshots; all mutation goes
/// through a scoped edit transaction or a store-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveItem {
    pub(crate) id: ItemId,
    pub(crate) parent_id: ItemId,
    pub(crate) template_id: ItemId,
    pub(crate) branch_id: ItemId,
    pub(crate) name: String,
    pub(crate) shared: BTreeMap<ItemId, FieldValue>,
    pub(crate) versions: BTreeMap<VersionKey, ItemVersion>,
}

impl LiveItem {
    pub(crate) fn new(id: ItemId, parent_id: ItemId, template_id: ItemId, name: &str) -> Self {
        Self {
            id,
            parent_id,
            template_id,
            branch_id: ItemId::nil(),
            name: name.to_string(),
            shared: BTreeMap::new(),
            versions: BTreeMap::new(),
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Returns the parent item identifier.
    #[must_use]
    pub fn parent_id(&self) -> ItemId {
        self.parent_id
    }

    /// Returns the template identifier.
    #[must_use]
    pub fn template_id(&self) -> ItemId {
        self.template_id
    }

    /// Returns the branch identifier; nil when the item has no branch.
    #[must_use]
    pub fn branch_id(&self) -> ItemId {
        self.branch_id
    }

    /// Returns the item name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stored value of a shared field, if any.
    #[must_use]
    pub fn shared_field(&self, field_id: ItemId) -> Option<&FieldValue> {
        self.shared.get(&field_id)
    }

    /// Iterates the stored shared field values.
    pub fn shared_fields(&self) -> impl Iterator<Item = (&ItemId, &FieldValue)> {
        self.shared.iter()
    }

    /// Returns the IDs of all stored shared fields.
    #[must_use]
    pub fn shared_field_ids(&self) -> Vec<ItemId> {
        self.shared.keys().copied().collect()
    }

    /// Resolves a shared field value: the stored value, else the template
    /// default.
    #[must_use]
    pub fn resolved_shared(&self, template: &Template, field_id: ItemId) -> Option<FieldValue> {
        if let Some(value) = self.shared.get(&field_id) {
            return Some(value.clone());
        }
        template
            .field(field_id)?
            .default_value
            .as_ref()
            .map(|v| FieldValue::Text(v.clone()))
    }

    /// Looks up a version.
    #[must_use]
    pub fn version(&self, key: &VersionKey) -> Option<&ItemVersion> {
        self.versions.get(key)
    }

    /// Iterates the versions in ascending (language, number) order.
    pub fn versions(&self) -> impl Iterator<Item = (&VersionKey, &ItemVersion)> {
        self.versions.iter()
    }

    /// Returns the identities of all versions.
    #[must_use]
    pub fn version_keys(&self) -> Vec<VersionKey> {
        self.versions.keys().cloned().collect()
    }

    /// Returns the number of versions.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Returns the IDs of all stored fields of a version.
    #[must_use]
    pub fn version_field_ids(&self, key: &VersionKey) -> Vec<ItemId> {
        self.versions
            .get(key)
            .map(|v| v.fields.keys().copied().collect())
            .unwrap_or_default()
    }
}
