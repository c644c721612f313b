//! Serialized item, version and field value objects.

use crate::id::ItemId;
use thiserror::Error;

/// Violation of a serialized item invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidItem {
    /// The item ID is nil.
    #[error("item ID must not be nil")]
    NilId,

    /// The parent ID is nil.
    #[error("parent ID must not be nil for item {id}")]
    NilParentId {
        /// The offending item.
        id: ItemId,
    },

    /// The template ID is nil.
    #[error("template ID must not be nil for item {id}")]
    NilTemplateId {
        /// The offending item.
        id: ItemId,
    },

    /// The item name is empty.
    #[error("item name must not be empty for item {id}")]
    EmptyName {
        /// The offending item.
        id: ItemId,
    },

    /// A version number is zero.
    #[error("version number must be positive for language '{language}'")]
    ZeroVersion {
        /// Language of the offending version.
        language: String,
    },

    /// Two versions share the same (language, number) pair.
    #[error("duplicate version {language}#{version}")]
    DuplicateVersion {
        /// Language of the duplicated version.
        language: String,
        /// Number of the duplicated version.
        version: u32,
    },
}

/// One field value as serialized.
///
/// The value is always textual at this layer; blob fields carry their
/// Base64-encoded bytes. Fields with no value are omitted from their
/// containing sequence rather than stored as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncField {
    /// Field identifier.
    pub field_id: ItemId,
    /// Field name (diagnostic).
    pub name: String,
    /// Field key (diagnostic).
    pub key: String,
    /// Field value.
    pub value: String,
}

impl SyncField {
    /// Creates a field value.
    pub fn new(
        field_id: ItemId,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field_id,
            name: name.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One language + numeric-version instance of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncVersion {
    /// Language tag, e.g. `en`.
    pub language: String,
    /// Version number (positive).
    pub version: u32,
    /// Opaque revision stamp used for change detection.
    pub revision: String,
    /// Version-scoped (non-shared) field values.
    pub fields: Vec<SyncField>,
}

impl SyncVersion {
    /// Creates an empty version.
    pub fn new(language: impl Into<String>, version: u32, revision: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            version,
            revision: revision.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field value.
    pub fn add_field(
        &mut self,
        field_id: ItemId,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.fields.push(SyncField::new(field_id, name, key, value));
    }
}

/// One content item as serialized, with all its language/version field sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedItem {
    /// Item identifier.
    pub id: ItemId,
    /// Parent item identifier.
    pub parent_id: ItemId,
    /// Name of the store the item belongs to.
    pub database: String,
    /// Item name.
    pub name: String,
    /// Branch identifier; nil when the item has no branch.
    pub branch_id: ItemId,
    /// Template identifier.
    pub template_id: ItemId,
    /// Template name (diagnostic).
    pub template_name: String,
    /// Human-readable item path (diagnostic only).
    pub item_path: String,
    /// Field values common to all languages and versions.
    pub shared_fields: Vec<SyncField>,
    /// Language/version instances, one per (language, number) pair.
    pub versions: Vec<SyncVersion>,
}

impl SerializedItem {
    /// Creates an item with no fields or versions.
    pub fn new(
        id: ItemId,
        parent_id: ItemId,
        database: impl Into<String>,
        name: impl Into<String>,
        template_id: ItemId,
    ) -> Self {
        Self {
            id,
            parent_id,
            database: database.into(),
            name: name.into(),
            branch_id: ItemId::nil(),
            template_id,
            template_name: String::new(),
            item_path: String::new(),
            shared_fields: Vec::new(),
            versions: Vec::new(),
        }
    }

    /// Sets the branch identifier.
    #[must_use]
    pub fn with_branch(mut self, branch_id: ItemId) -> Self {
        self.branch_id = branch_id;
        self
    }

    /// Sets the template name.
    #[must_use]
    pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = name.into();
        self
    }

    /// Sets the diagnostic item path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.item_path = path.into();
        self
    }

    /// Appends a shared field value.
    pub fn add_shared_field(
        &mut self,
        field_id: ItemId,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.shared_fields
            .push(SyncField::new(field_id, name, key, value));
    }

    /// Adds a version and returns a handle to it.
    ///
    /// A duplicate (language, number) pair is ignored and `None` is
    /// returned, leaving the existing version untouched.
    pub fn add_version(
        &mut self,
        language: impl Into<String>,
        version: u32,
        revision: impl Into<String>,
    ) -> Option<&mut SyncVersion> {
        let language = language.into();
        if self
            .versions
            .iter()
            .any(|v| v.language == language && v.version == version)
        {
            return None;
        }
        self.versions.push(SyncVersion::new(language, version, revision));
        self.versions.last_mut()
    }

    /// Looks up a version by (language, number).
    #[must_use]
    pub fn version(&self, language: &str, version: u32) -> Option<&SyncVersion> {
        self.versions
            .iter()
            .find(|v| v.language == language && v.version == version)
    }

    /// Checks the item invariants.
    ///
    /// ID, parent ID and template ID must be non-nil, the name non-empty,
    /// version numbers positive and (language, number) pairs unique.
    pub fn validate(&self) -> Result<(), InvalidItem> {
        if self.id.is_nil() {
            return Err(InvalidItem::NilId);
        }
        if self.parent_id.is_nil() {
            return Err(InvalidItem::NilParentId { id: self.id });
        }
        if self.template_id.is_nil() {
            return Err(InvalidItem::NilTemplateId { id: self.id });
        }
        if self.name.is_empty() {
            return Err(InvalidItem::EmptyName { id: self.id });
        }
        let mut seen = std::collections::HashSet::new();
        for version in &self.versions {
            if version.version == 0 {
                return Err(InvalidItem::ZeroVersion {
                    language: version.language.clone(),
                });
            }
            if !seen.insert((version.language.as_str(), version.version)) {
                return Err(InvalidItem::DuplicateVersion {
                    language: version.language.clone(),
                    version: version.version,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> SerializedItem {
        SerializedItem::new(ItemId::new(), ItemId::new(), "master", "Home", ItemId::new())
    }

    #[test]
    fn valid_item_passes() {
        let mut item = item();
        item.add_version("en", 1, "r1");
        item.add_version("en", 2, "r2");
        item.add_version("da", 1, "r3");
        assert_eq!(item.validate(), Ok(()));
    }

    #[test]
    fn duplicate_version_is_ignored() {
        let mut item = item();
        assert!(item.add_version("en", 1, "r1").is_some());
        assert!(item.add_version("en", 1, "r-other").is_none());
        assert_eq!(item.versions.len(), 1);
        assert_eq!(item.version("en", 1).unwrap().revision, "r1");
    }

    #[test]
    fn empty_name_rejected() {
        let mut item = item();
        item.name.clear();
        assert!(matches!(item.validate(), Err(InvalidItem::EmptyName { .. })));
    }

    #[test]
    fn nil_ids_rejected() {
        let mut item = item();
        item.parent_id = ItemId::nil();
        assert!(matches!(
            item.validate(),
            Err(InvalidItem::NilParentId { .. })
        ));

        let mut item = self::item();
        item.template_id = ItemId::nil();
        assert!(matches!(
            item.validate(),
            Err(InvalidItem::NilTemplateId { .. })
        ));
    }

    #[test]
    fn zero_version_rejected() {
        let mut item = item();
        item.versions.push(SyncVersion::new("en", 0, "r"));
        assert!(matches!(item.validate(), Err(InvalidItem::ZeroVersion { .. })));
    }

    #[test]
    fn duplicate_pushed_directly_rejected() {
        let mut item = item();
        item.versions.push(SyncVersion::new("en", 1, "a"));
        item.versions.push(SyncVersion::new("en", 1, "b"));
        assert!(matches!(
            item.validate(),
            Err(InvalidItem::DuplicateVersion { .. })
        ));
    }
}
