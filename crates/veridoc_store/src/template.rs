//! Templates and the store-owned template engine.

use crate::field::FieldKind;
use crate::item::LiveItem;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use veridoc_model::{well_known, ItemId};

/// One field declared by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    /// Field identifier.
    pub id: ItemId,
    /// Field name.
    pub name: String,
    /// Lower-case lookup key.
    pub key: String,
    /// Declared field type.
    pub kind: FieldKind,
    /// Whether the value is shared across all languages and versions.
    pub shared: bool,
    /// Textual default value, if any.
    pub default_value: Option<String>,
}

impl TemplateField {
    /// Creates a field declaration. The key is derived from the name.
    pub fn new(id: ItemId, name: impl Into<String>, kind: FieldKind, shared: bool) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        Self {
            id,
            name,
            key,
            kind,
            shared,
            default_value: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Schema definition declaring which fields an item of this type may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id: ItemId,
    name: String,
    fields: Vec<TemplateField>,
}

impl Template {
    /// Creates an empty template.
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn with_field(mut self, field: TemplateField) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the template identifier.
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates the declared fields, excluding the built-in standard ones.
    pub fn fields(&self) -> impl Iterator<Item = &TemplateField> {
        self.fields.iter()
    }

    /// Looks up a field by ID.
    ///
    /// The built-in standard fields (owner, revision) are present on every
    /// template and resolve here as well.
    #[must_use]
    pub fn field(&self, id: ItemId) -> Option<&TemplateField> {
        self.fields
            .iter()
            .find(|f| f.id == id)
            .or_else(|| standard_fields().iter().find(|f| f.id == id))
    }
}

/// Fields implicitly present on every template.
fn standard_fields() -> &'static [TemplateField] {
    static FIELDS: OnceLock<Vec<TemplateField>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        vec![
            TemplateField::new(well_known::OWNER_FIELD_ID, "Owner", FieldKind::Text, false),
            TemplateField::new(
                well_known::REVISION_FIELD_ID,
                "Revision",
                FieldKind::Text,
                false,
            ),
        ]
    })
}

/// Store-owned template service.
///
/// Templates are registered as definitions; reads go through a cache that
/// [`invalidate`](TemplateEngine::invalidate) clears. The synchronization
/// engine resets this cache at the points where template shape may have
/// just changed underfoot.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    definitions: RwLock<HashMap<ItemId, Arc<Template>>>,
    cache: RwLock<HashMap<ItemId, Arc<Template>>>,
}

impl TemplateEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a template definition.
    pub fn define(&self, template: Template) {
        let id = template.id;
        self.definitions.write().insert(id, Arc::new(template));
        // A replaced definition must not be served from the cache.
        self.cache.write().remove(&id);
    }

    /// Resolves a template by ID, filling the cache on a miss.
    #[must_use]
    pub fn template(&self, id: ItemId) -> Option<Arc<Template>> {
        if let Some(cached) = self.cache.read().get(&id) {
            return Some(Arc::clone(cached));
        }
        let template = Arc::clone(self.definitions.read().get(&id)?);
        self.cache.write().insert(id, Arc::clone(&template));
        Some(template)
    }

    /// Clears the template cache.
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    /// Returns the number of cached templates.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Returns true if the item participates in defining a template.
    #[must_use]
    pub fn is_template_part(&self, item: &LiveItem) -> bool {
        item.template_id() == well_known::TEMPLATE_DEFINITION_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template::new(ItemId::from_bytes([1u8; 16]), "page").with_field(TemplateField::new(
            ItemId::from_bytes([2u8; 16]),
            "Title",
            FieldKind::Text,
            true,
        ))
    }

    #[test]
    fn field_lookup_includes_standard_fields() {
        let template = template();
        assert!(template.field(ItemId::from_bytes([2u8; 16])).is_some());
        assert!(template.field(well_known::OWNER_FIELD_ID).is_some());
        assert!(template.field(ItemId::from_bytes([9u8; 16])).is_none());
    }

    #[test]
    fn key_derived_from_name() {
        let field = TemplateField::new(ItemId::new(), "Long Title", FieldKind::Text, true);
        assert_eq!(field.key, "long title");
    }

    #[test]
    fn cache_fills_and_invalidates() {
        let engine = TemplateEngine::new();
        let template = template();
        let id = template.id();
        engine.define(template);

        assert_eq!(engine.cached_count(), 0);
        assert!(engine.template(id).is_some());
        assert_eq!(engine.cached_count(), 1);

        engine.invalidate();
        assert_eq!(engine.cached_count(), 0);
        // Definition survives the cache reset.
        assert!(engine.template(id).is_some());
    }

    #[test]
    fn redefinition_evicts_cache_entry() {
        let engine = TemplateEngine::new();
        let id = ItemId::from_bytes([1u8; 16]);
        engine.define(Template::new(id, "old"));
        assert_eq!(engine.template(id).unwrap().name(), "old");

        engine.define(Template::new(id, "new"));
        assert_eq!(engine.template(id).unwrap().name(), "new");
    }

    #[test]
    fn unknown_template_is_none() {
        let engine = TemplateEngine::new();
        assert!(engine.template(ItemId::new()).is_none());
    }
}
