//! Well-known field and template identifiers.
//!
//! These IDs are fixed across every store. They identify the standard
//! fields present on all templates plus the template that marks items as
//! template definitions.

use crate::id::ItemId;

/// Field holding the account that owns a version.
///
/// Serialized payloads that omit this field must not inherit a stale owner:
/// the synchronization engine resets it to its default when absent.
pub const OWNER_FIELD_ID: ItemId = ItemId::from_bytes([
    0x5E, 0x9A, 0x1C, 0x40, 0x7B, 0x2D, 0x4F, 0x86, 0x9D, 0x01, 0xC3, 0xE4, 0x55, 0x26, 0x70, 0x01,
]);

/// Field mirroring the per-version revision stamp.
pub const REVISION_FIELD_ID: ItemId = ItemId::from_bytes([
    0x5E, 0x9A, 0x1C, 0x40, 0x7B, 0x2D, 0x4F, 0x86, 0x9D, 0x01, 0xC3, 0xE4, 0x55, 0x26, 0x70, 0x02,
]);

/// Template assigned to items that themselves define templates.
///
/// The template engine must be re-synchronized after such an item changes,
/// since template metadata affects subsequent field validation.
pub const TEMPLATE_DEFINITION_ID: ItemId = ItemId::from_bytes([
    0x5E, 0x9A, 0x1C, 0x40, 0x7B, 0x2D, 0x4F, 0x86, 0x9D, 0x01, 0xC3, 0xE4, 0x55, 0x26, 0x70, 0x10,
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct() {
        assert_ne!(OWNER_FIELD_ID, REVISION_FIELD_ID);
        assert_ne!(OWNER_FIELD_ID, TEMPLATE_DEFINITION_ID);
        assert_ne!(REVISION_FIELD_ID, TEMPLATE_DEFINITION_ID);
    }

    #[test]
    fn ids_are_not_nil() {
        assert!(!OWNER_FIELD_ID.is_nil());
        assert!(!REVISION_FIELD_ID.is_nil());
        assert!(!TEMPLATE_DEFINITION_ID.is_nil());
    }
}
