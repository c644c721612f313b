//! Error types for the synchronization engine.

use thiserror::Error;
use veridoc_model::{CodecError, ItemId};
use veridoc_store::StoreError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while merging or loading serialized items.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The parent of an item to be created does not exist.
    ///
    /// Recoverable: callers may skip the item instead of failing.
    #[error("parent item {parent_id} not found for item {item_id}")]
    ParentItemNotFound {
        /// The missing parent.
        parent_id: ItemId,
        /// The item that could not be created.
        item_id: ItemId,
    },

    /// The parent an existing item should move under does not exist.
    ///
    /// The rest of the update is still applied; this is surfaced only
    /// after mutation, and only to strict callers.
    #[error("parent item {parent_id} not found for moved item {item_id}")]
    ParentForMovedItemNotFound {
        /// The missing move target.
        parent_id: ItemId,
        /// The item that could not be moved.
        item_id: ItemId,
    },

    /// A serialized field has no definition on the item's template, even
    /// after a template-cache refresh.
    #[error("field '{field_name}' does not exist in template '{template_name}' (item {item_id})")]
    FieldMissingFromTemplate {
        /// Name of the undefined field.
        field_name: String,
        /// Name of the resolved template.
        template_name: String,
        /// The item being pasted into.
        item_id: ItemId,
    },

    /// No store with the given name is registered.
    #[error("store not found: {name}")]
    StoreNotFound {
        /// The unknown store name.
        name: String,
    },

    /// The serialized text could not be parsed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading the serialized file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Merging a serialized item failed partway through.
    ///
    /// A freshly created item has been rolled back before this is raised.
    #[error("failed to paste item: {path}")]
    PasteFailed {
        /// Diagnostic path of the serialized item.
        path: String,
        /// The underlying failure.
        source: Box<EngineError>,
    },
}
