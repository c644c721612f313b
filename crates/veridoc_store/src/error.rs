//! Error types for the item store.

use thiserror::Error;
use veridoc_model::ItemId;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in item store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No item with the given ID exists.
    #[error("item not found: {id}")]
    ItemNotFound {
        /// The missing item.
        id: ItemId,
    },

    /// An item with the given ID already exists.
    #[error("item already exists: {id}")]
    ItemExists {
        /// The duplicated item.
        id: ItemId,
    },

    /// The requested parent does not exist.
    #[error("parent not found: {id}")]
    ParentNotFound {
        /// The missing parent.
        id: ItemId,
    },

    /// The requested version does not exist on the item.
    #[error("version {language}#{number} not found on item {id}")]
    VersionNotFound {
        /// The item.
        id: ItemId,
        /// Language of the missing version.
        language: String,
        /// Number of the missing version.
        number: u32,
    },

    /// The version already exists on the item.
    #[error("version {language}#{number} already exists on item {id}")]
    VersionExists {
        /// The item.
        id: ItemId,
        /// Language of the duplicated version.
        language: String,
        /// Number of the duplicated version.
        number: u32,
    },

    /// No template with the given ID is defined.
    #[error("template not found: {id}")]
    TemplateNotFound {
        /// The missing template.
        id: ItemId,
    },

    /// An edit transaction is already open for the item.
    #[error("edit already in progress for item {id}")]
    EditInProgress {
        /// The item being edited.
        id: ItemId,
    },

    /// The named trail table does not exist.
    #[error("unknown trail table: {name}")]
    UnknownTrailTable {
        /// The missing table.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let id = ItemId::from_bytes([1u8; 16]);
        let err = StoreError::VersionNotFound {
            id,
            language: "en".into(),
            number: 2,
        };
        assert!(err.to_string().contains("en#2"));
        assert!(err.to_string().contains(&id.to_string()));
    }
}
