//! Loading serialized items from disk.
//!
//! [`load_item`] reads a serialized file, merges it through the
//! synchronization engine, classifies failures and handles event
//! suppression plus the completion notification.

use crate::error::{EngineError, EngineResult};
use crate::job::{log_error, log_info};
use crate::options::LoadOptions;
use crate::sync::paste_sync_item;
use std::cell::Cell;
use std::path::{Component, Path};
use std::sync::Arc;
use veridoc_model::decode;
use veridoc_store::{ItemEvent, ItemStore, LiveItem, StoreRegistry};

thread_local! {
    static HANDLER_DISABLED: Cell<bool> = const { Cell::new(false) };
}

/// Returns true while a load on the current thread has disabled the item
/// handler, guarding against reentrant handling of the store mutations a
/// load performs.
#[must_use]
pub fn item_handler_disabled() -> bool {
    HANDLER_DISABLED.with(Cell::get)
}

/// Disables the item handler for the guard's lifetime, restoring the
/// previous state on every exit path.
struct ItemHandlerGuard {
    previous: bool,
}

impl ItemHandlerGuard {
    fn disable() -> Self {
        let previous = HANDLER_DISABLED.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for ItemHandlerGuard {
    fn drop(&mut self) {
        HANDLER_DISABLED.with(|flag| flag.set(self.previous));
    }
}

/// Loads a serialized item from a file and merges it into its store.
///
/// A missing file yields `Ok(None)`. With `disable_events` set, the target
/// store's notifications are suppressed for the duration and exactly one
/// sync-finished notification is emitted afterward, regardless of outcome.
pub fn load_item(
    registry: &StoreRegistry,
    path: &Path,
    options: &LoadOptions,
) -> EngineResult<Option<LiveItem>> {
    if !options.disable_events {
        return do_load_item(registry, path, options);
    }
    let target = target_store(registry, path, options);
    let result = {
        let _suppressed = target.as_deref().map(|store| store.events().suppress());
        do_load_item(registry, path, options)
    };
    if let Some(store) = &target {
        sync_finished(store);
    }
    result
}

fn do_load_item(
    registry: &StoreRegistry,
    path: &Path,
    options: &LoadOptions,
) -> EngineResult<Option<LiveItem>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    let shown = display_path(path, options);
    log_info(&format!("loading item from path {shown}"));

    let _handler = ItemHandlerGuard::disable();
    let sync_item = decode(&text)?;
    match paste_sync_item(registry, &sync_item, options, true) {
        Ok(item) => Ok(item),
        Err(EngineError::ParentItemNotFound { parent_id, .. }) => {
            log_error(&format!(
                "cannot load item from path '{shown}'; possible reason: parent item \
                 with ID '{parent_id}' not found"
            ));
            Ok(None)
        }
        Err(EngineError::ParentForMovedItemNotFound { parent_id, item_id }) => {
            log_error(&format!(
                "item from path '{shown}' cannot be moved to appropriate location; \
                 possible reason: parent item with ID '{parent_id}' not found"
            ));
            // The rest of the sync succeeded; hand back the item as-is.
            let store_name = options.database.as_deref().unwrap_or(&sync_item.database);
            Ok(registry
                .get(store_name)
                .and_then(|store| store.item(item_id)))
        }
        Err(err) => Err(err),
    }
}

/// Resolves the store the completion notification targets: the explicit
/// option, else the first path component under the serialization root.
fn target_store(
    registry: &StoreRegistry,
    path: &Path,
    options: &LoadOptions,
) -> Option<Arc<ItemStore>> {
    if let Some(name) = &options.database {
        return registry.get(name);
    }
    let relative = options
        .root
        .as_deref()
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    let name = relative.components().find_map(|component| match component {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })?;
    registry.get(&name)
}

fn sync_finished(store: &ItemStore) {
    let event = ItemEvent::sync_finished(store.name());
    store.events().emit(event.clone());
    if store.events().remote_enabled() {
        store.events().queue_remote(event);
    }
}

fn display_path(path: &Path, options: &LoadOptions) -> String {
    options
        .root
        .as_deref()
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_guard_restores_previous_state() {
        assert!(!item_handler_disabled());
        {
            let _outer = ItemHandlerGuard::disable();
            assert!(item_handler_disabled());
            {
                let _inner = ItemHandlerGuard::disable();
                assert!(item_handler_disabled());
            }
            assert!(item_handler_disabled());
        }
        assert!(!item_handler_disabled());
    }

    #[test]
    fn display_path_strips_root() {
        let options = LoadOptions::new().with_root("/srv/serialization");
        assert_eq!(
            display_path(Path::new("/srv/serialization/master/content.item"), &options),
            "master/content.item"
        );
        assert_eq!(
            display_path(Path::new("/elsewhere/content.item"), &options),
            "/elsewhere/content.item"
        );
    }

    #[test]
    fn target_store_prefers_explicit_database() {
        let registry = StoreRegistry::new();
        registry.register(Arc::new(ItemStore::new("master")));
        registry.register(Arc::new(ItemStore::new("web")));

        let options = LoadOptions::new()
            .with_database("web")
            .with_root("/srv/serialization");
        let store = target_store(
            &registry,
            Path::new("/srv/serialization/master/content.item"),
            &options,
        )
        .unwrap();
        assert_eq!(store.name(), "web");
    }

    #[test]
    fn target_store_falls_back_to_path_component() {
        let registry = StoreRegistry::new();
        registry.register(Arc::new(ItemStore::new("master")));

        let options = LoadOptions::new().with_root("/srv/serialization");
        let store = target_store(
            &registry,
            Path::new("/srv/serialization/master/content.item"),
            &options,
        )
        .unwrap();
        assert_eq!(store.name(), "master");

        assert!(target_store(
            &registry,
            Path::new("/srv/serialization/core/content.item"),
            &options,
        )
        .is_none());
    }
}
