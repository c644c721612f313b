//! Change-notification pipeline.
//!
//! Mutations emit [`ItemEvent`]s to all subscribers. The pipeline can be
//! suppressed for the duration of a scope (nested scopes stack); suppressed
//! events are dropped, not queued. A store configured for remote event
//! propagation additionally carries a queue of events awaiting remote
//! delivery.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use veridoc_model::ItemId;

/// Kind of change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEventKind {
    /// Item was created.
    Created,
    /// Item was saved through an edit transaction.
    Saved,
    /// Item was renamed.
    Renamed,
    /// Item template was changed.
    TemplateChanged,
    /// Item was moved to a new parent.
    Moved,
    /// A version was added.
    VersionAdded,
    /// A version was removed.
    VersionRemoved,
    /// Item was deleted.
    Deleted,
    /// A synchronization run finished.
    SyncFinished,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEvent {
    /// Name of the store the event originates from.
    pub database: String,
    /// Kind of change.
    pub kind: ItemEventKind,
    /// The item concerned; `None` for store-level events.
    pub item_id: Option<ItemId>,
}

impl ItemEvent {
    /// Creates an item-scoped event.
    pub fn item(database: impl Into<String>, kind: ItemEventKind, item_id: ItemId) -> Self {
        Self {
            database: database.into(),
            kind,
            item_id: Some(item_id),
        }
    }

    /// Creates the synchronization-finished event.
    pub fn sync_finished(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            kind: ItemEventKind::SyncFinished,
            item_id: None,
        }
    }
}

/// Distributes change notifications to subscribers.
#[derive(Debug)]
pub struct EventPipeline {
    subscribers: RwLock<Vec<Sender<ItemEvent>>>,
    suppressed: AtomicUsize,
    remote: Option<RwLock<Vec<ItemEvent>>>,
}

impl EventPipeline {
    /// Creates a pipeline; `remote_events` enables the remote delivery
    /// queue.
    #[must_use]
    pub fn new(remote_events: bool) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            suppressed: AtomicUsize::new(0),
            remote: remote_events.then(|| RwLock::new(Vec::new())),
        }
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> Receiver<ItemEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Suppresses notifications for the lifetime of the returned scope.
    ///
    /// Scopes nest; notifications resume when the last scope is dropped.
    /// The scope restores the previous state on every exit path.
    pub fn suppress(&self) -> EventScope<'_> {
        self.suppressed.fetch_add(1, Ordering::SeqCst);
        EventScope { pipeline: self }
    }

    /// Returns true while at least one suppression scope is active.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst) > 0
    }

    /// Emits a notification unless suppressed.
    ///
    /// Disconnected subscribers are dropped.
    pub fn emit(&self, event: ItemEvent) {
        if self.is_suppressed() {
            return;
        }
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns true when remote event propagation is configured.
    #[must_use]
    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Queues an event for remote delivery; no-op without remote
    /// propagation.
    pub fn queue_remote(&self, event: ItemEvent) {
        if let Some(queue) = &self.remote {
            queue.write().push(event);
        }
    }

    /// Drains the remote delivery queue.
    #[must_use]
    pub fn drain_remote(&self) -> Vec<ItemEvent> {
        match &self.remote {
            Some(queue) => std::mem::take(&mut *queue.write()),
            None => Vec::new(),
        }
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventPipeline {
    fn default() -> Self {
        Self::new(false)
    }
}

/// RAII suppression scope returned by [`EventPipeline::suppress`].
#[derive(Debug)]
pub struct EventScope<'a> {
    pipeline: &'a EventPipeline,
}

impl Drop for EventScope<'_> {
    fn drop(&mut self) {
        self.pipeline.suppressed.fetch_sub(1, Ordering::SeqCst);
    }
}
