//! Load configuration.

use std::path::PathBuf;

/// Configuration for loading serialized items.
///
/// The engine treats the caller's options as read-only; it works on an
/// internal derived copy when it needs to track a computed force flag.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Target store override; resolved from the item's own database name
    /// when absent.
    pub database: Option<String>,
    /// Bypass revision comparison and rewrite every field, resetting
    /// absent ones to their template defaults.
    pub force_update: bool,
    /// Mint a new identity instead of reusing the serialized one.
    pub use_new_id: bool,
    /// Suppress the store's change notifications for the duration of the
    /// load, then fire one explicit completion notification afterward.
    pub disable_events: bool,
    /// Base path used for human-readable diagnostics only.
    pub root: Option<PathBuf>,
}

impl LoadOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target store override.
    #[must_use]
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    /// Enables or disables the forced full update.
    #[must_use]
    pub fn with_force_update(mut self, force: bool) -> Self {
        self.force_update = force;
        self
    }

    /// Enables or disables minting a new identity.
    #[must_use]
    pub fn with_use_new_id(mut self, use_new_id: bool) -> Self {
        self.use_new_id = use_new_id;
        self
    }

    /// Enables or disables event suppression.
    #[must_use]
    pub fn with_disable_events(mut self, disable: bool) -> Self {
        self.disable_events = disable;
        self
    }

    /// Sets the diagnostic root path.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}
