//! Store configuration.

/// Configuration for an [`ItemStore`](crate::ItemStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Language assigned to the initial version of freshly created items.
    pub default_language: String,
    /// Whether change events are also queued for remote delivery.
    pub remote_events: bool,
}

impl StoreConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default language.
    #[must_use]
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Enables or disables remote event propagation.
    #[must_use]
    pub fn with_remote_events(mut self, enabled: bool) -> Self {
        self.remote_events = enabled;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            remote_events: false,
        }
    }
}
