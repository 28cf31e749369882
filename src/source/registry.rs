//! Explicit registry of sync sources, built at startup and passed around.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::SyncSource;
use crate::error::{Error, Result};

/// Source id → source.
#[derive(Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn SyncSource>>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under its id, replacing any previous one.
    pub fn register(&mut self, source: Arc<dyn SyncSource>) -> Option<Arc<dyn SyncSource>> {
        let id = source.id().to_string();
        debug!(source = %id, "registered sync source");
        self.sources.insert(id, source)
    }

    /// Look up a source by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if no source has that id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn SyncSource>> {
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SourceNotFound { id: id.to_string() })
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<dyn SyncSource>> {
        self.sources.remove(id)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_register_get_remove() {
        let mut registry = SourceRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(MemorySource::new("b", "B")));
        registry.register(Arc::new(MemorySource::new("a", "A")));

        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().name(), "A");
        assert!(registry.remove("a").is_some());
        assert_eq!(registry.len(), 1);

        let err = registry.get("a").unwrap_err();
        assert_eq!(err.error_code().as_str(), "SOURCE_NOT_FOUND");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SourceRegistry::new();
        assert!(registry.register(Arc::new(MemorySource::new("a", "First"))).is_none());
        assert!(registry.register(Arc::new(MemorySource::new("a", "Second"))).is_some());
        assert_eq!(registry.get("a").unwrap().name(), "Second");
    }
}
