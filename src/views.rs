//! One [`SyncView`] per registered sync source, with one of them active.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filter::FilterRef;
use crate::source::{SourceRegistry, SyncSource};
use crate::view::SyncView;

/// Owns the source registry and a connected view for every source in it.
///
/// Views are activated most-recent-last; removing the active source hands
/// activation back to the one active before it.
pub struct SyncViews {
    registry: SourceRegistry,
    filter: FilterRef,
    views: BTreeMap<String, Arc<SyncView>>,
    /// Source ids, least recently active first.
    history: Vec<String>,
}

impl SyncViews {
    /// New views start with `filter` as their display filter.
    #[must_use]
    pub fn new(filter: FilterRef) -> Self {
        Self {
            registry: SourceRegistry::new(),
            filter,
            views: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Register `source` and open a connected view on it. The first source
    /// added becomes active. A source with an id already present replaces
    /// it, disconnecting the old view.
    pub fn add_source(&mut self, source: Arc<dyn SyncSource>) -> Arc<SyncView> {
        let id = source.id().to_string();
        let view = Arc::new(SyncView::new(Arc::clone(&source), Arc::clone(&self.filter)));
        view.connect();

        self.registry.register(source);
        if let Some(old) = self.views.insert(id.clone(), Arc::clone(&view)) {
            debug!(source = %id, "replacing view");
            old.disconnect();
        } else {
            self.history.insert(0, id.clone());
        }
        info!(source = %id, views = self.views.len(), "view added");
        view
    }

    /// Remove a source and disconnect its view. If it was active, the
    /// previously active view takes over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if no source has that id.
    pub fn remove_source(&mut self, id: &str) -> Result<Arc<SyncView>> {
        let view = self
            .views
            .remove(id)
            .ok_or_else(|| Error::SourceNotFound { id: id.to_string() })?;
        self.registry.remove(id);
        self.history.retain(|other| other != id);
        view.disconnect();
        info!(source = %id, active = ?self.active_id(), "view removed");
        Ok(view)
    }

    /// Make the view of `id` the active one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if no source has that id.
    pub fn activate(&mut self, id: &str) -> Result<Arc<SyncView>> {
        let view = self.get(id)?;
        self.history.retain(|other| other != id);
        self.history.push(id.to_string());
        debug!(source = %id, "view activated");
        Ok(view)
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    #[must_use]
    pub fn active(&self) -> Option<Arc<SyncView>> {
        self.active_id().and_then(|id| self.views.get(id).cloned())
    }

    /// The view of source `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if no source has that id.
    pub fn get(&self, id: &str) -> Result<Arc<SyncView>> {
        self.views
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SourceNotFound { id: id.to_string() })
    }

    /// Source ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.registry.ids()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
