//! The composite input behind a synchronize view.
//!
//! A [`SyncView`] keeps three sync sets:
//!
//! 1. every out-of-sync resource of the source (the "workspace sync set")
//! 2. those in the working set (the "working set sync set"), both held by
//!    a [`WorkingSetInput`]
//! 3. those passing the display filter, held by a
//!    [`SyncSetInputFromSyncSet`] (the "filtered sync set")
//!
//! Changing the working set rebuilds the last two; changing the display
//! filter rebuilds only the last.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::filter::{AcceptAll, FilterRef};
use crate::input::{SyncSetInput, SyncSetInputFromSyncSet, WorkingSet, WorkingSetInput};
use crate::jobs::{CancelToken, ChangeSink, TaskHandle, WorkerPool};
use crate::model::{ModelElement, ResourceType};
use crate::source::{ResourceDelta, SourceEvent, SyncSource};
use crate::syncset::{SyncSet, SyncSetStatistics};

/// Snapshot of what a view is showing.
#[derive(Debug, Clone, Serialize)]
pub struct ViewStatus {
    /// Resources passing the display filter.
    pub showing: usize,
    /// Resources in the working set, before the display filter.
    pub in_working_set: usize,
    /// Every out-of-sync resource of the source.
    pub in_workspace: usize,
    pub working_set: Option<String>,
    pub source: String,
    /// Per-kind counts of the shown resources.
    pub statistics: SyncSetStatistics,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl ViewStatus {
    /// Whether the display filter hides anything.
    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        self.showing != self.in_working_set
    }

    /// Out-of-sync resources the working set leaves out.
    #[must_use]
    pub const fn outside_working_set(&self) -> usize {
        self.in_workspace.saturating_sub(self.in_working_set)
    }
}

impl fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_filtered() {
            write!(f, "showing {} of {} changes", self.showing, self.in_working_set)
        } else {
            write!(f, "{} changes", self.showing)
        }
    }
}

/// Workspace, working-set and display-filter stages, driven as one unit.
pub struct SyncView {
    working_set_input: WorkingSetInput,
    filtered: Arc<SyncSetInputFromSyncSet>,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for SyncView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncView").finish_non_exhaustive()
    }
}

impl SyncView {
    #[must_use]
    pub fn new(source: Arc<dyn SyncSource>, filter: FilterRef) -> Self {
        let working_set_input = WorkingSetInput::new(source, Arc::new(AcceptAll));
        let filtered =
            SyncSetInputFromSyncSet::new(Arc::clone(working_set_input.sync_set()), filter);
        Self {
            working_set_input,
            filtered,
            last_refreshed: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn SyncSource> {
        self.working_set_input.source()
    }

    pub fn connect(&self) {
        self.working_set_input.connect();
        self.filtered.connect();
    }

    pub fn disconnect(&self) {
        self.filtered.disconnect();
        self.working_set_input.disconnect();
    }

    /// Rebuild from the source. The filtered set follows through the
    /// working-set stage's reset event.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::NotConnected`] before
    /// [`connect`](Self::connect) and [`crate::error::Error::Cancelled`]
    /// when cancelled.
    pub fn refresh(&self, cancel: &CancelToken) -> Result<()> {
        self.working_set_input.reset(cancel)?;
        *self.last_refreshed.write() = Some(Utc::now());
        info!(
            source = %self.source().id(),
            showing = self.filtered_sync_set().size(),
            in_working_set = self.working_set_sync_set().size(),
            in_workspace = self.workspace_sync_set().size(),
            "refresh complete"
        );
        Ok(())
    }

    /// Run [`refresh`](Self::refresh) on `pool`, yielding the resulting
    /// status.
    pub fn refresh_in_background(self: &Arc<Self>, pool: &WorkerPool) -> TaskHandle<ViewStatus> {
        let view = Arc::clone(self);
        pool.submit(move |cancel| {
            view.refresh(cancel)?;
            Ok(view.status())
        })
    }

    #[must_use]
    pub fn working_set(&self) -> Option<WorkingSet> {
        self.working_set_input.working_set()
    }

    /// Change the working set, rebuilding the working-set and filtered
    /// sets. The source is not queried again.
    ///
    /// # Errors
    ///
    /// As [`refresh`](Self::refresh), when connected.
    pub fn set_working_set(&self, working_set: Option<WorkingSet>, cancel: &CancelToken) -> Result<()> {
        self.working_set_input.set_working_set(working_set, cancel)
    }

    #[must_use]
    pub fn filter(&self) -> FilterRef {
        self.filtered.filter()
    }

    /// Change the display filter. The working-set stage is left alone.
    ///
    /// # Errors
    ///
    /// As [`refresh`](Self::refresh).
    pub fn set_filter(&self, filter: FilterRef, cancel: &CancelToken) -> Result<()> {
        self.filtered.set_filter(filter, cancel)
    }

    /// The working-set roots as plain resource handles.
    #[must_use]
    pub fn working_set_roots(&self) -> Vec<ModelElement> {
        let source = self.source();
        self.working_set_input
            .roots()
            .into_iter()
            .map(|root| {
                let kind = source
                    .resource_type(&root)
                    .unwrap_or_else(|| ResourceType::container_for(&root));
                ModelElement::resource(root, kind)
            })
            .collect()
    }

    #[must_use]
    pub fn workspace_sync_set(&self) -> &Arc<SyncSet> {
        self.working_set_input.workspace_sync_set()
    }

    #[must_use]
    pub fn working_set_sync_set(&self) -> &Arc<SyncSet> {
        self.working_set_input.sync_set()
    }

    #[must_use]
    pub fn filtered_sync_set(&self) -> &Arc<SyncSet> {
        self.filtered.sync_set()
    }

    #[must_use]
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed.read()
    }

    #[must_use]
    pub fn status(&self) -> ViewStatus {
        let filtered = self.filtered_sync_set();
        ViewStatus {
            showing: filtered.size(),
            in_working_set: self.working_set_sync_set().size(),
            in_workspace: self.workspace_sync_set().size(),
            working_set: self.working_set().map(|ws| ws.name),
            source: self.source().name().to_string(),
            statistics: filtered.statistics(),
            last_refreshed: self.last_refreshed(),
        }
    }

    /// "Synchronize - (showing N of M changes, K outside working set) -
    /// working set - source". Each parenthesized part appears only when it
    /// hides something.
    #[must_use]
    pub fn title(&self) -> String {
        let status = self.status();
        let mut hidden = Vec::new();
        if status.is_filtered() {
            hidden.push(status.to_string());
        }
        let outside = status.outside_working_set();
        if outside > 0 {
            hidden.push(format!("{outside} outside working set"));
        }

        let mut title = String::from("Synchronize");
        if !hidden.is_empty() {
            title.push_str(&format!(" - ({})", hidden.join(", ")));
        }
        if let Some(name) = &status.working_set {
            title.push_str(&format!(" - {name}"));
        }
        title.push_str(&format!(" - {}", status.source));
        title
    }
}

impl ChangeSink for SyncView {
    fn resource_changed(&self, delta: &ResourceDelta) {
        self.working_set_input.resource_changed(delta);
    }

    fn source_changed(&self, events: &[SourceEvent]) {
        self.working_set_input.source_changed(events);
    }
}
