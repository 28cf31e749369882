//! Working sets and the stage that restricts a subscriber's set to one.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::subscriber::supervised_roots;
use super::{InputState, SubscriberInput, SyncSetInput, SyncSetInputFromSyncSet};
use crate::error::Result;
use crate::filter::{AcceptAll, FilterRef};
use crate::jobs::CancelToken;
use crate::model::ResourcePath;
use crate::source::{ResourceDelta, SourceEvent, SyncSource};
use crate::syncset::SyncSet;

/// A named set of root paths. Resources outside every root are out of
/// scope. A working set without roots scopes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSet {
    pub name: String,
    #[serde(default)]
    pub roots: Vec<ResourcePath>,
}

impl WorkingSet {
    #[must_use]
    pub fn new(name: impl Into<String>, roots: Vec<ResourcePath>) -> Self {
        Self {
            name: name.into(),
            roots,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether `path` is at or below one of the roots. An empty working
    /// set contains everything.
    #[must_use]
    pub fn contains(&self, path: &ResourcePath) -> bool {
        self.is_empty() || self.roots.iter().any(|root| root.is_prefix_of(path))
    }
}

impl fmt::Display for WorkingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.name)?;
        for (i, root) in self.roots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{root}")?;
        }
        write!(f, ")")
    }
}

/// A [`SubscriberInput`] followed by a stage scoped to a working set.
///
/// The subscriber tracks every out-of-sync resource of the source (the
/// workspace-wide set). The scoped stage mirrors it, dropping resources
/// outside the working set, so changing the working set never re-queries
/// the source.
pub struct WorkingSetInput {
    subscriber: SubscriberInput,
    scoped: Arc<SyncSetInputFromSyncSet>,
    working_set: RwLock<Option<WorkingSet>>,
}

impl WorkingSetInput {
    #[must_use]
    pub fn new(source: Arc<dyn SyncSource>, filter: FilterRef) -> Self {
        let subscriber = SubscriberInput::new(source, Arc::new(AcceptAll));
        let scoped = SyncSetInputFromSyncSet::new(Arc::clone(subscriber.sync_set()), filter);
        Self {
            subscriber,
            scoped,
            working_set: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn subscriber(&self) -> &SubscriberInput {
        &self.subscriber
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn SyncSource> {
        self.subscriber.source()
    }

    /// Every out-of-sync resource of the source, working set or not.
    #[must_use]
    pub fn workspace_sync_set(&self) -> &Arc<SyncSet> {
        self.subscriber.sync_set()
    }

    pub fn connect(&self) {
        self.subscriber.connect();
        self.scoped.connect();
    }

    pub fn disconnect(&self) {
        self.scoped.disconnect();
        self.subscriber.disconnect();
    }

    pub fn resource_changed(&self, delta: &ResourceDelta) {
        self.subscriber.resource_changed(delta);
    }

    pub fn source_changed(&self, events: &[SourceEvent]) {
        self.subscriber.source_changed(events);
    }

    #[must_use]
    pub fn working_set(&self) -> Option<WorkingSet> {
        self.working_set.read().clone()
    }

    /// Scope the stage to `working_set` (`None` or an empty working set
    /// lifts the scope) and rebuild the scoped set if connected. The
    /// workspace-wide set is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Cancelled`] if the rebuild is
    /// cancelled.
    pub fn set_working_set(&self, working_set: Option<WorkingSet>, cancel: &CancelToken) -> Result<()> {
        let scope = scope_of(working_set.as_ref());
        match &working_set {
            Some(ws) => info!(working_set = %ws, "working set changed"),
            None => info!("working set cleared"),
        }
        *self.working_set.write() = working_set;
        self.scoped.set_scope(scope, cancel)
    }

    /// The working-set roots the source supervises, or every source root
    /// when unscoped.
    #[must_use]
    pub fn roots(&self) -> Vec<ResourcePath> {
        let scope = scope_of(self.working_set.read().as_ref());
        supervised_roots(self.source().as_ref(), scope)
    }
}

fn scope_of(working_set: Option<&WorkingSet>) -> Option<Vec<ResourcePath>> {
    working_set
        .filter(|ws| !ws.is_empty())
        .map(|ws| ws.roots.clone())
}

impl SyncSetInput for WorkingSetInput {
    fn sync_set(&self) -> &Arc<SyncSet> {
        self.scoped.sync_set()
    }

    fn filter(&self) -> FilterRef {
        self.scoped.filter()
    }

    fn state(&self) -> InputState {
        self.scoped.state()
    }

    /// Rebuild from the source. The scoped set follows the subscriber's
    /// reset event; it is rebuilt directly only if that event carried
    /// nothing.
    fn reset(&self, cancel: &CancelToken) -> Result<()> {
        self.subscriber.reset(cancel)?;
        if self.scoped.state() == InputState::Populated {
            Ok(())
        } else {
            self.scoped.reset(cancel)
        }
    }

    fn set_filter(&self, filter: FilterRef, cancel: &CancelToken) -> Result<()> {
        self.scoped.set_filter(filter, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SyncInfo, SyncKind};
    use crate::source::{DeltaFlags, MemorySource};
    use crate::syncset::SyncSetChangedEvent;
    use parking_lot::Mutex;

    fn p(s: &str) -> ResourcePath {
        ResourcePath::parse(s).unwrap()
    }

    fn outgoing(path: &str) -> SyncInfo {
        SyncInfo::file(p(path), SyncKind::OUTGOING.with(SyncKind::CHANGE))
    }

    fn input() -> (Arc<MemorySource>, WorkingSetInput) {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        source.add_root(p("/q"));
        for path in ["/p/src/a.rs", "/p/docs/b.md", "/q/c.txt"] {
            source.set(outgoing(path));
        }
        let input = WorkingSetInput::new(Arc::clone(&source) as Arc<dyn SyncSource>, Arc::new(AcceptAll));
        input.connect();
        input.reset(&CancelToken::new()).unwrap();
        (source, input)
    }

    #[test]
    fn test_working_set_contains() {
        let ws = WorkingSet::new("src", vec![p("/p/src")]);
        assert!(ws.contains(&p("/p/src/a.rs")));
        assert!(!ws.contains(&p("/p/docs")));
        assert!(WorkingSet::new("all", vec![]).contains(&p("/anything")));
        assert_eq!(ws.to_string(), "src (/p/src)");
    }

    #[test]
    fn test_set_working_set_rebuilds_scoped() {
        let (_source, input) = input();
        assert_eq!(input.sync_set().size(), 3);

        input
            .set_working_set(Some(WorkingSet::new("src", vec![p("/p/src"), p("/q")])), &CancelToken::new())
            .unwrap();
        let paths: Vec<String> = input
            .sync_set()
            .all_members()
            .into_iter()
            .map(|i| i.path.to_string())
            .collect();
        assert_eq!(paths, vec!["/p/src/a.rs", "/q/c.txt"]);
        assert_eq!(input.roots(), vec![p("/p/src"), p("/q")]);

        input.set_working_set(None, &CancelToken::new()).unwrap();
        assert_eq!(input.sync_set().size(), 3);
        assert_eq!(input.roots(), vec![p("/p"), p("/q")]);
    }

    #[test]
    fn test_out_of_scope_changes_are_ignored() {
        let (source, input) = input();
        input
            .set_working_set(Some(WorkingSet::new("src", vec![p("/p/src")])), &CancelToken::new())
            .unwrap();

        source.set(outgoing("/p/docs/new.md"));
        source.set(outgoing("/p/src/new.rs"));
        input.resource_changed(&ResourceDelta::changed(p("/p"), DeltaFlags::NONE).with_children([
            ResourceDelta::added(p("/p/docs/new.md")),
            ResourceDelta::added(p("/p/src/new.rs")),
        ]));

        assert!(input.sync_set().contains(&p("/p/src/new.rs")));
        assert!(!input.sync_set().contains(&p("/p/docs/new.md")));
        assert!(input.workspace_sync_set().contains(&p("/p/docs/new.md")));
    }

    #[test]
    fn test_set_working_set_keeps_workspace_set() {
        let (source, input) = input();
        let workspace_events = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&workspace_events);
        input
            .workspace_sync_set()
            .add_listener(Arc::new(move |_: &SyncSetChangedEvent| *sink.lock() += 1));
        let queries = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&queries);
        source.set_query_hook(move |_| *counter.lock() += 1);

        input
            .set_working_set(Some(WorkingSet::new("q", vec![p("/q")])), &CancelToken::new())
            .unwrap();

        assert_eq!(input.sync_set().size(), 1);
        assert_eq!(input.workspace_sync_set().size(), 3);
        assert_eq!(*workspace_events.lock(), 0);
        assert_eq!(*queries.lock(), 0);
    }

    #[test]
    fn test_refresh_without_changes_populates_scoped() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        let input = WorkingSetInput::new(Arc::clone(&source) as Arc<dyn SyncSource>, Arc::new(AcceptAll));
        input.connect();
        input.reset(&CancelToken::new()).unwrap();
        assert_eq!(input.state(), InputState::Populated);
        assert!(input.sync_set().is_empty());
    }

    #[test]
    fn test_set_working_set_while_disconnected_only_stores() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        let input = WorkingSetInput::new(source, Arc::new(AcceptAll));
        input
            .set_working_set(Some(WorkingSet::new("ws", vec![p("/p")])), &CancelToken::new())
            .unwrap();
        assert_eq!(input.working_set().unwrap().name, "ws");
        assert_eq!(input.state(), InputState::Disconnected);
    }
}
