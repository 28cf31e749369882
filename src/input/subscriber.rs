//! Stage populated from a sync source and its change notifications.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::{InputCore, InputState, SyncSetInput};
use crate::error::{Error, Result};
use crate::filter::FilterRef;
use crate::jobs::CancelToken;
use crate::model::{ResourcePath, SyncInfo};
use crate::source::{
    DeltaFlags, DeltaKind, Depth, ResourceDelta, SourceEvent, SyncSource, walk_out_of_sync,
};
use crate::syncset::SyncSet;

/// Tracks the out-of-sync resources of one [`SyncSource`].
///
/// A full rebuild asks the source for everything; afterwards the stage is
/// kept current by [`resource_changed`](Self::resource_changed) and
/// [`source_changed`](Self::source_changed). Each delivered notification
/// becomes exactly one transaction on the set.
pub struct SubscriberInput {
    core: InputCore,
    source: Arc<dyn SyncSource>,
}

impl SubscriberInput {
    #[must_use]
    pub fn new(source: Arc<dyn SyncSource>, filter: FilterRef) -> Self {
        Self {
            core: InputCore::new(filter),
            source,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn SyncSource> {
        &self.source
    }

    #[must_use]
    pub fn core(&self) -> &InputCore {
        &self.core
    }

    pub fn connect(&self) {
        let _writer = self.core.lock();
        if self.core.state() == InputState::Disconnected {
            self.core.set_state(InputState::Connected);
            info!(source = %self.source.id(), "input connected");
        }
    }

    pub fn disconnect(&self) {
        self.core.disconnect();
        info!(source = %self.source.id(), "input disconnected");
    }

    /// Roots a full rebuild enumerates: the scope roots the source
    /// supervises, or every source root when unscoped.
    #[must_use]
    pub fn roots(&self) -> Vec<ResourcePath> {
        supervised_roots(self.source.as_ref(), self.core.scope())
    }

    /// Out-of-sync resources below `roots`, by bulk enumeration when the
    /// source supports it and by walking its members otherwise.
    fn gather(&self, roots: &[ResourcePath], cancel: &CancelToken) -> Result<Vec<SyncInfo>> {
        match self.source.all_out_of_sync(roots, Depth::Infinite, cancel) {
            Err(Error::Unsupported(reason)) => {
                debug!(%reason, "falling back to a deep walk");
                walk_out_of_sync(self.source.as_ref(), roots, Depth::Infinite, cancel)
            }
            other => other,
        }
    }

    fn fetch_input(&self, cancel: &CancelToken) -> Result<()> {
        for root in self.roots() {
            cancel.check()?;
            for info in self.gather(std::slice::from_ref(&root), cancel)? {
                cancel.check()?;
                self.core.collect(info);
            }
        }
        Ok(())
    }

    /// Re-read one resource from the source.
    ///
    /// A resource the source cannot answer for keeps its tracked state.
    fn recompute(&self, path: &ResourcePath) {
        match self.source.sync_info(path) {
            Ok(Some(info)) if info.is_out_of_sync() => self.core.collect(info),
            Ok(_) => self.core.remove(path),
            Err(e) => warn!(resource = %path, error = %e, "Sync status unavailable; keeping prior state"),
        }
    }

    /// Collect everything out of sync at or below `path`.
    fn collect_deep(&self, path: &ResourcePath) {
        if !self.source.is_supervised(path) {
            trace!(resource = %path, "not supervised");
            return;
        }
        match self.gather(std::slice::from_ref(path), &CancelToken::new()) {
            Ok(infos) => infos.into_iter().for_each(|info| self.core.collect(info)),
            Err(e) => warn!(resource = %path, error = %e, "Subtree status unavailable"),
        }
    }

    fn process_delta(&self, delta: &ResourceDelta) {
        let path = &delta.path;
        match delta.kind {
            DeltaKind::Added => {
                self.collect_deep(path);
                return;
            }
            DeltaKind::Removed => {
                self.core.remove_all(path);
                return;
            }
            DeltaKind::Changed => {
                if delta.flags.contains(DeltaFlags::TYPE) {
                    self.core.remove_all(path);
                    self.collect_deep(path);
                    return;
                }
                if delta.flags.contains(DeltaFlags::OPEN) {
                    if self.source.resource_type(path).is_some() {
                        debug!(project = %path, "opened");
                        self.collect_deep(path);
                    } else {
                        debug!(project = %path, "closed");
                        self.core.remove_all(path);
                    }
                    return;
                }
                if delta.flags.contains(DeltaFlags::CONTENT) {
                    self.recompute(path);
                }
            }
        }
        for child in &delta.children {
            self.process_delta(child);
        }
    }

    /// Apply a resource delta tree as one transaction.
    pub fn resource_changed(&self, delta: &ResourceDelta) {
        let _writer = self.core.lock();
        if !self.core.is_connected() {
            trace!(resource = %delta.path, "disconnected; delta ignored");
            return;
        }
        let _batch = self.core.sync_set().batch();
        self.process_delta(delta);
    }

    /// Apply a batch of source notifications as one transaction.
    pub fn source_changed(&self, events: &[SourceEvent]) {
        let _writer = self.core.lock();
        if !self.core.is_connected() {
            trace!(events = events.len(), "disconnected; source events ignored");
            return;
        }
        let _batch = self.core.sync_set().batch();
        for event in events {
            trace!(%event, "source event");
            match event {
                SourceEvent::SyncChanged(path) => self.recompute(path),
                SourceEvent::ProviderConfigured(root) => self.collect_deep(root),
                SourceEvent::ProviderDeconfigured(root) => {
                    self.core.remove_all(root);
                }
            }
        }
    }
}

/// The roots of `source` that lie in `scope`: scope roots the source
/// supervises as they are, others narrowed to the source roots below them.
/// Nested roots are dropped. Without a scope, every source root.
pub(crate) fn supervised_roots(
    source: &dyn SyncSource,
    scope: Option<Vec<ResourcePath>>,
) -> Vec<ResourcePath> {
    let source_roots = source.roots();
    let Some(scope) = scope else {
        return source_roots;
    };

    let mut roots = Vec::new();
    for root in scope {
        if source.is_supervised(&root) {
            roots.push(root);
        } else {
            roots.extend(
                source_roots
                    .iter()
                    .filter(|source_root| root.is_prefix_of(source_root))
                    .cloned(),
            );
        }
    }
    roots.sort();
    roots.dedup();
    // Drop roots nested inside other roots.
    let nested: Vec<bool> = roots
        .iter()
        .map(|r| roots.iter().any(|other| other != r && other.is_prefix_of(r)))
        .collect();
    roots
        .into_iter()
        .zip(nested)
        .filter_map(|(root, nested)| (!nested).then_some(root))
        .collect()
}

impl SyncSetInput for SubscriberInput {
    fn sync_set(&self) -> &Arc<SyncSet> {
        self.core.sync_set()
    }

    fn filter(&self) -> FilterRef {
        self.core.filter()
    }

    fn state(&self) -> InputState {
        self.core.state()
    }

    fn reset(&self, cancel: &CancelToken) -> Result<()> {
        debug!(source = %self.source.id(), "resetting from source");
        self.core.reset_with(|| self.fetch_input(cancel))
    }

    fn set_filter(&self, filter: FilterRef, cancel: &CancelToken) -> Result<()> {
        let _writer = self.core.lock();
        self.core.replace_filter(filter);
        self.reset(cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAll, DirectionFilter};
    use crate::model::{ResourceType, SyncKind};
    use crate::source::MemorySource;
    use crate::syncset::SyncSetChangedEvent;
    use parking_lot::Mutex;

    fn p(s: &str) -> ResourcePath {
        ResourcePath::parse(s).unwrap()
    }

    fn outgoing(path: &str) -> SyncInfo {
        SyncInfo::file(p(path), SyncKind::OUTGOING.with(SyncKind::CHANGE))
    }

    fn incoming(path: &str) -> SyncInfo {
        SyncInfo::file(p(path), SyncKind::INCOMING.with(SyncKind::CHANGE))
    }

    fn memory() -> Arc<MemorySource> {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        source.set(outgoing("/p/a/b/File.txt"));
        source.set(incoming("/p/a/c/File2.txt"));
        source.set_in_sync(p("/p/a/c/Same.txt"), ResourceType::File);
        source
    }

    fn connected(source: &Arc<MemorySource>) -> SubscriberInput {
        let input = SubscriberInput::new(Arc::clone(source) as Arc<dyn SyncSource>, Arc::new(AcceptAll));
        input.connect();
        input.reset(&CancelToken::new()).unwrap();
        input
    }

    fn recorder(set: &SyncSet) -> Arc<Mutex<Vec<SyncSetChangedEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        set.add_listener(Arc::new(move |event: &SyncSetChangedEvent| {
            sink.lock().push(event.clone());
        }));
        events
    }

    #[test]
    fn test_reset_populates_from_source() {
        let source = memory();
        let input = connected(&source);
        assert_eq!(input.sync_set().size(), 2);
        assert_eq!(input.state(), InputState::Populated);
    }

    #[test]
    fn test_reset_falls_back_to_walk() {
        let source = memory();
        source.set_bulk_supported(false);
        let input = connected(&source);
        assert_eq!(input.sync_set().size(), 2);
    }

    #[test]
    fn test_reset_cancelled_midway() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        for i in 0..10 {
            source.set(outgoing(&format!("/p/d{i}/f{i}.txt")));
        }
        source.set_bulk_supported(false);

        let input = SubscriberInput::new(Arc::clone(&source) as Arc<dyn SyncSource>, Arc::new(AcceptAll));
        input.connect();
        input.reset(&CancelToken::new()).unwrap();
        let events = recorder(input.sync_set());

        let cancel = CancelToken::new();
        let seen = Arc::new(Mutex::new(0usize));
        let (hook_cancel, hook_seen) = (cancel.clone(), Arc::clone(&seen));
        source.set_query_hook(move |path| {
            if path.segment_count() == 3 {
                let mut seen = hook_seen.lock();
                *seen += 1;
                if *seen == 3 {
                    hook_cancel.cancel();
                }
            }
        });

        let err = input.reset(&cancel).unwrap_err();
        assert!(err.is_cancelled());

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_reset());
        assert!(!input.sync_set().in_transaction());
        input.sync_set().check_invariants().unwrap();
    }

    #[test]
    fn test_reset_disconnected_fails() {
        let input = SubscriberInput::new(memory(), Arc::new(AcceptAll));
        let err = input.reset(&CancelToken::new()).unwrap_err();
        assert_eq!(err.error_code().as_str(), "NOT_CONNECTED");
    }

    #[test]
    fn test_container_delete_is_one_transaction_with_one_root() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        for path in ["/p/x/a/1", "/p/x/a/2", "/p/x/b/3", "/p/x/4", "/p/x/c/d/5", "/p/y/6"] {
            source.set(outgoing(path));
        }
        let input = connected(&source);
        let events = recorder(input.sync_set());

        source.delete(&p("/p/x"));
        input.resource_changed(
            &ResourceDelta::changed(p("/p"), DeltaFlags::NONE)
                .with_child(ResourceDelta::removed(p("/p/x"))),
        );

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].removed_roots(), &[p("/p/x")]);
        assert_eq!(events[0].removed_entries().len(), 5);
    }

    #[test]
    fn test_content_change_recomputes() {
        let source = memory();
        let input = connected(&source);

        source.set(incoming("/p/a/b/File.txt"));
        source.set_in_sync(p("/p/a/c/File2.txt"), ResourceType::File);
        input.resource_changed(&ResourceDelta::changed(p("/p/a"), DeltaFlags::NONE).with_children([
            ResourceDelta::changed(p("/p/a/b/File.txt"), DeltaFlags::CONTENT),
            ResourceDelta::changed(p("/p/a/c/File2.txt"), DeltaFlags::CONTENT),
        ]));

        assert_eq!(input.sync_set().all_members(), vec![incoming("/p/a/b/File.txt")]);
    }

    fn shape(set: &SyncSet, container: &ResourcePath) -> Vec<(ResourcePath, ResourceType)> {
        set.members(container)
            .into_iter()
            .map(|element| (element.path().clone(), element.resource_type()))
            .collect()
    }

    #[test]
    fn test_type_change_file_to_folder() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        source.set(outgoing("/p/x"));
        let input = connected(&source);
        let events = recorder(input.sync_set());

        source.delete(&p("/p/x"));
        source.set(SyncInfo::new(
            p("/p/x"),
            ResourceType::Folder,
            SyncKind::OUTGOING.with(SyncKind::ADDITION),
        ));
        source.set(outgoing("/p/x/y"));
        input.resource_changed(
            &ResourceDelta::changed(p("/p"), DeltaFlags::NONE)
                .with_child(ResourceDelta::changed(p("/p/x"), DeltaFlags::TYPE)),
        );

        let set = input.sync_set();
        assert_eq!(shape(set, &p("/p")), vec![(p("/p/x"), ResourceType::Folder)]);
        assert_eq!(shape(set, &p("/p/x")), vec![(p("/p/x/y"), ResourceType::File)]);
        assert!(set.has_members(&p("/p/x")));
        assert_eq!(events.lock().len(), 1);
        set.check_invariants().unwrap();
    }

    #[test]
    fn test_type_change_folder_to_file() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        source.set(outgoing("/p/x/y"));
        source.set(outgoing("/p/x/z/w"));
        let input = connected(&source);
        assert!(input.sync_set().has_members(&p("/p/x")));

        source.delete(&p("/p/x"));
        source.set(incoming("/p/x"));
        input.resource_changed(
            &ResourceDelta::changed(p("/p"), DeltaFlags::NONE)
                .with_child(ResourceDelta::changed(p("/p/x"), DeltaFlags::TYPE)),
        );

        let set = input.sync_set();
        assert_eq!(shape(set, &p("/p")), vec![(p("/p/x"), ResourceType::File)]);
        assert!(!set.has_members(&p("/p/x")));
        assert!(!set.contains(&p("/p/x/y")));
        assert_eq!(set.all_members(), vec![incoming("/p/x")]);
        set.check_invariants().unwrap();
    }

    #[test]
    fn test_added_subtree_is_collected_deep() {
        let source = memory();
        let input = connected(&source);

        source.set(outgoing("/p/new/deep/x.txt"));
        source.set(outgoing("/p/new/y.txt"));
        input.resource_changed(&ResourceDelta::added(p("/p/new")));

        assert_eq!(input.sync_set().out_of_sync_descendants(&p("/p/new")).len(), 2);
    }

    #[test]
    fn test_project_open_and_close() {
        let source = memory();
        let input = connected(&source);

        source.delete(&p("/p"));
        source.remove_root(&p("/p"));
        input.resource_changed(&ResourceDelta::changed(p("/p"), DeltaFlags::OPEN));
        assert!(input.sync_set().is_empty());

        source.add_root(p("/p"));
        source.set(outgoing("/p/a/b/File.txt"));
        input.resource_changed(&ResourceDelta::changed(p("/p"), DeltaFlags::OPEN));
        assert_eq!(input.sync_set().size(), 1);
    }

    #[test]
    fn test_backend_failure_keeps_prior_state() {
        let source = memory();
        let input = connected(&source);

        source.set(incoming("/p/a/b/File.txt"));
        source.fail(p("/p/a/b/File.txt"));
        input.source_changed(&[
            SourceEvent::SyncChanged(p("/p/a/b/File.txt")),
            SourceEvent::SyncChanged(p("/p/a/c/File2.txt")),
        ]);
        assert_eq!(input.sync_set().get_sync_info(&p("/p/a/b/File.txt")), Some(outgoing("/p/a/b/File.txt")));
        assert_eq!(input.sync_set().size(), 2);
    }

    #[test]
    fn test_provider_configuration_events() {
        let source = memory();
        let input = connected(&source);
        let events = recorder(input.sync_set());

        source.remove_root(&p("/p"));
        input.source_changed(&[SourceEvent::ProviderDeconfigured(p("/p"))]);
        assert!(input.sync_set().is_empty());

        source.add_root(p("/p"));
        input.source_changed(&[SourceEvent::ProviderConfigured(p("/p"))]);
        assert_eq!(input.sync_set().size(), 2);

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].removed_roots(), &[p("/p")]);
        assert_eq!(events[1].added_roots(), &[p("/p")]);
    }

    #[test]
    fn test_disconnected_ignores_events() {
        let source = memory();
        let input = connected(&source);
        input.disconnect();
        source.set(outgoing("/p/z.txt"));
        input.source_changed(&[SourceEvent::SyncChanged(p("/p/z.txt"))]);
        assert!(input.sync_set().is_empty());
    }

    #[test]
    fn test_set_filter_rebuilds() {
        let source = memory();
        let input = connected(&source);
        input
            .set_filter(Arc::new(DirectionFilter::new([SyncKind::INCOMING])), &CancelToken::new())
            .unwrap();
        assert_eq!(input.sync_set().all_members(), vec![incoming("/p/a/c/File2.txt")]);
    }

    #[test]
    fn test_scoped_roots() {
        let source = memory();
        source.add_root(p("/q"));
        let input = SubscriberInput::new(Arc::clone(&source) as Arc<dyn SyncSource>, Arc::new(AcceptAll));
        assert_eq!(input.roots(), vec![p("/p"), p("/q")]);

        input.core().replace_scope(Some(vec![p("/p/a/c"), p("/p/a")]));
        assert_eq!(input.roots(), vec![p("/p/a")]);

        input.core().replace_scope(Some(vec![ResourcePath::root()]));
        assert_eq!(input.roots(), vec![p("/p"), p("/q")]);
    }
}
