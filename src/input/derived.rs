//! Stage whose source of truth is another sync set.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::{InputCore, InputState, SyncSetInput};
use crate::error::Result;
use crate::filter::FilterRef;
use crate::jobs::CancelToken;
use crate::model::ResourcePath;
use crate::syncset::{ListenerId, SyncSet, SyncSetChangedEvent};

/// Mirrors an upstream [`SyncSet`] through a filter.
///
/// A full rebuild filters the upstream's members; afterwards every upstream
/// event is replayed as one transaction on the owned set, and an upstream
/// reset triggers an own reset.
pub struct SyncSetInputFromSyncSet {
    core: InputCore,
    upstream: Arc<SyncSet>,
    listener: Mutex<Option<ListenerId>>,
}

impl SyncSetInputFromSyncSet {
    #[must_use]
    pub fn new(upstream: Arc<SyncSet>, filter: FilterRef) -> Arc<Self> {
        Arc::new(Self {
            core: InputCore::new(filter),
            upstream,
            listener: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn upstream(&self) -> &Arc<SyncSet> {
        &self.upstream
    }

    /// Start following the upstream set. The listener only holds a weak
    /// reference, so dropping the stage ends the subscription.
    pub fn connect(self: &Arc<Self>) {
        let _writer = self.core.lock();
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }

        let stage: Weak<Self> = Arc::downgrade(self);
        let id = self
            .upstream
            .add_listener(Arc::new(move |event: &SyncSetChangedEvent| {
                if let Some(stage) = stage.upgrade() {
                    stage.upstream_changed(event);
                }
            }));
        *listener = Some(id);
        self.core.set_state(InputState::Connected);
        info!("derived input connected");
    }

    /// Stop following the upstream set and empty the owned set.
    pub fn disconnect(&self) {
        let _writer = self.core.lock();
        if let Some(id) = self.listener.lock().take() {
            self.upstream.remove_listener(id);
        }
        self.core.disconnect();
        info!("derived input disconnected");
    }

    /// Restrict the stage to resources at or below `scope` (`None` lifts
    /// the restriction) and rebuild if connected.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Cancelled`] if the rebuild is
    /// cancelled.
    pub fn set_scope(&self, scope: Option<Vec<ResourcePath>>, cancel: &CancelToken) -> Result<()> {
        let _writer = self.core.lock();
        self.core.replace_scope(scope);
        if self.core.is_connected() {
            self.reset(cancel)
        } else {
            Ok(())
        }
    }

    fn fetch_input(&self, cancel: &CancelToken) -> Result<()> {
        for info in self.upstream.all_members() {
            cancel.check()?;
            self.core.collect(info);
        }
        Ok(())
    }

    fn upstream_changed(&self, event: &SyncSetChangedEvent) {
        let _writer = self.core.lock();
        if !self.core.is_connected() {
            trace!("disconnected; upstream event ignored");
            return;
        }

        if event.is_reset() {
            debug!("upstream reset");
            if let Err(e) = self.reset(&CancelToken::new()) {
                warn!(error = %e, "Failed to follow upstream reset");
            }
            return;
        }

        let _batch = self.core.sync_set().batch();
        for info in event.added_entries().iter().chain(event.changed_entries()) {
            self.core.collect(info.clone());
        }
        for path in event.removed_entries() {
            self.core.remove(path);
        }
    }
}

impl SyncSetInput for SyncSetInputFromSyncSet {
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
        self.core.reset_with(|| self.fetch_input(cancel))
    }

    fn set_filter(&self, filter: FilterRef, cancel: &CancelToken) -> Result<()> {
        let _writer = self.core.lock();
        self.core.replace_filter(filter);
        self.reset(cancel)
    }
}

impl Drop for SyncSetInputFromSyncSet {
    fn drop(&mut self) {
        if let Some(id) = self.listener.get_mut().take() {
            self.upstream.remove_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAll, DirectionFilter};
    use crate::model::{SyncInfo, SyncKind};

    fn p(s: &str) -> ResourcePath {
        ResourcePath::parse(s).unwrap()
    }

    fn info(path: &str, direction: SyncKind) -> SyncInfo {
        SyncInfo::file(p(path), direction.with(SyncKind::CHANGE))
    }

    fn recorder(set: &SyncSet) -> Arc<Mutex<Vec<SyncSetChangedEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        set.add_listener(Arc::new(move |event: &SyncSetChangedEvent| {
            sink.lock().push(event.clone());
        }));
        events
    }

    fn upstream() -> Arc<SyncSet> {
        let set = Arc::new(SyncSet::new());
        set.add(info("/p/a/1", SyncKind::OUTGOING));
        set.add(info("/p/a/2", SyncKind::INCOMING));
        set.add(info("/p/b/3", SyncKind::INCOMING));
        set.add(info("/p/b/4", SyncKind::OUTGOING));
        set.add(info("/p/c/5", SyncKind::CONFLICTING));
        set
    }

    fn derived(upstream: &Arc<SyncSet>) -> Arc<SyncSetInputFromSyncSet> {
        let stage = SyncSetInputFromSyncSet::new(Arc::clone(upstream), Arc::new(AcceptAll));
        stage.connect();
        stage.reset(&CancelToken::new()).unwrap();
        stage
    }

    #[test]
    fn test_follows_upstream_events() {
        let upstream = upstream();
        let stage = derived(&upstream);
        assert_eq!(stage.sync_set().size(), 5);

        upstream.begin_input();
        upstream.add(info("/p/d/6", SyncKind::OUTGOING));
        upstream.changed(info("/p/a/1", SyncKind::INCOMING));
        upstream.remove(&p("/p/c/5"));
        upstream.end_input();

        assert_eq!(stage.sync_set().all_members(), upstream.all_members());
    }

    #[test]
    fn test_set_filter_reports_removals_once() {
        let upstream = upstream();
        let stage = derived(&upstream);
        let events = recorder(stage.sync_set());

        stage
            .set_filter(Arc::new(DirectionFilter::new([SyncKind::INCOMING])), &CancelToken::new())
            .unwrap();

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_reset());
        assert_eq!(events[0].removed_entries().len(), 3);
        assert!(events[0].added_entries().is_empty());
        assert_eq!(stage.sync_set().size(), 2);
    }

    #[test]
    fn test_upstream_reset_resets_stage() {
        let upstream = upstream();
        let stage = derived(&upstream);
        let events = recorder(stage.sync_set());

        upstream.begin_input();
        upstream.reset();
        upstream.add(info("/p/a/1", SyncKind::OUTGOING));
        upstream.end_input();

        assert_eq!(stage.sync_set().size(), 1);
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_reset());
    }

    #[test]
    fn test_filter_applies_to_events() {
        let upstream = upstream();
        let stage = SyncSetInputFromSyncSet::new(
            Arc::clone(&upstream),
            Arc::new(DirectionFilter::new([SyncKind::OUTGOING])),
        );
        stage.connect();
        stage.reset(&CancelToken::new()).unwrap();
        assert_eq!(stage.sync_set().size(), 2);

        // An accepted resource turning incoming leaves the filtered set.
        upstream.changed(info("/p/a/1", SyncKind::INCOMING));
        assert_eq!(stage.sync_set().size(), 1);
        upstream.changed(info("/p/a/2", SyncKind::OUTGOING));
        assert_eq!(stage.sync_set().size(), 2);
    }

    #[test]
    fn test_scope_restricts_rebuild_and_events() {
        let upstream = upstream();
        let stage = derived(&upstream);

        stage.set_scope(Some(vec![p("/p/b")]), &CancelToken::new()).unwrap();
        assert_eq!(stage.sync_set().size(), 2);
        assert!(stage.sync_set().contains(&p("/p/b/3")));

        upstream.add(info("/p/a/9", SyncKind::OUTGOING));
        upstream.add(info("/p/b/9", SyncKind::OUTGOING));
        assert!(!stage.sync_set().contains(&p("/p/a/9")));
        assert!(stage.sync_set().contains(&p("/p/b/9")));

        stage.set_scope(None, &CancelToken::new()).unwrap();
        assert_eq!(stage.sync_set().size(), upstream.size());
        stage.sync_set().check_invariants().unwrap();
    }

    #[test]
    fn test_disconnect_unregisters() {
        let upstream = upstream();
        let stage = derived(&upstream);
        assert_eq!(upstream.listener_count(), 1);

        stage.disconnect();
        assert_eq!(upstream.listener_count(), 0);
        assert!(stage.sync_set().is_empty());

        upstream.add(info("/p/z", SyncKind::OUTGOING));
        assert!(stage.sync_set().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let upstream = upstream();
        drop(derived(&upstream));
        assert_eq!(upstream.listener_count(), 0);
    }
}
