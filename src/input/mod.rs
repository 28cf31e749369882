//! Input stages: the writers of sync sets.
//!
//! Each stage owns exactly one [`SyncSet`] and decides, resource by
//! resource, whether it belongs there. Stages chain through change
//! events: a [`SubscriberInput`] populated from a sync source feeds
//! [`SyncSetInputFromSyncSet`] stages, one scoped to the working set and
//! one applying the display filter. [`WorkingSetInput`] pairs the
//! subscriber with the scoped stage.
//!
//! ```text
//! SyncSource ──► SubscriberInput ──► SyncSet (workspace)
//!                                      │
//!                SyncSetInputFromSyncSet (working-set scope) ──► SyncSet (working set)
//!                                      │
//!                SyncSetInputFromSyncSet (display filter) ──► SyncSet (filtered)
//! ```

mod derived;
mod subscriber;
mod working_set;

pub use derived::SyncSetInputFromSyncSet;
pub use subscriber::SubscriberInput;
pub use working_set::{WorkingSet, WorkingSetInput};

use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::filter::FilterRef;
use crate::jobs::CancelToken;
use crate::model::{ResourcePath, SyncInfo};
use crate::syncset::SyncSet;

/// Lifecycle of an input stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputState {
    /// Not listening; events are ignored and `reset` fails.
    Disconnected,
    /// Listening, set not yet populated.
    Connected,
    /// Populated by at least one reset.
    Populated,
}

impl fmt::Display for InputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Populated => write!(f, "populated"),
        }
    }
}

/// Common interface of input stages.
pub trait SyncSetInput: Send + Sync {
    /// The set this stage writes.
    fn sync_set(&self) -> &Arc<SyncSet>;

    fn filter(&self) -> FilterRef;

    fn state(&self) -> InputState;

    /// Empty the set and re-enumerate everything, delivering one reset
    /// event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] on a disconnected stage and
    /// [`Error::Cancelled`] if `cancel` fires; the transaction is closed in
    /// both cases.
    fn reset(&self, cancel: &CancelToken) -> Result<()>;

    /// Replace the filter and rebuild.
    ///
    /// # Errors
    ///
    /// As [`reset`](Self::reset).
    fn set_filter(&self, filter: FilterRef, cancel: &CancelToken) -> Result<()>;
}

/// State and decision logic shared by every stage.
///
/// All mutating entry points take the stage's reentrant writer lock, so a
/// stage that receives events from several threads applies them one at a
/// time while still being able to call back into itself.
pub struct InputCore {
    sync_set: Arc<SyncSet>,
    filter: RwLock<FilterRef>,
    /// Roots outside of which every resource is rejected. `None` admits all.
    scope: RwLock<Option<Vec<ResourcePath>>>,
    state: RwLock<InputState>,
    writer: ReentrantMutex<()>,
}

impl InputCore {
    #[must_use]
    pub fn new(filter: FilterRef) -> Self {
        Self {
            sync_set: Arc::new(SyncSet::new()),
            filter: RwLock::new(filter),
            scope: RwLock::new(None),
            state: RwLock::new(InputState::Disconnected),
            writer: ReentrantMutex::new(()),
        }
    }

    #[must_use]
    pub fn sync_set(&self) -> &Arc<SyncSet> {
        &self.sync_set
    }

    #[must_use]
    pub fn filter(&self) -> FilterRef {
        Arc::clone(&self.filter.read())
    }

    pub fn replace_filter(&self, filter: FilterRef) {
        let _writer = self.lock();
        *self.filter.write() = filter;
    }

    #[must_use]
    pub fn scope(&self) -> Option<Vec<ResourcePath>> {
        self.scope.read().clone()
    }

    pub fn replace_scope(&self, scope: Option<Vec<ResourcePath>>) {
        let _writer = self.lock();
        *self.scope.write() = scope;
    }

    /// Whether `path` lies inside the scope.
    #[must_use]
    pub fn in_scope(&self, path: &ResourcePath) -> bool {
        self.scope
            .read()
            .as_ref()
            .is_none_or(|roots| roots.iter().any(|root| root.is_prefix_of(path)))
    }

    #[must_use]
    pub fn state(&self) -> InputState {
        *self.state.read()
    }

    pub fn set_state(&self, state: InputState) {
        *self.state.write() = state;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() != InputState::Disconnected
    }

    /// Take the stage's writer lock.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.writer.lock()
    }

    fn accepts(&self, info: &SyncInfo) -> bool {
        info.is_out_of_sync() && self.in_scope(&info.path) && self.filter.read().select(info)
    }

    /// Bring the set in line with `info`: add it, refresh it, drop it or
    /// ignore it, depending on whether it is tracked and passes the filter.
    pub fn collect(&self, info: SyncInfo) {
        let _writer = self.lock();
        let tracked = self.sync_set.contains(&info.path);
        match (tracked, self.accepts(&info)) {
            (false, false) => trace!(resource = %info.path, "rejected"),
            (false, true) => self.sync_set.add(info),
            (true, false) => {
                trace!(resource = %info.path, "no longer accepted");
                self.sync_set.remove(&info.path);
            }
            (true, true) => self.sync_set.changed(info),
        }
    }

    /// Drop one tracked resource.
    pub fn remove(&self, path: &ResourcePath) {
        let _writer = self.lock();
        self.sync_set.remove(path);
    }

    /// Drop `path` and every tracked resource below it in one transaction.
    pub fn remove_all(&self, path: &ResourcePath) -> usize {
        let _writer = self.lock();
        self.sync_set.remove_all(path)
    }

    /// Run a full rebuild: clear the set and let `fetch` re-collect, all
    /// inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] on a disconnected stage, otherwise
    /// whatever `fetch` returns. The transaction is closed either way.
    pub fn reset_with(&self, fetch: impl FnOnce() -> Result<()>) -> Result<()> {
        let _writer = self.lock();
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let result = {
            let _batch = self.sync_set.batch();
            self.sync_set.reset();
            fetch()
        };
        self.set_state(InputState::Populated);

        match &result {
            Ok(()) => debug!(resources = self.sync_set.size(), "reset complete"),
            Err(e) => debug!(error = %e, resources = self.sync_set.size(), "reset interrupted"),
        }
        result
    }

    /// Empty the set and mark the stage disconnected.
    pub fn disconnect(&self) {
        let _writer = self.lock();
        self.set_state(InputState::Disconnected);
        self.sync_set.reset();
    }
}

impl fmt::Debug for InputCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputCore")
            .field("state", &self.state())
            .field("filter", &self.filter())
            .field("scope", &self.scope())
            .field("sync_set", &self.sync_set)
            .finish()
    }
}
