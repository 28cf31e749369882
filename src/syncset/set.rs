//! The indexed, tree-aware set of out-of-sync resources.
//!
//! A [`SyncSet`] keeps two indices keyed by [`ResourcePath`]:
//!
//! - `resources`: every out-of-sync resource and its current [`SyncInfo`]
//! - `parents`: every ancestor of an out-of-sync resource, mapped to the set
//!   of out-of-sync paths below it (a directly out-of-sync container lists
//!   itself)
//!
//! Tree structure is never stored as nodes; [`SyncSet::members`] rebuilds the
//! visible children of a container from `parents` on demand, which is how a
//! tree consumer can show collapsed intermediate folders.
//!
//! All mutation happens inside `begin_input`/`end_input` brackets. The net
//! effect of a bracket is delivered to listeners as one event when the
//! outermost bracket closes.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use super::event::{ChangeAccumulator, SyncSetChangedEvent};
use super::listener::{ListenerId, ListenerList, SyncSetChangedListener};
use super::stats::SyncSetStatistics;
use crate::model::{ModelElement, ResourcePath, SyncInfo, SyncKind};

#[derive(Debug, Default)]
struct SyncSetState {
    resources: HashMap<ResourcePath, SyncInfo>,
    parents: HashMap<ResourcePath, HashSet<ResourcePath>>,
    stats: SyncSetStatistics,
    depth: usize,
    changes: ChangeAccumulator,
}

impl SyncSetState {
    fn is_present(&self, path: &ResourcePath) -> bool {
        self.parents.contains_key(path) || self.resources.contains_key(path)
    }

    fn add(&mut self, info: SyncInfo) {
        if self.resources.contains_key(&info.path) {
            self.changed(info);
            return;
        }

        trace!(resource = %info.path, kind = %info.kind, "add");
        let path = info.path.clone();
        let is_file = info.is_file();
        self.stats.add(info.kind);
        self.resources.insert(path.clone(), info.clone());
        self.changes.added(info);
        self.add_to_parents(&path, &path, is_file);
    }

    /// Record `resource` under `parent` and every ancestor above it.
    ///
    /// Returns whether `parent` became a new node of the tree. A file that
    /// starts the walk is always new; it never gets a descendant set.
    fn add_to_parents(
        &mut self,
        resource: &ResourcePath,
        parent: &ResourcePath,
        parent_is_file: bool,
    ) -> bool {
        if parent.is_root() {
            return false;
        }

        let created = if parent_is_file {
            true
        } else {
            match self.parents.entry(parent.clone()) {
                Entry::Occupied(mut children) => {
                    children.get_mut().insert(resource.clone());
                    false
                }
                Entry::Vacant(slot) => {
                    slot.insert(HashSet::from([resource.clone()]));
                    true
                }
            }
        };
        if created {
            self.changes.node_created(parent);
        }

        let grandparent_created = parent
            .parent()
            .is_some_and(|grandparent| self.add_to_parents(resource, &grandparent, false));
        if created && !grandparent_created {
            trace!(root = %parent, "added root");
        }
        created
    }

    fn remove(&mut self, path: &ResourcePath) -> Option<SyncInfo> {
        let info = self.resources.remove(path)?;
        trace!(resource = %path, "remove");
        self.stats.remove(info.kind);
        self.remove_from_parents(path, path, info.is_file());
        self.changes.removed(info.clone());
        Some(info)
    }

    /// Inverse of [`Self::add_to_parents`]. Returns whether `parent` left
    /// the tree.
    fn remove_from_parents(
        &mut self,
        resource: &ResourcePath,
        parent: &ResourcePath,
        parent_is_file: bool,
    ) -> bool {
        if parent.is_root() {
            return false;
        }

        let deleted = if parent_is_file {
            true
        } else if let Some(children) = self.parents.get_mut(parent) {
            children.remove(resource);
            if children.is_empty() {
                self.parents.remove(parent);
                true
            } else {
                false
            }
        } else {
            tracing::warn!(
                resource = %resource,
                ancestor = %parent,
                "Consistency issue; ancestor was not indexed"
            );
            false
        };
        if deleted {
            self.changes.node_deleted(parent);
        }

        let grandparent_deleted = parent
            .parent()
            .is_some_and(|grandparent| self.remove_from_parents(resource, &grandparent, false));
        if deleted && !grandparent_deleted {
            trace!(root = %parent, "removed root");
        }
        deleted
    }

    fn changed(&mut self, info: SyncInfo) {
        let Some(current) = self.resources.get(&info.path) else {
            self.add(info);
            return;
        };
        if *current == info {
            return;
        }
        if current.resource_type != info.resource_type {
            // The resource was replaced by one of another type; its place
            // in the tree has to be rebuilt.
            let path = info.path.clone();
            self.remove(&path);
            self.add(info);
            return;
        }

        trace!(resource = %info.path, kind = %info.kind, "changed");
        let Some(slot) = self.resources.get_mut(&info.path) else {
            return;
        };
        let before = std::mem::replace(slot, info.clone());
        self.stats.remove(before.kind);
        self.stats.add(info.kind);
        self.changes.changed(before, info);
    }

    fn reset(&mut self) {
        debug!(resources = self.resources.len(), "reset");
        for (path, info) in self.resources.drain() {
            if info.is_file() {
                self.changes.node_deleted(&path);
            }
            self.changes.removed(info);
        }
        for path in self.parents.keys() {
            self.changes.node_deleted(path);
        }
        self.parents.clear();
        self.stats.clear();
        self.changes.reset();
    }

    /// Tracked paths at or below `path`.
    fn paths_at_or_below(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        if path.is_root() {
            return self.resources.keys().cloned().collect();
        }
        let mut paths: Vec<ResourcePath> = self
            .parents
            .get(path)
            .map(|children| children.iter().cloned().collect())
            .unwrap_or_default();
        if !self.parents.contains_key(path) && self.resources.contains_key(path) {
            paths.push(path.clone());
        }
        paths
    }
}

/// Indexed set of out-of-sync resources with ancestor rollup.
///
/// Shared as `Arc<SyncSet>` between its owning input stage (the single
/// writer) and any number of readers and listeners.
#[derive(Default)]
pub struct SyncSet {
    state: RwLock<SyncSetState>,
    listeners: Mutex<ListenerList>,
}

impl SyncSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Transactions ────────────────────────────────────────────

    /// Open a transaction. Brackets nest; only the outermost
    /// [`end_input`](Self::end_input) delivers an event.
    pub fn begin_input(&self) {
        self.state.write().depth += 1;
    }

    /// Close a transaction and, if it was the outermost one, deliver the net
    /// change event to every listener on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics when there is no open transaction.
    pub fn end_input(&self) {
        let event = {
            let mut state = self.state.write();
            assert!(
                state.depth > 0,
                "end_input called without a matching begin_input"
            );
            state.depth -= 1;
            if state.depth > 0 {
                return;
            }
            let changes = std::mem::take(&mut state.changes);
            if changes.is_untouched() {
                return;
            }
            changes.finish(|path| state.is_present(path))
        };

        if event.is_empty() {
            trace!("transaction had no net effect");
            return;
        }
        debug!(
            reset = event.is_reset(),
            added = event.added_entries().len(),
            changed = event.changed_entries().len(),
            removed = event.removed_entries().len(),
            added_roots = event.added_roots().len(),
            removed_roots = event.removed_roots().len(),
            "sync set changed"
        );
        self.fire(&event);
    }

    /// Open a transaction that closes when the returned guard is dropped,
    /// including on early return, error propagation or unwinding.
    #[must_use = "the transaction closes as soon as the guard is dropped"]
    pub fn batch(&self) -> InputBatch<'_> {
        self.begin_input();
        InputBatch { set: self }
    }

    /// Whether a transaction is currently open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.state.read().depth > 0
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut SyncSetState) -> R) -> R {
        let _batch = self.batch();
        let mut state = self.state.write();
        let result = f(&mut state);
        drop(state);
        result
    }

    fn fire(&self, event: &SyncSetChangedEvent) {
        let listeners: Vec<Arc<dyn SyncSetChangedListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.sync_set_changed(event);
        }
    }

    // ── Mutation ────────────────────────────────────────────────

    /// Start tracking `info`. Adding a tracked path replaces its info.
    pub fn add(&self, info: SyncInfo) {
        self.mutate(|state| state.add(info));
    }

    /// Stop tracking `path`, returning the info it had.
    pub fn remove(&self, path: &ResourcePath) -> Option<SyncInfo> {
        self.mutate(|state| state.remove(path))
    }

    /// Replace the info of a tracked resource. Replacing with an equal
    /// value records nothing.
    pub fn changed(&self, info: SyncInfo) {
        self.mutate(|state| state.changed(info));
    }

    /// Stop tracking `path` and everything below it in one sweep. Returns
    /// how many resources were removed.
    pub fn remove_all(&self, path: &ResourcePath) -> usize {
        self.mutate(|state| {
            let paths = state.paths_at_or_below(path);
            paths
                .iter()
                .filter(|path| state.remove(path).is_some())
                .count()
        })
    }

    /// Empty the set. The transaction's event is flagged as a reset.
    pub fn reset(&self) {
        self.mutate(SyncSetState::reset);
    }

    // ── Queries ─────────────────────────────────────────────────

    #[must_use]
    pub fn get_sync_info(&self, path: &ResourcePath) -> Option<SyncInfo> {
        self.state.read().resources.get(path).cloned()
    }

    #[must_use]
    pub fn contains(&self, path: &ResourcePath) -> bool {
        self.state.read().resources.contains_key(path)
    }

    /// Every tracked resource, sorted by path.
    #[must_use]
    pub fn all_members(&self) -> Vec<SyncInfo> {
        let mut members: Vec<SyncInfo> = self.state.read().resources.values().cloned().collect();
        members.sort_by(|a, b| a.path.cmp(&b.path));
        members
    }

    /// Immediate children of `container` that are out of sync themselves or
    /// lie on the way to an out-of-sync descendant, sorted by path.
    #[must_use]
    pub fn members(&self, container: &ResourcePath) -> Vec<ModelElement> {
        let state = self.state.read();
        let mut children = BTreeSet::new();

        if container.is_root() {
            let projects = state
                .parents
                .keys()
                .chain(state.resources.keys())
                .filter(|path| path.segment_count() == 1);
            children.extend(projects.cloned());
        } else if let Some(descendants) = state.parents.get(container) {
            children.extend(
                descendants
                    .iter()
                    .filter_map(|descendant| container.child_toward(descendant)),
            );
        }

        children
            .into_iter()
            .map(|child| match state.resources.get(&child) {
                Some(info) => ModelElement::Info(info.clone()),
                None => ModelElement::container(child),
            })
            .collect()
    }

    /// Whether [`members`](Self::members) of `container` is non-empty.
    #[must_use]
    pub fn has_members(&self, container: &ResourcePath) -> bool {
        let state = self.state.read();
        if container.is_root() {
            return !state.resources.is_empty();
        }
        state
            .parents
            .get(container)
            .is_some_and(|descendants| descendants.len() > 1 || !descendants.contains(container))
    }

    /// Every tracked resource at or below `path`, sorted by path.
    #[must_use]
    pub fn out_of_sync_descendants(&self, path: &ResourcePath) -> Vec<SyncInfo> {
        let state = self.state.read();
        let mut infos: Vec<SyncInfo> = state
            .paths_at_or_below(path)
            .iter()
            .filter_map(|p| state.resources.get(p).cloned())
            .collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        infos
    }

    /// Number of tracked resources with `kind & mask == kind`.
    #[must_use]
    pub fn count(&self, kind: SyncKind, mask: SyncKind) -> usize {
        self.state.read().stats.count_for(kind, mask)
    }

    /// Number of tracked resources with the given direction.
    #[must_use]
    pub fn count_direction(&self, direction: SyncKind) -> usize {
        self.state.read().stats.count_direction(direction)
    }

    #[must_use]
    pub fn statistics(&self) -> SyncSetStatistics {
        self.state.read().stats.clone()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.state.read().resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().resources.is_empty()
    }

    // ── Listeners ───────────────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn SyncSetChangedListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.lock().push((id, listener));
        id
    }

    /// Returns whether a listener was registered under `id`.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Check the structural invariants, describing the first violation.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        let state = self.state.read();

        for path in state.resources.keys() {
            for ancestor in path.ancestors() {
                let listed = state
                    .parents
                    .get(&ancestor)
                    .is_some_and(|children| children.contains(path));
                if !listed {
                    return Err(format!("{ancestor} does not list {path}"));
                }
            }
        }

        for (ancestor, children) in &state.parents {
            if children.is_empty() {
                return Err(format!("{ancestor} has an empty descendant set"));
            }
            for child in children {
                if !state.resources.contains_key(child) || !ancestor.is_prefix_of(child) {
                    return Err(format!("{ancestor} lists stray descendant {child}"));
                }
            }
        }

        let mut expected = SyncSetStatistics::new();
        for info in state.resources.values() {
            expected.add(info.kind);
        }
        if expected != state.stats {
            return Err(format!("statistics drifted: {:?} vs {:?}", state.stats, expected));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SyncSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("SyncSet")
            .field("resources", &state.resources.len())
            .field("parents", &state.parents.len())
            .field("depth", &state.depth)
            .finish_non_exhaustive()
    }
}

/// Guard for an open transaction; closes it on drop.
pub struct InputBatch<'a> {
    set: &'a SyncSet,
}

impl Drop for InputBatch<'_> {
    fn drop(&mut self) {
        self.set.end_input();
    }
}
