//! Change events and the per-transaction change accumulator.
//!
//! Every mutation inside a `begin_input`/`end_input` bracket is recorded in a
//! [`ChangeAccumulator`]. The accumulator keeps only the net effect per path,
//! so that a resource added and then removed in the same transaction leaves
//! no trace, and turns it into exactly one [`SyncSetChangedEvent`] when the
//! outermost bracket closes.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::model::{ResourcePath, SyncInfo};

/// The net effect of one transaction on a sync set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSetChangedEvent {
    reset: bool,
    added: Vec<SyncInfo>,
    changed: Vec<SyncInfo>,
    removed: Vec<ResourcePath>,
    added_roots: Vec<ResourcePath>,
    removed_roots: Vec<ResourcePath>,
}

impl SyncSetChangedEvent {
    /// Whether the set was emptied during the transaction.
    ///
    /// Consumers should re-read the whole set; the entry lists still hold
    /// the net difference across the reset.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        self.reset
    }

    #[must_use]
    pub fn added_entries(&self) -> &[SyncInfo] {
        &self.added
    }

    #[must_use]
    pub fn changed_entries(&self) -> &[SyncInfo] {
        &self.changed
    }

    #[must_use]
    pub fn removed_entries(&self) -> &[ResourcePath] {
        &self.removed
    }

    /// Outermost nodes that appeared in the tree.
    #[must_use]
    pub fn added_roots(&self) -> &[ResourcePath] {
        &self.added_roots
    }

    /// Outermost nodes that disappeared from the tree.
    #[must_use]
    pub fn removed_roots(&self) -> &[ResourcePath] {
        &self.removed_roots
    }

    /// True when nothing observable happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.reset
            && self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.added_roots.is_empty()
            && self.removed_roots.is_empty()
    }
}

#[derive(Debug, Clone)]
enum EntryDelta {
    Added(SyncInfo),
    Changed { before: SyncInfo, after: SyncInfo },
    Removed(SyncInfo),
}

/// Net changes collected between `begin_input` and `end_input`.
#[derive(Debug, Default)]
pub(crate) struct ChangeAccumulator {
    reset: bool,
    entries: HashMap<ResourcePath, EntryDelta>,
    /// Presence in the tree before the transaction, for every node whose
    /// presence flipped at least once during it.
    presence_before: HashMap<ResourcePath, bool>,
}

impl ChangeAccumulator {
    pub(crate) fn reset(&mut self) {
        self.reset = true;
    }

    pub(crate) fn added(&mut self, info: SyncInfo) {
        let delta = match self.entries.remove(&info.path) {
            None | Some(EntryDelta::Added(_)) => Some(EntryDelta::Added(info)),
            Some(EntryDelta::Removed(before) | EntryDelta::Changed { before, .. }) => {
                (before != info).then_some(EntryDelta::Changed {
                    before,
                    after: info,
                })
            }
        };
        self.store(delta);
    }

    pub(crate) fn changed(&mut self, before: SyncInfo, after: SyncInfo) {
        let delta = match self.entries.remove(&after.path) {
            Some(EntryDelta::Added(_)) => Some(EntryDelta::Added(after)),
            Some(EntryDelta::Changed { before: original, .. } | EntryDelta::Removed(original)) => {
                (original != after).then_some(EntryDelta::Changed {
                    before: original,
                    after,
                })
            }
            None => (before != after).then_some(EntryDelta::Changed { before, after }),
        };
        self.store(delta);
    }

    pub(crate) fn removed(&mut self, before: SyncInfo) {
        let path = before.path.clone();
        let delta = match self.entries.remove(&path) {
            None => Some(EntryDelta::Removed(before)),
            Some(EntryDelta::Added(_)) => None,
            Some(EntryDelta::Changed { before: original, .. } | EntryDelta::Removed(original)) => {
                Some(EntryDelta::Removed(original))
            }
        };
        self.store(delta);
    }

    fn store(&mut self, delta: Option<EntryDelta>) {
        if let Some(delta) = delta {
            let path = match &delta {
                EntryDelta::Added(info)
                | EntryDelta::Removed(info)
                | EntryDelta::Changed { after: info, .. } => info.path.clone(),
            };
            self.entries.insert(path, delta);
        }
    }

    /// A node of the tree (a `parents` key or a tracked file) appeared.
    pub(crate) fn node_created(&mut self, path: &ResourcePath) {
        self.presence_before.entry(path.clone()).or_insert(false);
    }

    /// A node of the tree disappeared.
    pub(crate) fn node_deleted(&mut self, path: &ResourcePath) {
        self.presence_before.entry(path.clone()).or_insert(true);
    }

    pub(crate) fn is_untouched(&self) -> bool {
        !self.reset && self.entries.is_empty() && self.presence_before.is_empty()
    }

    /// Turn the accumulated changes into the event for this transaction.
    ///
    /// `is_present` reports whether a node is in the tree now. Roots are the
    /// nodes whose presence flipped over the whole transaction and whose
    /// parent did not flip the same way.
    pub(crate) fn finish(
        self,
        is_present: impl Fn(&ResourcePath) -> bool,
    ) -> SyncSetChangedEvent {
        let mut created = BTreeSet::new();
        let mut deleted = BTreeSet::new();
        for (path, before) in self.presence_before {
            match (before, is_present(&path)) {
                (false, true) => {
                    created.insert(path);
                }
                (true, false) => {
                    deleted.insert(path);
                }
                _ => {}
            }
        }

        let outermost = |nodes: &BTreeSet<ResourcePath>| -> Vec<ResourcePath> {
            nodes
                .iter()
                .filter(|path| path.parent().is_none_or(|parent| !nodes.contains(&parent)))
                .cloned()
                .collect()
        };
        let added_roots = outermost(&created);
        let removed_roots = outermost(&deleted);

        let mut added = Vec::new();
        let mut changed = Vec::new();
        let mut removed = Vec::new();
        for delta in self.entries.into_values() {
            match delta {
                EntryDelta::Added(info) => added.push(info),
                EntryDelta::Changed { after, .. } => changed.push(after),
                EntryDelta::Removed(info) => removed.push(info.path),
            }
        }
        added.sort_by(|a, b| a.path.cmp(&b.path));
        changed.sort_by(|a, b| a.path.cmp(&b.path));
        removed.sort();

        SyncSetChangedEvent {
            reset: self.reset,
            added,
            changed,
            removed,
            added_roots,
            removed_roots,
        }
    }
}
