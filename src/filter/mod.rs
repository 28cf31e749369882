//! Predicates over sync information.
//!
//! Input stages apply a [`SyncInfoFilter`] to every collected resource; a
//! resource the filter rejects is kept out of (or removed from) the stage's
//! sync set. [`FilterSpec`] is the persisted, user-facing description that
//! builds the composite filter a view installs.

mod spec;

pub use spec::FilterSpec;

use std::fmt;
use std::sync::Arc;

use crate::model::{SyncInfo, SyncKind};

/// Decides whether a resource belongs in a filtered sync set.
pub trait SyncInfoFilter: Send + Sync + fmt::Debug {
    fn select(&self, info: &SyncInfo) -> bool;
}

/// Shared handle to a filter.
pub type FilterRef = Arc<dyn SyncInfoFilter>;

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SyncInfoFilter for AcceptAll {
    fn select(&self, _info: &SyncInfo) -> bool {
        true
    }
}

/// Accepts resources whose direction is one of the given ones.
#[derive(Debug, Clone)]
pub struct DirectionFilter {
    directions: Vec<SyncKind>,
}

impl DirectionFilter {
    #[must_use]
    pub fn new(directions: impl IntoIterator<Item = SyncKind>) -> Self {
        Self {
            directions: directions.into_iter().map(SyncKind::direction).collect(),
        }
    }
}

impl SyncInfoFilter for DirectionFilter {
    fn select(&self, info: &SyncInfo) -> bool {
        self.directions.contains(&info.kind.direction())
    }
}

/// Accepts resources whose change type is one of the given ones.
#[derive(Debug, Clone)]
pub struct ChangeTypeFilter {
    changes: Vec<SyncKind>,
}

impl ChangeTypeFilter {
    #[must_use]
    pub fn new(changes: impl IntoIterator<Item = SyncKind>) -> Self {
        Self {
            changes: changes.into_iter().map(SyncKind::change).collect(),
        }
    }
}

impl SyncInfoFilter for ChangeTypeFilter {
    fn select(&self, info: &SyncInfo) -> bool {
        self.changes.contains(&info.kind.change())
    }
}

/// Rejects conflicts where both sides ended up identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct PseudoConflictFilter;

impl SyncInfoFilter for PseudoConflictFilter {
    fn select(&self, info: &SyncInfo) -> bool {
        !info.kind.is_pseudo_conflict()
    }
}

/// Accepts what every child filter accepts. Empty accepts everything.
#[derive(Debug, Clone, Default)]
pub struct AndFilter(pub Vec<FilterRef>);

impl SyncInfoFilter for AndFilter {
    fn select(&self, info: &SyncInfo) -> bool {
        self.0.iter().all(|filter| filter.select(info))
    }
}

/// Accepts what any child filter accepts. Empty accepts nothing.
#[derive(Debug, Clone, Default)]
pub struct OrFilter(pub Vec<FilterRef>);

impl SyncInfoFilter for OrFilter {
    fn select(&self, info: &SyncInfo) -> bool {
        self.0.iter().any(|filter| filter.select(info))
    }
}

#[derive(Debug, Clone)]
pub struct NotFilter(pub FilterRef);

impl SyncInfoFilter for NotFilter {
    fn select(&self, info: &SyncInfo) -> bool {
        !self.0.select(info)
    }
}

/// Adapts a closure, mostly for tests and one-off predicates.
pub struct FnFilter<F>(pub F);

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFilter")
    }
}

impl<F> SyncInfoFilter for FnFilter<F>
where
    F: Fn(&SyncInfo) -> bool + Send + Sync,
{
    fn select(&self, info: &SyncInfo) -> bool {
        (self.0)(info)
    }
}
