//! Per-kind statistics of a sync set.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::model::SyncKind;

/// Count of tracked resources per exact sync kind.
///
/// Always re-derivable from the set's resources; kept incrementally so that
/// counting by direction never scans the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSetStatistics {
    counts: BTreeMap<SyncKind, usize>,
}

impl SyncSetStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: SyncKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn remove(&mut self, kind: SyncKind) {
        if let Some(count) = self.counts.get_mut(&kind) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&kind);
            }
        } else {
            tracing::warn!(%kind, "Consistency issue; removing a kind that was never counted");
        }
    }

    /// Number of resources whose kind satisfies `kind & mask == kind`.
    #[must_use]
    pub fn count_for(&self, kind: SyncKind, mask: SyncKind) -> usize {
        self.counts
            .iter()
            .filter(|(k, _)| k.matches(kind, mask))
            .map(|(_, count)| count)
            .sum()
    }

    /// Number of resources with the given direction.
    #[must_use]
    pub fn count_direction(&self, direction: SyncKind) -> usize {
        self.count_for(direction, SyncKind::DIRECTION_MASK)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Exact kinds with their counts, in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (SyncKind, usize)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }
}

impl fmt::Display for SyncSetStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, count) in self.iter() {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{kind}: {count}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for SyncSetStatistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(kind, count)| (kind.to_string(), count)))
    }
}
