//! Sync kinds: the direction and change-type bitmask attached to a resource.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction and change classification of a difference, as a bitmask.
///
/// The low two bits hold the change type, the next two the direction, and
/// the remaining bits optional conflict flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncKind(u32);

impl SyncKind {
    pub const IN_SYNC: Self = Self(0);

    // Change types
    pub const ADDITION: Self = Self(1);
    pub const DELETION: Self = Self(2);
    pub const CHANGE: Self = Self(3);
    pub const CHANGE_MASK: Self = Self(3);

    // Directions
    pub const OUTGOING: Self = Self(4);
    pub const INCOMING: Self = Self(8);
    pub const CONFLICTING: Self = Self(12);
    pub const DIRECTION_MASK: Self = Self(12);

    // Conflict flags
    pub const PSEUDO_CONFLICT: Self = Self(16);
    pub const AUTOMERGE_CONFLICT: Self = Self(32);
    pub const MANUAL_CONFLICT: Self = Self(64);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Direction part (`OUTGOING`, `INCOMING`, `CONFLICTING` or `IN_SYNC`).
    #[must_use]
    pub const fn direction(self) -> Self {
        Self(self.0 & Self::DIRECTION_MASK.0)
    }

    /// Change-type part (`ADDITION`, `DELETION`, `CHANGE` or `IN_SYNC`).
    #[must_use]
    pub const fn change(self) -> Self {
        Self(self.0 & Self::CHANGE_MASK.0)
    }

    /// `self & mask == kind`.
    #[must_use]
    pub const fn matches(self, kind: Self, mask: Self) -> bool {
        self.0 & mask.0 == kind.0
    }

    #[must_use]
    pub const fn is_in_sync(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_pseudo_conflict(self) -> bool {
        self.0 & Self::PSEUDO_CONFLICT.0 != 0
    }

    /// Compute a kind from the digests of the three resource variants.
    ///
    /// `ancestor` is `None` for a two-way comparison; otherwise it carries
    /// the common-ancestor digest (itself `None` when the ancestor does not
    /// have the resource).
    #[must_use]
    pub fn calculate<T: PartialEq + ?Sized>(
        ancestor: Option<Option<&T>>,
        local: Option<&T>,
        remote: Option<&T>,
    ) -> Self {
        let Some(ancestor) = ancestor else {
            return match (local, remote) {
                (None, None) => Self::IN_SYNC,
                (None, Some(_)) => Self::ADDITION,
                (Some(_), None) => Self::DELETION,
                (Some(l), Some(r)) if l == r => Self::IN_SYNC,
                (Some(_), Some(_)) => Self::CHANGE,
            };
        };

        match (ancestor, local, remote) {
            (None, None, None) => Self::IN_SYNC,
            (None, None, Some(_)) => Self::INCOMING.with(Self::ADDITION),
            (None, Some(_), None) => Self::OUTGOING.with(Self::ADDITION),
            (None, Some(l), Some(r)) => {
                let kind = Self::CONFLICTING.with(Self::ADDITION);
                if l == r { kind.with(Self::PSEUDO_CONFLICT) } else { kind }
            }
            (Some(_), None, None) => Self::CONFLICTING
                .with(Self::DELETION)
                .with(Self::PSEUDO_CONFLICT),
            (Some(a), None, Some(r)) => {
                if a == r {
                    Self::OUTGOING.with(Self::DELETION)
                } else {
                    Self::CONFLICTING.with(Self::CHANGE)
                }
            }
            (Some(a), Some(l), None) => {
                if a == l {
                    Self::INCOMING.with(Self::DELETION)
                } else {
                    Self::CONFLICTING.with(Self::CHANGE)
                }
            }
            (Some(a), Some(l), Some(r)) => match (a != l, a != r) {
                (false, false) => Self::IN_SYNC,
                (true, false) => Self::OUTGOING.with(Self::CHANGE),
                (false, true) => Self::INCOMING.with(Self::CHANGE),
                (true, true) => {
                    let kind = Self::CONFLICTING.with(Self::CHANGE);
                    if l == r { kind.with(Self::PSEUDO_CONFLICT) } else { kind }
                }
            },
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_in_sync() {
            return write!(f, "In Sync");
        }

        let direction = match self.direction() {
            Self::OUTGOING => "Outgoing ",
            Self::INCOMING => "Incoming ",
            Self::CONFLICTING => "Conflicting ",
            _ => "",
        };
        let change = match self.change() {
            Self::ADDITION => "Addition",
            Self::DELETION => "Deletion",
            Self::CHANGE => "Change",
            _ => "",
        };
        write!(f, "{direction}{change}")?;

        if self.is_pseudo_conflict() {
            write!(f, " (pseudo)")?;
        }
        if self.0 & Self::AUTOMERGE_CONFLICT.0 != 0 {
            write!(f, " (auto-merge)")?;
        }
        if self.0 & Self::MANUAL_CONFLICT.0 != 0 {
            write!(f, " (manual)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_and_change_split() {
        let kind = SyncKind::CONFLICTING.with(SyncKind::CHANGE).with(SyncKind::PSEUDO_CONFLICT);
        assert_eq!(kind.direction(), SyncKind::CONFLICTING);
        assert_eq!(kind.change(), SyncKind::CHANGE);
        assert!(kind.is_pseudo_conflict());
        assert!(kind.matches(SyncKind::CONFLICTING, SyncKind::DIRECTION_MASK));
        assert!(!kind.matches(SyncKind::OUTGOING, SyncKind::DIRECTION_MASK));
    }

    #[test]
    fn test_display() {
        assert_eq!(SyncKind::IN_SYNC.to_string(), "In Sync");
        assert_eq!(
            SyncKind::OUTGOING.with(SyncKind::CHANGE).to_string(),
            "Outgoing Change"
        );
        assert_eq!(
            SyncKind::CONFLICTING
                .with(SyncKind::ADDITION)
                .with(SyncKind::PSEUDO_CONFLICT)
                .to_string(),
            "Conflicting Addition (pseudo)"
        );
        assert_eq!(SyncKind::DELETION.to_string(), "Deletion");
    }

    #[test]
    fn test_two_way_calculation() {
        let a = "a".to_string();
        let b = "b".to_string();
        assert_eq!(SyncKind::calculate(None, Some(&a), Some(&a)), SyncKind::IN_SYNC);
        assert_eq!(SyncKind::calculate(None, Some(&a), Some(&b)), SyncKind::CHANGE);
        assert_eq!(SyncKind::calculate(None, None, Some(&b)), SyncKind::ADDITION);
        assert_eq!(SyncKind::calculate(None, Some(&a), None::<&String>), SyncKind::DELETION);
    }

    #[test]
    fn test_three_way_calculation() {
        let base = "base".to_string();
        let mine = "mine".to_string();
        let theirs = "theirs".to_string();

        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), Some(&mine), Some(&base)),
            SyncKind::OUTGOING.with(SyncKind::CHANGE)
        );
        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), Some(&base), Some(&theirs)),
            SyncKind::INCOMING.with(SyncKind::CHANGE)
        );
        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), Some(&mine), Some(&theirs)),
            SyncKind::CONFLICTING.with(SyncKind::CHANGE)
        );
        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), Some(&mine), Some(&mine)),
            SyncKind::CONFLICTING
                .with(SyncKind::CHANGE)
                .with(SyncKind::PSEUDO_CONFLICT)
        );
        assert_eq!(
            SyncKind::calculate(Some(None), None, Some(&theirs)),
            SyncKind::INCOMING.with(SyncKind::ADDITION)
        );
        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), None, Some(&base)),
            SyncKind::OUTGOING.with(SyncKind::DELETION)
        );
        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), Some(&base), None),
            SyncKind::INCOMING.with(SyncKind::DELETION)
        );
        assert_eq!(
            SyncKind::calculate(Some(Some(&base)), Some(&base), Some(&base)),
            SyncKind::IN_SYNC
        );
    }
}
