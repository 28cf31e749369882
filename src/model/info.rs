//! Sync information snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::kind::SyncKind;
use super::path::{ResourcePath, ResourceType};

/// The sync state of one resource at one point in time.
///
/// A `SyncInfo` is never mutated; a newer comparison result replaces it
/// wholesale. Two equal values describe the same state, which is what lets
/// an unchanged re-collection be recognized and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncInfo {
    pub path: ResourcePath,
    pub resource_type: ResourceType,
    pub kind: SyncKind,
    /// Digest of the local variant, if the source tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_digest: Option<String>,
    /// Digest of the remote/baseline variant, if the source tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_digest: Option<String>,
}

impl SyncInfo {
    #[must_use]
    pub fn new(path: ResourcePath, resource_type: ResourceType, kind: SyncKind) -> Self {
        Self {
            path,
            resource_type,
            kind,
            local_digest: None,
            remote_digest: None,
        }
    }

    /// Convenience constructor for a file.
    #[must_use]
    pub fn file(path: ResourcePath, kind: SyncKind) -> Self {
        Self::new(path, ResourceType::File, kind)
    }

    /// Attach variant digests.
    #[must_use]
    pub fn with_digests(mut self, local: Option<String>, remote: Option<String>) -> Self {
        self.local_digest = local;
        self.remote_digest = remote;
        self
    }

    #[must_use]
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    #[must_use]
    pub const fn kind(&self) -> SyncKind {
        self.kind
    }

    #[must_use]
    pub const fn direction(&self) -> SyncKind {
        self.kind.direction()
    }

    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.resource_type, ResourceType::File)
    }

    /// Whether the resource differs at all.
    #[must_use]
    pub const fn is_out_of_sync(&self) -> bool {
        !self.kind.is_in_sync()
    }
}

impl fmt::Display for SyncInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_structural() {
        let path = ResourcePath::parse("/p/a.txt").unwrap();
        let a = SyncInfo::file(path.clone(), SyncKind::OUTGOING.with(SyncKind::CHANGE));
        let b = SyncInfo::file(path.clone(), SyncKind::OUTGOING.with(SyncKind::CHANGE));
        let c = SyncInfo::file(path, SyncKind::INCOMING.with(SyncKind::CHANGE));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, b.with_digests(Some("x".into()), None));
    }

    #[test]
    fn test_display() {
        let info = SyncInfo::file(
            ResourcePath::parse("/p/a.txt").unwrap(),
            SyncKind::INCOMING.with(SyncKind::ADDITION),
        );
        assert_eq!(info.to_string(), "/p/a.txt (Incoming Addition)");
        assert!(info.is_file());
        assert!(info.is_out_of_sync());
    }
}
