//! Change notifications pushed into input stages.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::model::ResourcePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    Added,
    Removed,
    Changed,
}

/// What changed about a `Changed` resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaFlags(u32);

impl DeltaFlags {
    pub const NONE: Self = Self(0);
    /// The bytes of the resource changed.
    pub const CONTENT: Self = Self(1);
    /// The resource was replaced by one of another type.
    pub const TYPE: Self = Self(2);
    /// A project was opened or closed.
    pub const OPEN: Self = Self(4);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitOr for DeltaFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A node of a resource delta tree.
///
/// Children describe changes below `path`; a delta for a folder whose only
/// interesting changes are in its children is `Changed` with no flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub path: ResourcePath,
    pub kind: DeltaKind,
    #[serde(default)]
    pub flags: DeltaFlags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResourceDelta>,
}

impl ResourceDelta {
    #[must_use]
    pub fn added(path: ResourcePath) -> Self {
        Self::new(path, DeltaKind::Added, DeltaFlags::NONE)
    }

    #[must_use]
    pub fn removed(path: ResourcePath) -> Self {
        Self::new(path, DeltaKind::Removed, DeltaFlags::NONE)
    }

    #[must_use]
    pub fn changed(path: ResourcePath, flags: DeltaFlags) -> Self {
        Self::new(path, DeltaKind::Changed, flags)
    }

    fn new(path: ResourcePath, kind: DeltaKind, flags: DeltaFlags) -> Self {
        Self {
            path,
            kind,
            flags,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Number of nodes in this delta tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// Source-level notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "path", rename_all = "snake_case")]
pub enum SourceEvent {
    /// The comparison result of one resource may have changed.
    SyncChanged(ResourcePath),
    /// The source started supervising a root.
    ProviderConfigured(ResourcePath),
    /// The source stopped supervising a root.
    ProviderDeconfigured(ResourcePath),
}

impl SourceEvent {
    #[must_use]
    pub fn path(&self) -> &ResourcePath {
        match self {
            Self::SyncChanged(path)
            | Self::ProviderConfigured(path)
            | Self::ProviderDeconfigured(path) => path,
        }
    }
}

impl fmt::Display for SourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncChanged(path) => write!(f, "sync changed: {path}"),
            Self::ProviderConfigured(path) => write!(f, "provider configured: {path}"),
            Self::ProviderDeconfigured(path) => write!(f, "provider deconfigured: {path}"),
        }
    }
}
