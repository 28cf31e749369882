//! Normalized resource paths.
//!
//! Every index in a sync set is keyed by [`ResourcePath`]. Paths are absolute,
//! slash separated and normalized on construction, so two paths naming the
//! same resource always compare equal.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An absolute, normalized path of a resource in the tree.
///
/// The tree root is `/` and has zero segments. Depth-1 paths name projects.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// The tree root.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse and normalize a path.
    ///
    /// Repeated separators collapse, `.` segments are dropped, a trailing
    /// separator is ignored and `..` pops the previous segment. A `..` that
    /// would climb above the root is rejected. A missing leading `/` is
    /// tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for an empty input or a `..` escaping
    /// the root.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty".to_string(),
            });
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in trimmed.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::InvalidPath {
                            path: raw.to_string(),
                            reason: "'..' escapes the tree root".to_string(),
                        });
                    }
                }
                other => segments.push(other),
            }
        }

        Ok(Self::from_segments(segments))
    }

    fn from_segments<S: AsRef<str>>(segments: impl IntoIterator<Item = S>) -> Self {
        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(segment.as_ref());
        }
        if path.is_empty() {
            path.push('/');
        }
        Self(path)
    }

    /// The normalized string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the tree root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Path segments, outermost first. Empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Last segment, `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Append a relative path (which may contain several segments).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the result would escape the root.
    pub fn join(&self, relative: &str) -> Result<Self> {
        Self::parse(&format!("{}/{relative}", self.0))
    }

    /// Append a single child segment without re-normalizing.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Whether `self` is `other` or one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.is_root() {
            return true;
        }
        other.0 == self.0
            || (other.0.starts_with(&self.0) && other.0.as_bytes().get(self.0.len()) == Some(&b'/'))
    }

    /// Proper ancestors, nearest first, excluding the tree root.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(self.parent(), Self::parent).take_while(|p| !p.is_root())
    }

    /// The immediate child of `self` on the way down to `descendant`.
    ///
    /// Returns `None` unless `descendant` lies strictly below `self`.
    #[must_use]
    pub fn child_toward(&self, descendant: &Self) -> Option<Self> {
        let depth = self.segment_count();
        if descendant.segment_count() <= depth || !self.is_prefix_of(descendant) {
            return None;
        }
        Some(Self::from_segments(descendant.segments().take(depth + 1)))
    }
}

impl Ord for ResourcePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(other.segments())
    }
}

impl PartialOrd for ResourcePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl FromStr for ResourcePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.0
    }
}

/// Type of a resource in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    File,
    Folder,
    Project,
    Root,
}

impl ResourceType {
    /// Files are leaves; every other type can hold children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        !matches!(self, Self::File)
    }

    /// The container type implied by a path's depth.
    #[must_use]
    pub fn container_for(path: &ResourcePath) -> Self {
        match path.segment_count() {
            0 => Self::Root,
            1 => Self::Project,
            _ => Self::Folder,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
            Self::Project => write!(f, "project"),
            Self::Root => write!(f, "root"),
        }
    }
}
