//! Sync sources: where sync information comes from.
//!
//! A [`SyncSource`] answers sync status on demand and enumerates resources.
//! Changes are pushed into input stages as [`ResourceDelta`] trees (the
//! resource structure changed) and [`SourceEvent`]s (the comparison result
//! or the source configuration changed).
//!
//! Two implementations ship with the crate:
//!
//! - [`DirectorySource`]: compares a local directory against a baseline and
//!   an optional common ancestor by content digest
//! - [`MemorySource`]: scriptable in-memory source

mod delta;
pub mod digest;
mod fs;
mod memory;
mod registry;

pub use delta::{DeltaFlags, DeltaKind, ResourceDelta, SourceEvent};
pub use fs::DirectorySource;
pub use memory::MemorySource;
pub use registry::SourceRegistry;

use tracing::warn;

use crate::error::{Error, Result};
use crate::jobs::CancelToken;
use crate::model::{ResourcePath, ResourceType, SyncInfo};

/// How far below a root an enumeration reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinite,
}

/// Supplier of sync information for a tree of resources.
pub trait SyncSource: Send + Sync {
    /// Stable identifier used by the [`SourceRegistry`].
    fn id(&self) -> &str;

    /// Human-readable name, shown in view titles.
    fn name(&self) -> &str;

    /// Top-level resources this source supervises.
    fn roots(&self) -> Vec<ResourcePath>;

    /// Whether `path` lies under one of the supervised roots.
    fn is_supervised(&self, path: &ResourcePath) -> bool {
        !path.is_root() && self.roots().iter().any(|root| root.is_prefix_of(path))
    }

    /// Type of the resource at `path` in any variant, `None` if it exists
    /// nowhere.
    fn resource_type(&self, path: &ResourcePath) -> Option<ResourceType>;

    /// Immediate children of `container` across all variants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the container cannot be listed.
    fn members(&self, container: &ResourcePath) -> Result<Vec<(ResourcePath, ResourceType)>>;

    /// Current sync state of one resource. `None` when the resource is not
    /// supervised or exists in no variant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the state cannot be determined.
    fn sync_info(&self, path: &ResourcePath) -> Result<Option<SyncInfo>>;

    /// Every out-of-sync resource at or below `roots`, up to `depth`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] when the source has no bulk
    /// enumeration (callers then walk [`members`](Self::members)), and
    /// [`Error::Cancelled`] when `cancel` fires.
    fn all_out_of_sync(
        &self,
        roots: &[ResourcePath],
        depth: Depth,
        cancel: &CancelToken,
    ) -> Result<Vec<SyncInfo>> {
        let _ = (roots, depth, cancel);
        Err(Error::Unsupported(format!(
            "{} has no bulk enumeration",
            self.id()
        )))
    }
}

/// Enumerate out-of-sync resources by walking [`SyncSource::members`].
///
/// Works for any source; used as the fallback when bulk enumeration is
/// unsupported. A resource whose status cannot be read is logged and
/// skipped.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] when `cancel` fires between resources.
pub fn walk_out_of_sync<S: SyncSource + ?Sized>(
    source: &S,
    roots: &[ResourcePath],
    depth: Depth,
    cancel: &CancelToken,
) -> Result<Vec<SyncInfo>> {
    let mut found = Vec::new();
    let mut stack: Vec<(ResourcePath, usize)> =
        roots.iter().rev().map(|root| (root.clone(), 0)).collect();

    while let Some((path, level)) = stack.pop() {
        cancel.check()?;

        if !path.is_root() {
            match source.sync_info(&path) {
                Ok(Some(info)) if info.is_out_of_sync() => found.push(info),
                Ok(_) => {}
                Err(e) => warn!(resource = %path, error = %e, "Skipping resource"),
            }
        }

        let descend = match depth {
            Depth::Zero => false,
            Depth::One => level == 0,
            Depth::Infinite => true,
        };
        if !descend
            || !source
                .resource_type(&path)
                .is_some_and(ResourceType::is_container)
        {
            continue;
        }
        match source.members(&path) {
            Ok(children) => {
                stack.extend(
                    children
                        .into_iter()
                        .rev()
                        .map(|(child, _)| (child, level + 1)),
                );
            }
            Err(e) => warn!(container = %path, error = %e, "Skipping container"),
        }
    }
    Ok(found)
}

impl std::fmt::Debug for dyn SyncSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSource").field("id", &self.id()).finish()
    }
}
