//! Model elements handed to tree and table consumers.

use serde::Serialize;

use super::info::SyncInfo;
use super::path::{ResourcePath, ResourceType};

/// One node a consumer can render.
///
/// The variant is fixed when the element is built, so a consumer never has
/// to inspect an element at runtime to find out what it wraps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelElement {
    /// A resource that is itself out of sync.
    Info(SyncInfo),
    /// An intermediate ancestor of out-of-sync resources.
    Container { path: ResourcePath },
    /// A plain resource handle without sync information.
    Resource {
        path: ResourcePath,
        resource_type: ResourceType,
    },
}

impl ModelElement {
    #[must_use]
    pub fn container(path: ResourcePath) -> Self {
        Self::Container { path }
    }

    #[must_use]
    pub fn resource(path: ResourcePath, resource_type: ResourceType) -> Self {
        Self::Resource {
            path,
            resource_type,
        }
    }

    #[must_use]
    pub fn path(&self) -> &ResourcePath {
        match self {
            Self::Info(info) => &info.path,
            Self::Container { path } | Self::Resource { path, .. } => path,
        }
    }

    #[must_use]
    pub fn sync_info(&self) -> Option<&SyncInfo> {
        match self {
            Self::Info(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn container_path(&self) -> Option<&ResourcePath> {
        match self {
            Self::Container { path } => Some(path),
            _ => None,
        }
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Info(info) => info.resource_type,
            Self::Container { path } => ResourceType::container_for(path),
            Self::Resource { resource_type, .. } => *resource_type,
        }
    }

    /// Whether a consumer may expand this element.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.resource_type().is_container()
    }
}
