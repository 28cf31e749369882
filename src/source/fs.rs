//! Filesystem-backed sync source.
//!
//! Compares a local directory tree against a baseline tree (two-way) or
//! against a baseline plus a common-ancestor tree (three-way). The local
//! directory is exposed as a single project `/<name>`; the resource
//! `/<name>/src/main.rs` maps to `<local>/src/main.rs`, `<baseline>/src/main.rs`
//! and `<ancestor>/src/main.rs`.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use super::digest::{content_digest, file_digest};
use super::{Depth, SyncSource, walk_out_of_sync};
use crate::error::{Error, Result};
use crate::jobs::CancelToken;
use crate::model::{ResourcePath, ResourceType, SyncInfo, SyncKind};

/// Marker standing in for a directory's digest, so that a directory
/// compares equal to a directory and unequal to any file.
const DIRECTORY_MARKER: &str = "<dir>";

/// One variant of a resource on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Variant {
    File(String),
    Directory,
}

impl Variant {
    fn digest(&self) -> &str {
        match self {
            Self::File(digest) => digest,
            Self::Directory => DIRECTORY_MARKER,
        }
    }
}

/// Compares directories by whole-file SHA-256 digests.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    id: String,
    name: String,
    project: ResourcePath,
    local: PathBuf,
    baseline: PathBuf,
    ancestor: Option<PathBuf>,
}

impl DirectorySource {
    /// Two-way source over `local` and `baseline`. The project is named
    /// after the local directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RootNotFound`] if either directory is missing.
    pub fn new(local: impl Into<PathBuf>, baseline: impl Into<PathBuf>) -> Result<Self> {
        let local = existing_dir(local.into())?;
        let baseline = existing_dir(baseline.into())?;
        let name = local
            .file_name()
            .map_or_else(|| "local".to_string(), |n| n.to_string_lossy().into_owned());
        let project = ResourcePath::root().child(&name);
        let id = format!(
            "dir_{}",
            &content_digest(format!("{}\0{}", local.display(), baseline.display()).as_bytes())
                [..12]
        );

        Ok(Self {
            id,
            name,
            project,
            local,
            baseline,
            ancestor: None,
        })
    }

    /// Switch to three-way comparison against `ancestor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RootNotFound`] if the directory is missing.
    pub fn with_ancestor(mut self, ancestor: impl Into<PathBuf>) -> Result<Self> {
        self.ancestor = Some(existing_dir(ancestor.into())?);
        Ok(self)
    }

    /// Rename the project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless `name` is a single path
    /// segment.
    pub fn with_name(mut self, name: &str) -> Result<Self> {
        let project = ResourcePath::parse(name)?;
        if project.segment_count() != 1 {
            return Err(Error::InvalidArgument(format!(
                "Project name '{name}' must be a single path segment"
            )));
        }
        self.name = project.name().unwrap_or(name).to_string();
        self.project = project;
        Ok(self)
    }

    #[must_use]
    pub fn project(&self) -> &ResourcePath {
        &self.project
    }

    /// Filesystem location of `path` below `base`, `None` when `path` is
    /// not inside the project.
    fn locate(&self, base: &Path, path: &ResourcePath) -> Option<PathBuf> {
        if !self.project.is_prefix_of(path) {
            return None;
        }
        Some(path.segments().skip(1).fold(base.to_path_buf(), |acc, s| acc.join(s)))
    }

    fn variant_at(&self, base: &Path, path: &ResourcePath) -> Result<Option<Variant>> {
        let Some(location) = self.locate(base, path) else {
            return Ok(None);
        };
        match fs::metadata(&location) {
            Ok(meta) if meta.is_dir() => Ok(Some(Variant::Directory)),
            Ok(_) => file_digest(&location).map(|digest| Some(Variant::File(digest))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::backend(location.display(), e.to_string())),
        }
    }

    fn list(&self, base: &Path, container: &ResourcePath, into: &mut BTreeMap<String, ResourceType>) -> Result<()> {
        let Some(location) = self.locate(base, container) else {
            return Ok(());
        };
        let entries = match fs::read_dir(&location) {
            Ok(entries) => entries,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(());
            }
            Err(e) => return Err(Error::backend(location.display(), e.to_string())),
        };
        for entry in entries {
            let entry = entry.map_err(|e| Error::backend(location.display(), e.to_string()))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| Error::backend(entry.path().display(), e.to_string()))?
                .is_dir();
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(
                        directory = %location.display(),
                        name = %raw.to_string_lossy(),
                        "Skipping entry whose name is not valid UTF-8"
                    );
                    continue;
                }
            };
            let kind = if is_dir { ResourceType::Folder } else { ResourceType::File };
            // A name that is a folder in any variant is listed as a folder.
            into.entry(name)
                .and_modify(|existing| {
                    if is_dir {
                        *existing = ResourceType::Folder;
                    }
                })
                .or_insert(kind);
        }
        Ok(())
    }
}

fn existing_dir(path: PathBuf) -> Result<PathBuf> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(Error::RootNotFound { path })
    }
}

impl SyncSource for DirectorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn roots(&self) -> Vec<ResourcePath> {
        vec![self.project.clone()]
    }

    fn resource_type(&self, path: &ResourcePath) -> Option<ResourceType> {
        if path.is_root() {
            return Some(ResourceType::Root);
        }
        if *path == self.project {
            return Some(ResourceType::Project);
        }
        let bases = [Some(&self.local), Some(&self.baseline), self.ancestor.as_ref()];
        let mut found = None;
        for base in bases.into_iter().flatten() {
            match self.locate(base, path).and_then(|l| fs::metadata(l).ok()) {
                Some(meta) if meta.is_dir() => return Some(ResourceType::Folder),
                Some(_) => found = Some(ResourceType::File),
                None => {}
            }
        }
        found
    }

    fn members(&self, container: &ResourcePath) -> Result<Vec<(ResourcePath, ResourceType)>> {
        if container.is_root() {
            return Ok(vec![(self.project.clone(), ResourceType::Project)]);
        }
        let mut children = BTreeMap::new();
        self.list(&self.local, container, &mut children)?;
        self.list(&self.baseline, container, &mut children)?;
        if let Some(ancestor) = &self.ancestor {
            self.list(ancestor, container, &mut children)?;
        }
        Ok(children
            .into_iter()
            .map(|(name, kind)| (container.child(&name), kind))
            .collect())
    }

    fn sync_info(&self, path: &ResourcePath) -> Result<Option<SyncInfo>> {
        if !self.is_supervised(path) || *path == self.project {
            return Ok(None);
        }

        let local = self.variant_at(&self.local, path)?;
        let remote = self.variant_at(&self.baseline, path)?;
        let ancestor = match &self.ancestor {
            Some(dir) => Some(self.variant_at(dir, path)?),
            None => None,
        };
        if local.is_none() && remote.is_none() && ancestor.as_ref().is_none_or(Option::is_none) {
            return Ok(None);
        }

        let kind = SyncKind::calculate(
            ancestor.as_ref().map(|a| a.as_ref().map(Variant::digest)),
            local.as_ref().map(Variant::digest),
            remote.as_ref().map(Variant::digest),
        );
        let is_file = [&local, &remote]
            .into_iter()
            .flatten()
            .chain(ancestor.iter().flatten())
            .all(|variant| matches!(variant, Variant::File(_)));
        trace!(resource = %path, %kind, "compared");

        let info = if is_file {
            let digest_of = |v: Option<Variant>| match v {
                Some(Variant::File(digest)) => Some(digest),
                _ => None,
            };
            SyncInfo::file(path.clone(), kind).with_digests(digest_of(local), digest_of(remote))
        } else {
            SyncInfo::new(path.clone(), ResourceType::Folder, kind)
        };
        Ok(Some(info))
    }

    fn all_out_of_sync(
        &self,
        roots: &[ResourcePath],
        depth: Depth,
        cancel: &CancelToken,
    ) -> Result<Vec<SyncInfo>> {
        walk_out_of_sync(self, roots, depth, cancel)
    }
}
