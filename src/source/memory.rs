//! Scriptable in-memory sync source.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::{Depth, SyncSource};
use crate::error::{Error, Result};
use crate::jobs::CancelToken;
use crate::model::{ResourcePath, ResourceType, SyncInfo, SyncKind};

type QueryHook = Arc<dyn Fn(&ResourcePath) + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    /// Known resources, in sync or not. Containers without an entry exist
    /// implicitly while something below them exists.
    entries: BTreeMap<ResourcePath, SyncInfo>,
    roots: BTreeSet<ResourcePath>,
    failing: HashSet<ResourcePath>,
    bulk: bool,
    hook: Option<QueryHook>,
}

/// A sync source whose contents are set by hand.
///
/// Resources are registered with their current [`SyncInfo`]; the source
/// answers queries from that table. Individual paths can be made to fail,
/// and bulk enumeration can be switched off to exercise the deep-walk path.
pub struct MemorySource {
    id: String,
    name: String,
    state: RwLock<MemoryState>,
}

impl MemorySource {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: RwLock::new(MemoryState {
                bulk: true,
                ..MemoryState::default()
            }),
        }
    }

    /// Supervise `root`.
    pub fn add_root(&self, root: ResourcePath) {
        self.state.write().roots.insert(root);
    }

    /// Stop supervising `root`. Returns whether it was supervised.
    pub fn remove_root(&self, root: &ResourcePath) -> bool {
        self.state.write().roots.remove(root)
    }

    /// Register or replace a resource.
    pub fn set(&self, info: SyncInfo) {
        self.state.write().entries.insert(info.path.clone(), info);
    }

    /// Register or replace a resource that is in sync.
    pub fn set_in_sync(&self, path: ResourcePath, resource_type: ResourceType) {
        self.set(SyncInfo::new(path, resource_type, SyncKind::IN_SYNC));
    }

    /// Forget `path` and everything below it.
    pub fn delete(&self, path: &ResourcePath) {
        self.state.write().entries.retain(|p, _| !path.is_prefix_of(p));
    }

    /// Make status queries for `path` fail until [`heal`](Self::heal).
    pub fn fail(&self, path: ResourcePath) {
        self.state.write().failing.insert(path);
    }

    pub fn heal(&self, path: &ResourcePath) {
        self.state.write().failing.remove(path);
    }

    /// Enable or disable bulk enumeration.
    pub fn set_bulk_supported(&self, supported: bool) {
        self.state.write().bulk = supported;
    }

    /// Run `hook` at the start of every status query.
    pub fn set_query_hook(&self, hook: impl Fn(&ResourcePath) + Send + Sync + 'static) {
        self.state.write().hook = Some(Arc::new(hook));
    }

    fn run_hook(&self, path: &ResourcePath) {
        // Cloned out so the hook may call back into this source.
        let hook = self.state.read().hook.clone();
        if let Some(hook) = hook {
            hook(path);
        }
    }
}

impl SyncSource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn roots(&self) -> Vec<ResourcePath> {
        self.state.read().roots.iter().cloned().collect()
    }

    fn resource_type(&self, path: &ResourcePath) -> Option<ResourceType> {
        if path.is_root() {
            return Some(ResourceType::Root);
        }
        let state = self.state.read();
        if let Some(info) = state.entries.get(path) {
            return Some(info.resource_type);
        }
        let implied = state.roots.contains(path)
            || state
                .entries
                .keys()
                .any(|p| p != path && path.is_prefix_of(p));
        implied.then(|| ResourceType::container_for(path))
    }

    fn members(&self, container: &ResourcePath) -> Result<Vec<(ResourcePath, ResourceType)>> {
        let state = self.state.read();
        let children: BTreeSet<ResourcePath> = state
            .entries
            .keys()
            .chain(state.roots.iter())
            .filter_map(|p| container.child_toward(p))
            .collect();
        Ok(children
            .into_iter()
            .map(|child| {
                let kind = state
                    .entries
                    .get(&child)
                    .map_or_else(|| ResourceType::container_for(&child), |i| i.resource_type);
                (child, kind)
            })
            .collect())
    }

    fn sync_info(&self, path: &ResourcePath) -> Result<Option<SyncInfo>> {
        self.run_hook(path);
        if !self.is_supervised(path) {
            return Ok(None);
        }
        let state = self.state.read();
        if state.failing.contains(path) {
            return Err(Error::backend(path, "simulated failure"));
        }
        Ok(state.entries.get(path).cloned())
    }

    fn all_out_of_sync(
        &self,
        roots: &[ResourcePath],
        depth: Depth,
        cancel: &CancelToken,
    ) -> Result<Vec<SyncInfo>> {
        let candidates: Vec<ResourcePath> = {
            let state = self.state.read();
            if !state.bulk {
                return Err(Error::Unsupported(format!("{} has bulk enumeration disabled", self.id)));
            }
            state
                .entries
                .iter()
                .filter(|(path, info)| {
                    info.is_out_of_sync()
                        && roots.iter().any(|root| {
                            root.is_prefix_of(path)
                                && match depth {
                                    Depth::Zero => *path == root,
                                    Depth::One => path.segment_count() <= root.segment_count() + 1,
                                    Depth::Infinite => true,
                                }
                        })
                })
                .map(|(path, _)| path.clone())
                .collect()
        };

        let mut found = Vec::new();
        for path in candidates {
            cancel.check()?;
            match self.sync_info(&path) {
                Ok(Some(info)) => found.push(info),
                Ok(None) => {}
                Err(e) => warn!(resource = %path, error = %e, "Skipping resource"),
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::walk_out_of_sync;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn p(s: &str) -> ResourcePath {
        ResourcePath::parse(s).unwrap()
    }

    fn source() -> MemorySource {
        let source = MemorySource::new("mem", "Memory");
        source.add_root(p("/p"));
        source.set(SyncInfo::file(p("/p/a/b/f1"), SyncKind::OUTGOING.with(SyncKind::CHANGE)));
        source.set(SyncInfo::file(p("/p/a/f2"), SyncKind::INCOMING.with(SyncKind::ADDITION)));
        source.set_in_sync(p("/p/a/f3"), ResourceType::File);
        source.set(SyncInfo::file(p("/q/f4"), SyncKind::OUTGOING.with(SyncKind::CHANGE)));
        source
    }

    #[test]
    fn test_structure() {
        let source = source();
        assert_eq!(source.resource_type(&p("/p/a")), Some(ResourceType::Folder));
        assert_eq!(source.resource_type(&p("/p")), Some(ResourceType::Project));
        assert_eq!(source.resource_type(&p("/p/zzz")), None);

        let members: Vec<ResourcePath> =
            source.members(&p("/p/a")).unwrap().into_iter().map(|(p, _)| p).collect();
        assert_eq!(members, vec![p("/p/a/b"), p("/p/a/f2"), p("/p/a/f3")]);
    }

    #[test]
    fn test_unsupervised_is_invisible() {
        let source = source();
        assert!(source.sync_info(&p("/q/f4")).unwrap().is_none());
        assert!(!source.is_supervised(&p("/q/f4")));
    }

    #[test]
    fn test_bulk_and_walk_agree() {
        let source = source();
        let cancel = CancelToken::new();
        let bulk = source.all_out_of_sync(&source.roots(), Depth::Infinite, &cancel).unwrap();
        let walked = walk_out_of_sync(&source, &source.roots(), Depth::Infinite, &cancel).unwrap();
        assert_eq!(bulk, walked);
        assert_eq!(bulk.len(), 2);

        source.set_bulk_supported(false);
        let err = source
            .all_out_of_sync(&source.roots(), Depth::Infinite, &cancel)
            .unwrap_err();
        assert_eq!(err.error_code().as_str(), "UNSUPPORTED");
    }

    #[test]
    fn test_failure_injection() {
        let source = source();
        source.fail(p("/p/a/f2"));
        assert!(source.sync_info(&p("/p/a/f2")).is_err());

        let found = source
            .all_out_of_sync(&source.roots(), Depth::Infinite, &CancelToken::new())
            .unwrap();
        assert_eq!(found.len(), 1);

        source.heal(&p("/p/a/f2"));
        assert!(source.sync_info(&p("/p/a/f2")).unwrap().is_some());
    }

    #[test]
    fn test_query_hook() {
        let source = source();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        source.set_query_hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _ = source.sync_info(&p("/p/a/f2"));
        let _ = source.sync_info(&p("/p/a/f3"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_delete_subtree() {
        let source = source();
        source.delete(&p("/p/a"));
        assert!(source.members(&p("/p")).unwrap().is_empty());
        assert_eq!(source.resource_type(&p("/p")), Some(ResourceType::Project));
    }
}
