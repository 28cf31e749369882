//! Command implementations.

pub mod completions;
pub mod filter;
pub mod list;
pub mod status;
pub mod tree;
pub mod version;
pub mod working_set;

use std::path::PathBuf;
use std::sync::Arc;

use colored::{ColoredString, Colorize};
use tracing::debug;

use crate::cli::ViewArgs;
use crate::config::{SyncViewConfig, resolve_config_path};
use crate::error::Result;
use crate::filter::FilterSpec;
use crate::input::WorkingSet;
use crate::jobs::{CancelToken, WorkerPool};
use crate::model::{ResourcePath, SyncKind};
use crate::source::DirectorySource;
use crate::view::SyncView;
use crate::views::SyncViews;

/// Resolve and load the config file.
///
/// # Errors
///
/// Returns [`crate::error::Error::Config`] if the file exists but cannot be
/// read.
pub fn load_config(explicit: Option<&PathBuf>) -> Result<(PathBuf, SyncViewConfig)> {
    let path = resolve_config_path(explicit.map(PathBuf::as_path))?;
    let config = SyncViewConfig::load(&path)?;
    Ok((path, config))
}

/// Build the view described by `args`, connect it and run one refresh on
/// the worker pool.
///
/// # Errors
///
/// Returns an error if a directory is missing, a filter flag or working-set
/// name is invalid, or the refresh fails.
pub fn open_view(args: &ViewArgs, config: &SyncViewConfig) -> Result<Arc<SyncView>> {
    let mut source = DirectorySource::new(&args.local, &args.baseline)?;
    if let Some(ancestor) = &args.ancestor {
        source = source.with_ancestor(ancestor)?;
    }
    if let Some(name) = &args.name {
        source = source.with_name(name)?;
    }

    let spec = if args.filter.is_set() {
        FilterSpec::parse(
            &args.filter.directions,
            &args.filter.change_types,
            !args.filter.show_pseudo,
        )?
    } else {
        config.filter.clone()
    };
    debug!(filter = %spec, "display filter");

    let working_set = resolve_working_set(args, config, source.project())?;
    let mut views = SyncViews::new(spec.build()?);
    let view = views.add_source(Arc::new(source));
    // Nothing is tracked yet, so scoping costs no source queries.
    view.set_working_set(working_set, &CancelToken::new())?;

    let pool = WorkerPool::new(config.workers)?;
    view.refresh_in_background(&pool).wait()?;
    Ok(view)
}

fn resolve_working_set(
    args: &ViewArgs,
    config: &SyncViewConfig,
    project: &ResourcePath,
) -> Result<Option<WorkingSet>> {
    if let Some(name) = &args.working_set {
        return Ok(Some(config.find_working_set(name)?.clone()));
    }
    if !args.root.is_empty() {
        let roots = args
            .root
            .iter()
            .map(|root| resolve_root(project, root))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Some(WorkingSet::new("roots", roots)));
    }
    if args.all {
        return Ok(None);
    }
    Ok(config.active_working_set().cloned())
}

/// Absolute roots are taken as given; anything else is relative to the
/// project.
fn resolve_root(project: &ResourcePath, root: &str) -> Result<ResourcePath> {
    if root.starts_with('/') {
        ResourcePath::parse(root)
    } else {
        project.join(root)
    }
}

/// Kind label colored by direction.
pub(crate) fn paint_kind(kind: SyncKind) -> ColoredString {
    let label = kind.to_string();
    if kind.is_pseudo_conflict() {
        return label.dimmed();
    }
    match kind.direction() {
        SyncKind::INCOMING => label.blue(),
        SyncKind::OUTGOING => label.green(),
        SyncKind::CONFLICTING => label.red().bold(),
        _ => label.normal(),
    }
}
