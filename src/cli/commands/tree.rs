//! Tree command implementation.
//!
//! Walks the filtered set from the tree root with `members()`, so only the
//! branches leading to changes are printed.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use super::{load_config, open_view, paint_kind};
use crate::cli::ViewArgs;
use crate::error::Result;
use crate::model::{ModelElement, ResourcePath, SyncKind};
use crate::syncset::SyncSet;

#[derive(Serialize)]
struct TreeNode {
    name: String,
    path: ResourcePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TreeNode>,
    #[serde(skip)]
    raw_kind: Option<SyncKind>,
}

fn build(set: &SyncSet, element: &ModelElement) -> TreeNode {
    let path = element.path().clone();
    let raw_kind = element.sync_info().map(|info| info.kind);
    let children = if element.resource_type().is_container() {
        set.members(&path).iter().map(|child| build(set, child)).collect()
    } else {
        Vec::new()
    };
    TreeNode {
        name: path.name().unwrap_or("/").to_string(),
        kind: raw_kind.map(|kind| kind.to_string()),
        path,
        children,
        raw_kind,
    }
}

fn print(node: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node.raw_kind {
        Some(kind) => println!("{indent}{}  {}", node.name, paint_kind(kind)),
        None => println!("{indent}{}", format!("{}/", node.name).bold()),
    }
    for child in &node.children {
        print(child, depth + 1);
    }
}

/// Execute the tree command.
///
/// # Errors
///
/// Returns an error if the view cannot be built or refreshed.
pub fn execute(args: &ViewArgs, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (_, config) = load_config(config_path)?;
    let view = open_view(args, &config)?;
    let set = view.filtered_sync_set();
    let roots: Vec<TreeNode> = set
        .members(&ResourcePath::root())
        .iter()
        .map(|element| build(set, element))
        .collect();

    if json {
        println!("{}", serde_json::to_string(&roots)?);
        return Ok(());
    }

    println!("{}", view.title().bold());
    if roots.is_empty() {
        println!("No changes.");
    }
    for root in &roots {
        print(root, 0);
    }
    Ok(())
}
