//! List command implementation.

use std::path::PathBuf;

use serde::Serialize;

use super::{load_config, open_view, paint_kind};
use crate::cli::ViewArgs;
use crate::error::Result;
use crate::model::SyncInfo;

#[derive(Serialize)]
struct ListOutput {
    count: usize,
    items: Vec<SyncInfo>,
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the view cannot be built or refreshed.
pub fn execute(args: &ViewArgs, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (_, config) = load_config(config_path)?;
    let view = open_view(args, &config)?;
    let items = view.filtered_sync_set().all_members();

    if json {
        let output = ListOutput {
            count: items.len(),
            items,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for info in &items {
        println!("{:<28} {}", paint_kind(info.kind), info.path);
    }
    Ok(())
}
