//! Status command implementation.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use super::{load_config, open_view, paint_kind};
use crate::cli::ViewArgs;
use crate::error::Result;
use crate::model::SyncKind;
use crate::view::ViewStatus;

#[derive(Serialize)]
struct StatusOutput {
    title: String,
    #[serde(flatten)]
    status: ViewStatus,
    directions: DirectionCounts,
}

#[derive(Serialize)]
struct DirectionCounts {
    incoming: usize,
    outgoing: usize,
    conflicting: usize,
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if the view cannot be built or refreshed.
pub fn execute(args: &ViewArgs, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (_, config) = load_config(config_path)?;
    let view = open_view(args, &config)?;
    let status = view.status();
    let directions = DirectionCounts {
        incoming: status.statistics.count_direction(SyncKind::INCOMING),
        outgoing: status.statistics.count_direction(SyncKind::OUTGOING),
        conflicting: status.statistics.count_direction(SyncKind::CONFLICTING),
    };

    if json {
        let output = StatusOutput {
            title: view.title(),
            status,
            directions,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", view.title().bold());
    println!();
    println!("Source:      {}", status.source);
    println!(
        "Working set: {}",
        status.working_set.as_deref().unwrap_or("(none)")
    );
    if status.is_filtered() {
        println!(
            "Changes:     {} shown, {} hidden by filter",
            status.showing,
            status.in_working_set - status.showing
        );
    } else {
        println!("Changes:     {}", status.showing);
    }
    if status.outside_working_set() > 0 {
        println!("  Outside working set: {}", status.outside_working_set());
    }
    println!("  Incoming:    {}", directions.incoming);
    println!("  Outgoing:    {}", directions.outgoing);
    println!("  Conflicting: {}", directions.conflicting);

    if status.showing > 0 {
        println!();
        println!("{}", "By kind".cyan().bold());
        for (kind, count) in status.statistics.iter() {
            println!("  {:<28} {count}", paint_kind(kind));
        }
    }

    if let Some(refreshed) = status.last_refreshed {
        println!();
        println!(
            "{}",
            format!("Refreshed {}", refreshed.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
        );
    }
    Ok(())
}
