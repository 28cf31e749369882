//! Working-set command implementations.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use super::load_config;
use crate::cli::WorkingSetCommands;
use crate::error::Result;
use crate::input::WorkingSet;
use crate::model::ResourcePath;

#[derive(Serialize)]
struct ListOutput<'a> {
    active: Option<&'a str>,
    working_sets: &'a [WorkingSet],
}

#[derive(Serialize)]
struct ChangeOutput<'a> {
    action: &'a str,
    name: Option<&'a str>,
    active: Option<&'a str>,
}

/// Execute a working-set command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or saved, a root path is
/// invalid, or the named working set does not exist.
pub fn execute(command: &WorkingSetCommands, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (path, mut config) = load_config(config_path)?;

    let (action, name) = match command {
        WorkingSetCommands::List => {
            if json {
                let output = ListOutput {
                    active: config.active_working_set.as_deref(),
                    working_sets: &config.working_sets,
                };
                println!("{}", serde_json::to_string(&output)?);
            } else if config.working_sets.is_empty() {
                println!("No working sets saved.");
                println!();
                println!("Save one with: syncview working-set save NAME /project/dir");
            } else {
                let active = config.active_working_set.as_deref();
                for ws in &config.working_sets {
                    let marker = if active == Some(ws.name.as_str()) { "*" } else { " " };
                    let roots: Vec<&str> = ws.roots.iter().map(ResourcePath::as_str).collect();
                    println!("{marker} {}  {}", ws.name.bold(), roots.join(", ").dimmed());
                }
            }
            return Ok(());
        }
        WorkingSetCommands::Save {
            name,
            roots,
            activate,
        } => {
            let roots = roots
                .iter()
                .map(|root| ResourcePath::parse(root))
                .collect::<Result<Vec<_>>>()?;
            let replaced = config.upsert_working_set(WorkingSet::new(name.clone(), roots));
            if *activate {
                config.use_working_set(name)?;
            }
            (if replaced { "updated" } else { "saved" }, Some(name.as_str()))
        }
        WorkingSetCommands::Delete { name } => {
            config.delete_working_set(name)?;
            ("deleted", Some(name.as_str()))
        }
        WorkingSetCommands::Use { name } => {
            config.use_working_set(name)?;
            ("activated", Some(name.as_str()))
        }
        WorkingSetCommands::Clear => {
            config.clear_working_set();
            ("cleared", None)
        }
    };

    config.save(&path)?;

    if json {
        let output = ChangeOutput {
            action,
            name,
            active: config.active_working_set.as_deref(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        match name {
            Some(name) => println!("Working set {} {action}.", name.bold()),
            None => println!("Active working set {action}."),
        }
    }
    Ok(())
}
