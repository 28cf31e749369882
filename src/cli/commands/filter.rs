//! Filter command implementations.

use std::path::PathBuf;

use serde::Serialize;

use super::load_config;
use crate::cli::FilterCommands;
use crate::error::Result;
use crate::filter::FilterSpec;

#[derive(Serialize)]
struct FilterOutput<'a> {
    filter: &'a FilterSpec,
    accepts_all: bool,
}

/// Execute a filter command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or saved, or a filter
/// value is not recognized.
pub fn execute(command: &FilterCommands, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (path, mut config) = load_config(config_path)?;

    if let FilterCommands::Set(args) = command {
        config.filter = FilterSpec::parse(&args.directions, &args.change_types, !args.show_pseudo)?;
        config.save(&path)?;
    }

    if json {
        let output = FilterOutput {
            filter: &config.filter,
            accepts_all: config.filter.accepts_all(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", config.filter);
    }
    Ok(())
}
