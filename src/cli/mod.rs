//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for view commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
}

pub mod commands;

/// SyncView - incremental view of what differs between two trees
#[derive(Parser, Debug)]
#[command(name = "syncview", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.syncview/config.json)
    #[arg(long, global = true, env = "SYNCVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh and summarize the out-of-sync resources
    Status(ViewArgs),

    /// Print the out-of-sync resources as a tree
    Tree(ViewArgs),

    /// Print the out-of-sync resources as a flat list
    List(ViewArgs),

    /// Manage saved working sets
    #[command(name = "working-set", alias = "ws")]
    WorkingSet {
        #[command(subcommand)]
        command: WorkingSetCommands,
    },

    /// Show or change the default display filter
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Trees to compare plus how to scope and filter the view.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Local directory
    pub local: PathBuf,

    /// Baseline directory to compare against
    pub baseline: PathBuf,

    /// Common ancestor directory (enables three-way comparison)
    #[arg(long)]
    pub ancestor: Option<PathBuf>,

    /// Project name (default: the local directory's name)
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Saved working set to scope the view to
    #[arg(long, short = 'w', conflicts_with = "root")]
    pub working_set: Option<String>,

    /// Ad-hoc working-set root (repeatable; relative to the project)
    #[arg(long)]
    pub root: Vec<String>,

    /// Ignore the active working set from the config
    #[arg(long, conflicts_with_all = ["working_set", "root"])]
    pub all: bool,
}

/// Display filter flags. When none are given the configured filter applies.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Show only these directions (incoming, outgoing, conflicting)
    #[arg(long = "direction", short = 'd', value_delimiter = ',')]
    pub directions: Vec<String>,

    /// Show only these change types (addition, deletion, change)
    #[arg(long = "change", short = 'c', value_delimiter = ',')]
    pub change_types: Vec<String>,

    /// Show conflicts whose two sides ended up identical
    #[arg(long)]
    pub show_pseudo: bool,
}

impl FilterArgs {
    /// Whether any filter flag was given.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.directions.is_empty() || !self.change_types.is_empty() || self.show_pseudo
    }
}

#[derive(Subcommand, Debug)]
pub enum WorkingSetCommands {
    /// List saved working sets
    List,

    /// Save a working set (replaces one with the same name)
    Save {
        /// Working set name
        name: String,

        /// Root resource paths, e.g. /project/src
        #[arg(required = true)]
        roots: Vec<String>,

        /// Also make it the active working set
        #[arg(long = "use")]
        activate: bool,
    },

    /// Delete a saved working set
    Delete {
        /// Working set name
        name: String,
    },

    /// Make a working set the default for view commands
    Use {
        /// Working set name
        name: String,
    },

    /// Stop using a default working set
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum FilterCommands {
    /// Show the default display filter
    Show,

    /// Replace the default display filter
    Set(FilterArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_view_args() {
        let cli = Cli::parse_from([
            "syncview", "list", "a", "b", "-d", "in,out", "--change", "deletion", "--root", "src",
        ]);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.filter.directions, vec!["in", "out"]);
        assert_eq!(args.filter.change_types, vec!["deletion"]);
        assert_eq!(args.root, vec!["src"]);
        assert!(args.filter.is_set());
    }

    #[test]
    fn test_working_set_and_root_conflict() {
        let result = Cli::try_parse_from([
            "syncview", "status", "a", "b", "--working-set", "docs", "--root", "src",
        ]);
        assert!(result.is_err());
    }
}
