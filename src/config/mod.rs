//! Configuration management.
//!
//! SyncView keeps one JSON file holding the default display filter, saved
//! working sets and the worker count:
//!
//! - **Default location**: `~/.syncview/config.json`
//! - **Overrides**: `--config <FILE>` or the `SYNCVIEW_CONFIG` environment
//!   variable
//!
//! A missing file is not an error; every field falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::FilterSpec;
use crate::input::WorkingSet;
use crate::validate::find_similar_names;

/// Persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncViewConfig {
    /// Display filter used when the command line gives none.
    pub filter: FilterSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub working_sets: Vec<WorkingSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_working_set: Option<String>,
    /// Threads used for background refreshes.
    pub workers: usize,
}

impl Default for SyncViewConfig {
    fn default() -> Self {
        Self {
            filter: FilterSpec::default(),
            working_sets: Vec::new(),
            active_working_set: None,
            workers: 2,
        }
    }
}

impl SyncViewConfig {
    /// Load from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Write to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content + "\n")
            .map_err(|e| Error::Config(format!("Failed to write {}: {e}", path.display())))?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Look up a saved working set by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkingSetNotFound`], with close names as
    /// suggestions, if no working set has that name.
    pub fn find_working_set(&self, name: &str) -> Result<&WorkingSet> {
        self.working_sets
            .iter()
            .find(|ws| ws.name == name)
            .ok_or_else(|| Error::WorkingSetNotFound {
                name: name.to_string(),
                similar: find_similar_names(name, &self.working_set_names(), 3),
            })
    }

    #[must_use]
    pub fn working_set_names(&self) -> Vec<String> {
        self.working_sets.iter().map(|ws| ws.name.clone()).collect()
    }

    /// Insert or replace the working set with the same name. Returns `true`
    /// if one was replaced.
    pub fn upsert_working_set(&mut self, working_set: WorkingSet) -> bool {
        if let Some(existing) = self
            .working_sets
            .iter_mut()
            .find(|ws| ws.name == working_set.name)
        {
            *existing = working_set;
            true
        } else {
            self.working_sets.push(working_set);
            self.working_sets.sort_by(|a, b| a.name.cmp(&b.name));
            false
        }
    }

    /// Delete a working set, clearing the active selection if it pointed
    /// at it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkingSetNotFound`] if no working set has that name.
    pub fn delete_working_set(&mut self, name: &str) -> Result<WorkingSet> {
        let index = self
            .working_sets
            .iter()
            .position(|ws| ws.name == name)
            .ok_or_else(|| Error::WorkingSetNotFound {
                name: name.to_string(),
                similar: find_similar_names(name, &self.working_set_names(), 3),
            })?;
        if self.active_working_set.as_deref() == Some(name) {
            self.active_working_set = None;
        }
        Ok(self.working_sets.remove(index))
    }

    /// Make `name` the working set used when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkingSetNotFound`] if no working set has that name.
    pub fn use_working_set(&mut self, name: &str) -> Result<()> {
        self.find_working_set(name)?;
        self.active_working_set = Some(name.to_string());
        Ok(())
    }

    pub fn clear_working_set(&mut self) {
        self.active_working_set = None;
    }

    /// The active working set, if one is selected and still saved.
    #[must_use]
    pub fn active_working_set(&self) -> Option<&WorkingSet> {
        self.active_working_set
            .as_deref()
            .and_then(|name| self.working_sets.iter().find(|ws| ws.name == name))
    }
}

/// Get the global SyncView directory location (`~/.syncview/`).
#[must_use]
pub fn global_syncview_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".syncview"))
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `explicit_path` (the `--config` flag)
/// 2. `SYNCVIEW_CONFIG` environment variable
/// 3. `~/.syncview/config.json`
///
/// # Errors
///
/// Returns [`Error::Config`] if no home directory can be determined.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("SYNCVIEW_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    global_syncview_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine the home directory".to_string()))
}
