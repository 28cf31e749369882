//! Serializable filter description.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    AcceptAll, AndFilter, ChangeTypeFilter, DirectionFilter, FilterRef, PseudoConflictFilter,
};
use crate::error::{Error, Result};
use crate::model::SyncKind;
use crate::validate::{
    change_type_name, direction_name, normalize_change_type, normalize_direction,
};

/// User-facing description of the display filter.
///
/// Empty direction or change-type lists mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub change_types: Vec<String>,
    pub hide_pseudo_conflicts: bool,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            directions: Vec::new(),
            change_types: Vec::new(),
            hide_pseudo_conflicts: true,
        }
    }
}

impl FilterSpec {
    /// Build a spec from free-form names, normalizing them to canonical ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unknown name, with a
    /// suggestion when one is close.
    pub fn parse(directions: &[String], change_types: &[String], hide_pseudo_conflicts: bool) -> Result<Self> {
        let directions = directions
            .iter()
            .map(|name| {
                normalize_direction(name)
                    .map(|kind| direction_name(kind).to_string())
                    .map_err(|(input, suggestion)| unknown("direction", &input, suggestion))
            })
            .collect::<Result<Vec<_>>>()?;
        let change_types = change_types
            .iter()
            .map(|name| {
                normalize_change_type(name)
                    .map(|kind| change_type_name(kind).to_string())
                    .map_err(|(input, suggestion)| unknown("change type", &input, suggestion))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut spec = Self {
            directions,
            change_types,
            hide_pseudo_conflicts,
        };
        spec.directions.sort();
        spec.directions.dedup();
        spec.change_types.sort();
        spec.change_types.dedup();
        Ok(spec)
    }

    /// Whether the built filter would accept everything.
    #[must_use]
    pub fn accepts_all(&self) -> bool {
        self.directions.is_empty() && self.change_types.is_empty() && !self.hide_pseudo_conflicts
    }

    /// Build the composite filter: direction, then change type, then pseudo
    /// conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a stored name no longer parses
    /// (a hand-edited config file, for instance).
    pub fn build(&self) -> Result<FilterRef> {
        if self.accepts_all() {
            return Ok(Arc::new(AcceptAll));
        }

        let mut parts: Vec<FilterRef> = Vec::new();
        if !self.directions.is_empty() {
            let kinds = self
                .directions
                .iter()
                .map(|name| {
                    normalize_direction(name)
                        .map_err(|(input, suggestion)| unknown("direction", &input, suggestion))
                })
                .collect::<Result<Vec<SyncKind>>>()?;
            parts.push(Arc::new(DirectionFilter::new(kinds)));
        }
        if !self.change_types.is_empty() {
            let kinds = self
                .change_types
                .iter()
                .map(|name| {
                    normalize_change_type(name)
                        .map_err(|(input, suggestion)| unknown("change type", &input, suggestion))
                })
                .collect::<Result<Vec<SyncKind>>>()?;
            parts.push(Arc::new(ChangeTypeFilter::new(kinds)));
        }
        if self.hide_pseudo_conflicts {
            parts.push(Arc::new(PseudoConflictFilter));
        }
        Ok(Arc::new(AndFilter(parts)))
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |names: &[String]| {
            if names.is_empty() {
                "any".to_string()
            } else {
                names.join(", ")
            }
        };
        write!(
            f,
            "directions: {}; change types: {}; pseudo conflicts: {}",
            join(&self.directions),
            join(&self.change_types),
            if self.hide_pseudo_conflicts { "hidden" } else { "shown" }
        )
    }
}

fn unknown(what: &str, input: &str, suggestion: Option<String>) -> Error {
    match suggestion {
        Some(s) => Error::InvalidArgument(format!("Unknown {what} '{input}'. Did you mean '{s}'?")),
        None => Error::InvalidArgument(format!("Unknown {what} '{input}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourcePath, SyncInfo};

    fn info(kind: SyncKind) -> SyncInfo {
        SyncInfo::file(ResourcePath::parse("/p/f").unwrap(), kind)
    }

    #[test]
    fn test_parse_normalizes_synonyms() {
        let spec = FilterSpec::parse(
            &["in".to_string(), "incoming".to_string(), "conflict".to_string()],
            &["modified".to_string()],
            true,
        )
        .unwrap();
        assert_eq!(spec.directions, vec!["conflicting", "incoming"]);
        assert_eq!(spec.change_types, vec!["change"]);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = FilterSpec::parse(&["outgoin".to_string()], &[], true).unwrap_err();
        assert!(err.to_string().contains("Did you mean 'outgoing'"));
    }

    #[test]
    fn test_default_hides_pseudo_conflicts_only() {
        let filter = FilterSpec::default().build().unwrap();
        assert!(filter.select(&info(SyncKind::OUTGOING.with(SyncKind::CHANGE))));
        assert!(!filter.select(&info(
            SyncKind::CONFLICTING
                .with(SyncKind::CHANGE)
                .with(SyncKind::PSEUDO_CONFLICT)
        )));
    }

    #[test]
    fn test_build_combines_parts() {
        let spec = FilterSpec::parse(&["out".to_string()], &["add".to_string()], false).unwrap();
        let filter = spec.build().unwrap();
        assert!(filter.select(&info(SyncKind::OUTGOING.with(SyncKind::ADDITION))));
        assert!(!filter.select(&info(SyncKind::OUTGOING.with(SyncKind::CHANGE))));
        assert!(!filter.select(&info(SyncKind::INCOMING.with(SyncKind::ADDITION))));
    }

    #[test]
    fn test_serde_defaults() {
        let spec: FilterSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, FilterSpec::default());
        assert_eq!(
            serde_json::to_string(&spec).unwrap(),
            r#"{"hide_pseudo_conflicts":true}"#
        );
    }
}
