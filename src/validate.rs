//! Name parsing for directions and change types.
//!
//! Provides O(1) validation sets and synonym maps so filters can be written
//! the way people say them ("in", "out", "modified"). Three-tier resolution:
//! exact match → synonym lookup → error with suggestion.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::model::SyncKind;

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_DIRECTIONS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["incoming", "outgoing", "conflicting"].into_iter().collect()
});

pub static VALID_CHANGE_TYPES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    ["addition", "deletion", "change"].into_iter().collect()
});

// ── Synonym maps ─────────────────────────────────────────────

pub static DIRECTION_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("in", "incoming"),
        ("inbound", "incoming"),
        ("remote", "incoming"),
        ("pull", "incoming"),
        ("out", "outgoing"),
        ("outbound", "outgoing"),
        ("local", "outgoing"),
        ("push", "outgoing"),
        ("conflict", "conflicting"),
        ("conflicts", "conflicting"),
        ("both", "conflicting"),
    ]
    .into_iter()
    .collect()
});

pub static CHANGE_TYPE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("add", "addition"),
        ("added", "addition"),
        ("new", "addition"),
        ("create", "addition"),
        ("created", "addition"),
        ("delete", "deletion"),
        ("deleted", "deletion"),
        ("remove", "deletion"),
        ("removed", "deletion"),
        ("modify", "change"),
        ("modified", "change"),
        ("changed", "change"),
        ("edit", "change"),
        ("edited", "change"),
    ]
    .into_iter()
    .collect()
});

fn direction_kind(canonical: &str) -> SyncKind {
    match canonical {
        "incoming" => SyncKind::INCOMING,
        "outgoing" => SyncKind::OUTGOING,
        _ => SyncKind::CONFLICTING,
    }
}

fn change_kind(canonical: &str) -> SyncKind {
    match canonical {
        "addition" => SyncKind::ADDITION,
        "deletion" => SyncKind::DELETION,
        _ => SyncKind::CHANGE,
    }
}

/// Canonical name of a direction kind, as accepted by [`normalize_direction`].
#[must_use]
pub fn direction_name(direction: SyncKind) -> &'static str {
    match direction.direction() {
        SyncKind::INCOMING => "incoming",
        SyncKind::OUTGOING => "outgoing",
        SyncKind::CONFLICTING => "conflicting",
        _ => "none",
    }
}

/// Canonical name of a change kind, as accepted by [`normalize_change_type`].
#[must_use]
pub fn change_type_name(change: SyncKind) -> &'static str {
    match change.change() {
        SyncKind::ADDITION => "addition",
        SyncKind::DELETION => "deletion",
        SyncKind::CHANGE => "change",
        _ => "none",
    }
}

/// Resolve a direction name via exact match or synonym lookup.
///
/// Returns the direction kind, or an error with the original input and an
/// optional suggestion.
pub fn normalize_direction(input: &str) -> Result<SyncKind, (String, Option<String>)> {
    let lower = input.to_lowercase();

    // Tier 1: exact match
    if VALID_DIRECTIONS.contains(lower.as_str()) {
        return Ok(direction_kind(&lower));
    }

    // Tier 2: synonym lookup
    if let Some(&canonical) = DIRECTION_SYNONYMS.get(lower.as_str()) {
        return Ok(direction_kind(canonical));
    }

    // Tier 3: find closest suggestion
    let suggestion = find_closest_match(&lower, &VALID_DIRECTIONS, &DIRECTION_SYNONYMS);
    Err((input.to_string(), suggestion))
}

/// Resolve a change-type name via exact match or synonym lookup.
pub fn normalize_change_type(input: &str) -> Result<SyncKind, (String, Option<String>)> {
    let lower = input.to_lowercase();

    if VALID_CHANGE_TYPES.contains(lower.as_str()) {
        return Ok(change_kind(&lower));
    }

    if let Some(&canonical) = CHANGE_TYPE_SYNONYMS.get(lower.as_str()) {
        return Ok(change_kind(canonical));
    }

    let suggestion = find_closest_match(&lower, &VALID_CHANGE_TYPES, &CHANGE_TYPE_SYNONYMS);
    Err((input.to_string(), suggestion))
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 2 && best.is_none_or(|(_, best_dist)| dist < best_dist) {
            // For synonyms, show what it maps to
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find names similar to the searched one.
///
/// Returns up to `max` suggestions with edit distance ≤ 3, sorted by
/// distance then alphabetically.
#[must_use]
pub fn find_similar_names(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(searched, name), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, name)| name.to_string())
        .collect()
}
