//! Area matching and area-specification splitting.
//!
//! An integration instance is configured with a free-text area
//! specification that may name several areas at once ("Malmö / Eslöv /
//! Skåne län"). [`split_areas`] breaks it into individual filters,
//! [`dedupe_areas`] drops case-insensitive duplicates once at setup, and
//! [`area_matches`] compares one event location against one filter.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delimiters accepted between areas in a specification string.
const AREA_DELIMITERS: [char; 5] = ['/', ',', ';', '|', '\n'];

/// How a location name is compared against an area filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The location must contain the filter as a substring.
    #[default]
    Contains,
    /// The location must equal the filter.
    Exact,
}

impl MatchMode {
    /// Returns the configuration-surface name for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized match-mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown match mode: {0:?} (expected \"contains\" or \"exact\")")]
pub struct UnknownMatchMode(pub String);

impl FromStr for MatchMode {
    type Err = UnknownMatchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "exact" => Ok(Self::Exact),
            _ => Err(UnknownMatchMode(s.to_string())),
        }
    }
}

/// Compares a location name against one area filter.
///
/// Both sides are trimmed and case-folded first. An empty filter matches
/// everything; a non-empty filter never matches an empty location.
pub fn area_matches(location_name: &str, area: &str, mode: MatchMode) -> bool {
    let location = location_name.trim().to_lowercase();
    let area = area.trim().to_lowercase();

    if area.is_empty() {
        return true;
    }
    if location.is_empty() {
        return false;
    }

    match mode {
        MatchMode::Exact => location == area,
        MatchMode::Contains => location.contains(&area),
    }
}

/// Splits an area specification into trimmed, non-empty segments.
///
/// Any of `/ , ; |` or a newline separates areas; input order is kept.
pub fn split_areas(raw: &str) -> Vec<String> {
    raw.split(&AREA_DELIMITERS[..])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drops case-insensitive duplicates, keeping the first spelling seen.
pub fn dedupe_areas(areas: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    areas
        .into_iter()
        .filter(|area| seen.insert(area.trim().to_lowercase()))
        .collect()
}
