//! Query engine: substring filtering over mapped rows.
//!
//! Matching is plain containment of the normalized query in the normalized
//! row text. There is no ranking or fuzzy matching; results keep the input
//! order and never repeat a row.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::{normalize_query, normalize_text};
use crate::row::MappedRow;

/// Number of suggestions returned when the caller does not say otherwise.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 7;

/// Which fields a query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The full search key.
    #[default]
    Auto,
    Identifier,
    Name,
    Location,
}

/// What an empty (or whitespace-only) query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQuery {
    #[default]
    NoResults,
    ShowAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseQueryOptionError {
    kind: &'static str,
    value: String,
}

impl FromStr for Scope {
    type Err = ParseQueryOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Scope::Auto),
            "identifier" | "id" | "number" => Ok(Scope::Identifier),
            "name" | "title" => Ok(Scope::Name),
            "location" | "rack" => Ok(Scope::Location),
            _ => Err(ParseQueryOptionError {
                kind: "scope",
                value: s.to_owned(),
            }),
        }
    }
}

impl FromStr for EmptyQuery {
    type Err = ParseQueryOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no_results" | "none" => Ok(EmptyQuery::NoResults),
            "show_all" | "all" => Ok(EmptyQuery::ShowAll),
            _ => Err(ParseQueryOptionError {
                kind: "empty-query mode",
                value: s.to_owned(),
            }),
        }
    }
}

/// One entry of the type-ahead list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub identifier: String,
    pub display_name: String,
}

impl From<&MappedRow> for Suggestion {
    fn from(row: &MappedRow) -> Self {
        Self {
            identifier: row.identifier().to_owned(),
            display_name: row.display_name().to_owned(),
        }
    }
}

fn matches(row: &MappedRow, needle: &str, scope: Scope) -> bool {
    match scope {
        Scope::Auto => row.search_key().contains(needle),
        Scope::Identifier => normalize_text(row.identifier()).contains(needle),
        Scope::Name => normalize_text(row.display_name()).contains(needle),
        Scope::Location => normalize_text(row.location()).contains(needle),
    }
}

/// Rows whose scoped text contains the normalized `query`.
///
/// Never fails: any string is a valid query.
#[must_use]
pub fn filter<'a>(
    rows: &'a [MappedRow],
    query: &str,
    scope: Scope,
    empty_query: EmptyQuery,
) -> Vec<&'a MappedRow> {
    let needle = normalize_query(query);
    if needle.is_empty() {
        return match empty_query {
            EmptyQuery::NoResults => Vec::new(),
            EmptyQuery::ShowAll => rows.iter().collect(),
        };
    }

    rows.iter()
        .filter(|row| matches(row, &needle, scope))
        .collect()
}

/// Rows whose identifier equals `id` exactly. No trimming or case folding.
#[must_use]
pub fn filter_by_identifier<'a>(rows: &'a [MappedRow], id: &str) -> Vec<&'a MappedRow> {
    rows.iter().filter(|row| row.identifier() == id).collect()
}

/// First `limit` Auto-scope matches, for a type-ahead dropdown.
#[must_use]
pub fn suggest(rows: &[MappedRow], query: &str, limit: usize) -> Vec<Suggestion> {
    let needle = normalize_query(query);
    if needle.is_empty() {
        return Vec::new();
    }

    rows.iter()
        .filter(|row| matches(row, &needle, Scope::Auto))
        .take(limit)
        .map(Suggestion::from)
        .collect()
}
